//! Once-only lifecycle hooks.
//!
//! Every component runs a `before_init` hook before it first renders and an
//! `after_init` hook once it is wired. Both run at most once per component,
//! however many times `init` is called. [`Lifecycle`] keeps that bookkeeping
//! and is embedded in each concrete component.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::{self, BoxFuture};

/// A hook that does nothing. Default body of every async template hook.
pub fn noop<'a>() -> BoxFuture<'a, ()> {
    Box::pin(future::ready(()))
}

/// Tracks which once-only hooks have already run.
#[derive(Debug, Default)]
pub struct Lifecycle {
    before_init_called: AtomicBool,
    after_init_called: AtomicBool,
}

impl Lifecycle {
    /// Create a lifecycle with no hook run yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` unless a previous call already completed it.
    ///
    /// The flag is set after the hook finishes, so a hook that is still
    /// pending when `init` is re-entered runs again.
    pub async fn before_init<'a, F>(&self, hook: F)
    where
        F: FnOnce() -> BoxFuture<'a, ()>,
    {
        if self.before_init_called.load(Ordering::Acquire) {
            return;
        }
        hook().await;
        self.before_init_called.store(true, Ordering::Release);
    }

    /// Run `hook` unless a previous call already completed it.
    pub async fn after_init<'a, F>(&self, hook: F)
    where
        F: FnOnce() -> BoxFuture<'a, ()>,
    {
        if self.after_init_called.load(Ordering::Acquire) {
            return;
        }
        hook().await;
        self.after_init_called.store(true, Ordering::Release);
    }

    /// Returns true once `before_init` has completed.
    pub fn was_before_init_called(&self) -> bool {
        self.before_init_called.load(Ordering::Acquire)
    }

    /// Returns true once `after_init` has completed.
    pub fn was_after_init_called(&self) -> bool {
        self.after_init_called.load(Ordering::Acquire)
    }
}
