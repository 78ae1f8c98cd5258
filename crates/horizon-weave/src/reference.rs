//! Memoized lookups of nodes under a component root.

use std::fmt;
use std::sync::{Arc, Weak};

use horizon_weave_dom::NodeId;
use parking_lot::Mutex;

use crate::component::Rooted;
use crate::error::{Result, WeaveError};

/// A node found by selector under a parent's root, resolved on first use.
///
/// Only successful lookups are cached. A cached node that has since been
/// dropped from the surface is looked up again.
pub struct Reference {
    parent: Weak<dyn Rooted>,
    selector: String,
    el: Mutex<Option<NodeId>>,
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("selector", &self.selector)
            .field("el", &*self.el.lock())
            .finish()
    }
}

impl Reference {
    /// Reference the node matching `selector` under `parent`'s root.
    pub fn new<P: Rooted + 'static>(parent: &Arc<P>, selector: impl Into<String>) -> Self {
        let parent: Weak<P> = Arc::downgrade(parent);
        let parent: Weak<dyn Rooted> = parent;
        Self::from_weak(parent, selector)
    }

    /// Like [`new`](Self::new), for a parent that is only reachable weakly,
    /// e.g. while it is being constructed.
    pub fn from_weak(parent: Weak<dyn Rooted>, selector: impl Into<String>) -> Self {
        Self {
            parent,
            selector: selector.into(),
            el: Mutex::new(None),
        }
    }

    /// The selector this reference resolves.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The referenced node.
    ///
    /// Fails with [`WeaveError::NotRendered`] if the parent is gone or has no
    /// root, and with [`WeaveError::SelectorNotFound`] if nothing matches.
    pub fn get(&self) -> Result<NodeId> {
        let parent = self.parent.upgrade().ok_or(WeaveError::NotRendered)?;
        let surface = parent.surface();

        let cached = *self.el.lock();
        if let Some(el) = cached
            && surface.contains(el)
        {
            return Ok(el);
        }

        let root = parent.el().ok_or(WeaveError::NotRendered)?;
        let Some(el) = surface.query_selector(root, &self.selector)? else {
            tracing::warn!(target: "horizon_weave::region", selector = %self.selector, "selector not found");
            return Err(WeaveError::SelectorNotFound {
                selector: self.selector.clone(),
            });
        };
        *self.el.lock() = Some(el);
        Ok(el)
    }

    /// Forget the cached node.
    pub fn reset(&self) {
        self.el.lock().take();
    }
}
