//! Logging facilities for Horizon Weave.
//!
//! This module provides:
//! - Target names for filtering `tracing` output by subsystem
//! - Span names used for instrumented operations
//! - A performance span guard for timing render passes
//!
//! # Tracing Integration
//!
//! Horizon Weave uses the `tracing` crate for instrumentation and never
//! installs a subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_weave=debug,horizon_weave_core::bus=trace")
//!         .init();
//!
//!     // Your application code...
//! }
//! ```

/// Span names used throughout Horizon Weave for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// Child view rendering span.
    pub const RENDER: &str = "horizon_weave::render";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_weave_core";
    /// Event bus target.
    pub const BUS: &str = "horizon_weave_core::bus";
    /// Record target.
    pub const RECORD: &str = "horizon_weave_core::record";
    /// Record set target.
    pub const RECORD_SET: &str = "horizon_weave_core::record_set";
    /// View lifecycle target.
    pub const VIEW: &str = "horizon_weave::view";
    /// Collection view target.
    pub const COLLECTION: &str = "horizon_weave::collection";
    /// Presenter target.
    pub const PRESENTER: &str = "horizon_weave::presenter";
    /// Region target.
    pub const REGION: &str = "horizon_weave::region";
    /// Rendering surface target.
    pub const DOCUMENT: &str = "horizon_weave_dom::document";
}

/// A guard that keeps a tracing span entered until it is dropped.
///
/// This is useful for tracking the duration of render passes.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_weave::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
