//! Prelude module for Horizon Weave.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use horizon_weave::prelude::*;
//! ```

// ============================================================================
// Records and Events
// ============================================================================

pub use horizon_weave_core::events;
pub use horizon_weave_core::{
    callback, Attributes, EventBus, EventHandler, Observable, Record, RecordId, RecordSet, RecordSetEvent,
    Subscription,
};
pub use horizon_weave_macros::Attributes;

// ============================================================================
// Rendering Surface
// ============================================================================

pub use horizon_weave_dom::{AdjacentPosition, Document, DocumentConfig, DomEvent, NodeId, RenderSurface};

// ============================================================================
// Components
// ============================================================================

pub use crate::application::Application;
pub use crate::collection_view::{CollectionTemplate, CollectionView, Position};
pub use crate::component::{DomBinding, Mountable, Payload, Rooted, SharedSurface, ViewHandle};
pub use crate::presenter::{Presenter, PresenterHandle, PresenterTemplate, Presents};
pub use crate::region::{Displayable, Region};
pub use crate::view::{RecordTemplate, View, ViewTemplate};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{Result, WeaveError};
