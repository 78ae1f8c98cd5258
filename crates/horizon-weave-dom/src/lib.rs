//! Rendering surface for Horizon Weave.
//!
//! Components render into a host tree through the [`RenderSurface`] trait.
//! This crate defines that capability and ships [`Document`], an in-memory
//! implementation suitable for tests, server-side rendering and headless use.
//!
//! # Features
//!
//! - **Markup parsing**: well-formed fragments via `quick-xml`
//! - **Selectors**: type, universal, id, class and attribute selectors with
//!   descendant and child combinators, parsed with `cssparser`
//! - **Listeners**: named interactions dispatched to a node and bubbled to
//!   its ancestors
//! - **Positional insertion**: markup or existing nodes placed before, after,
//!   or inside an anchor
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_weave_dom::{AdjacentPosition, Document, DomEvent, RenderSurface};
//!
//! let document = Document::new();
//! let body = document.body();
//! document.insert_adjacent_markup(body, AdjacentPosition::BeforeEnd, "<button>Save</button>")?;
//!
//! let button = document.query_selector(body, "button")?.expect("button");
//! document.add_listener(button, "click", Arc::new(|event: &DomEvent| {
//!     println!("clicked {:?}", event.target);
//! }))?;
//! document.dispatch(button, "click")?;
//! # Ok::<(), horizon_weave_dom::DomError>(())
//! ```

mod config;
mod document;
mod error;
mod markup;
pub mod selector;
mod surface;

pub use config::DocumentConfig;
pub use document::Document;
pub use error::{DomError, Result};
pub use surface::{AdjacentPosition, DomCallback, DomEvent, DomListenerId, NodeId, RenderSurface};
