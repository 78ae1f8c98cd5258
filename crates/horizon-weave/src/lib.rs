//! Horizon Weave - composable, observable components over a rendering surface.
//!
//! This is the main umbrella crate. It provides the component layer and
//! re-exports the core crate and, under [`dom`], the surface crate:
//!
//! - [`View`]: a component owning one subtree, built from a [`ViewTemplate`]
//! - [`CollectionView`]: renders a [`RecordSet`] as child
//!   views, with positional inserts and an empty-state view
//! - [`Presenter`]: couples a record with a view through event bridges
//! - [`Region`]: a slot that swaps the view or presenter it displays
//! - [`Reference`]: a memoized lookup of a node under a component root
//! - [`Application`]: the body-rooted entry point with a main region
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use horizon_weave::prelude::*;
//!
//! #[derive(Attributes, Clone, PartialEq)]
//! struct Article {
//!     #[attributes(id)]
//!     id: u32,
//!     title: String,
//! }
//!
//! struct ArticleView {
//!     record: Record<Article>,
//! }
//!
//! impl ViewTemplate for ArticleView {
//!     fn html(&self) -> String {
//!         format!("<div><h1>{}</h1></div>", self.record.attrs().title)
//!     }
//! }
//!
//! impl RecordTemplate for ArticleView {
//!     type Attrs = Article;
//!
//!     fn from_record(record: Record<Article>) -> Self {
//!         Self { record }
//!     }
//!
//!     fn record(&self) -> &Record<Article> {
//!         &self.record
//!     }
//! }
//!
//! struct Articles;
//!
//! impl CollectionTemplate for Articles {
//!     type Child = ArticleView;
//! }
//!
//! let surface: SharedSurface = Arc::new(Document::new());
//! let app = Application::new(surface.clone(), "#app");
//! let articles = RecordSet::new(vec![Record::new(Article { id: 1, title: "One".into() })]);
//!
//! app.show(CollectionView::new(Articles, articles, surface).handle()).await?;
//! ```

mod application;
mod collection_view;
mod component;
mod error;
pub mod lifecycle;
pub mod prelude;
mod presenter;
mod reference;
mod region;
mod view;

pub use horizon_weave_core::{events, logging};
pub use horizon_weave_core::{
    callback, Attachment, AttributeValue, Attributes, Callback, CoreError, EventBus, EventHandler, ListenerId,
    Observable, Record, RecordId, RecordSet, RecordSetEvent, Subscription, WeakEventBus,
};

/// The rendering surface.
pub mod dom {
    pub use horizon_weave_dom::*;
}

pub use horizon_weave_macros::Attributes;

pub use application::Application;
pub use collection_view::{ChildAttrs, CollectionTemplate, CollectionView, EmptyViewFactory, Position, RecordsFn};
pub use component::{DomBinding, Mountable, Payload, Rooted, SharedSurface, ViewHandle};
pub use error::{Result, WeaveError};
pub use presenter::{Presenter, PresenterHandle, PresenterTemplate, Presents};
pub use reference::Reference;
pub use region::{Displayable, Region};
pub use view::{RecordTemplate, View, ViewTemplate};

static_assertions::assert_impl_all!(Region: Send, Sync);
static_assertions::assert_impl_all!(Application: Send, Sync);
static_assertions::assert_impl_all!(Reference: Send, Sync);
static_assertions::assert_impl_all!(WeaveError: Send, Sync);
