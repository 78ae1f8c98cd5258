//! Rendering a record set as a list of child views.
//!
//! A [`CollectionView`] owns a container element and renders every record of
//! a [`RecordSet`] into it as a child [`View`]. Children can be added at the
//! start, at the end, or next to the child of another record, one at a time
//! or in batches; batches render all child markup first and insert it with a
//! single surface operation.
//!
//! When there is nothing to render and an empty-view factory is set, the
//! empty view is shown in place of the children until the next insert.
//!
//! # Example
//!
//! ```ignore
//! use horizon_weave::prelude::*;
//!
//! struct ArticleList;
//!
//! impl CollectionTemplate for ArticleList {
//!     type Child = ArticleView;
//!
//!     fn html(&self) -> String {
//!         "<section><h2>Articles</h2><div class=\"items\"></div></section>".into()
//!     }
//!
//!     fn child_container(&self) -> Option<&str> {
//!         Some(".items")
//!     }
//! }
//!
//! let list = CollectionView::new(ArticleList, articles, surface);
//! list.set_sort(|mut records| {
//!     records.sort_by_key(|record| record.attrs().title.clone());
//!     records
//! });
//! list.init().await?;
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::future::{join_all, BoxFuture};
use horizon_weave_core::logging::{span_names, PerfSpan};
use horizon_weave_core::{Attachment, EventBus, EventHandler, Observable, Record, RecordId, RecordSet, RecordSetEvent};
use horizon_weave_dom::{AdjacentPosition, NodeId, RenderSurface};
use parking_lot::{Mutex, RwLock};

use crate::component::{
    create_root, release_root, DomBinding, Mountable, Payload, Rooted, SharedSurface, ViewHandle, Wiring,
};
use crate::error::{Result, WeaveError};
use crate::lifecycle::{noop, Lifecycle};
use crate::reference::Reference;
use crate::view::{RecordTemplate, View};

/// Attribute type of the records a collection template renders.
pub type ChildAttrs<T> = <<T as CollectionTemplate>::Child as RecordTemplate>::Attrs;

/// A transformation applied to the records before they are rendered.
pub type RecordsFn<A> = Arc<dyn Fn(Vec<Record<A>>) -> Vec<Record<A>> + Send + Sync>;

/// Builds the view shown while there is nothing to render.
pub type EmptyViewFactory = Arc<dyn Fn(&SharedSurface) -> ViewHandle + Send + Sync>;

/// Where new child views go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Position {
    /// Before every existing child.
    Start,
    /// After every existing child.
    #[default]
    End,
    /// Immediately before the child of the given record.
    Before(RecordId),
    /// Immediately after the child of the given record.
    After(RecordId),
}

/// What a concrete collection view supplies.
pub trait CollectionTemplate: Send + Sync + Sized + 'static {
    /// Template of the child views.
    type Child: RecordTemplate;

    /// Markup of the container.
    fn html(&self) -> String {
        String::from("<div></div>")
    }

    /// Selector of the element children are rendered into, relative to the
    /// root. `None` renders into the root itself.
    fn child_container(&self) -> Option<&str> {
        None
    }

    /// Record set events handled while the collection view is mounted.
    fn record_set_events(&self) -> Vec<EventHandler<CollectionView<Self>, RecordSetEvent<ChildAttrs<Self>>>> {
        Vec::new()
    }

    /// Child view events handled while the child is in the collection.
    fn child_events(&self) -> Vec<EventHandler<CollectionView<Self>, Payload>> {
        Vec::new()
    }

    /// Surface listeners to wire on mount.
    fn dom_events(&self) -> Vec<DomBinding<CollectionView<Self>>> {
        Vec::new()
    }

    /// Runs once, before the collection view first renders.
    fn before_init<'a>(&'a self, _view: &'a CollectionView<Self>) -> BoxFuture<'a, ()> {
        noop()
    }

    /// Runs once, after the collection view first renders and is wired.
    fn after_init<'a>(&'a self, _view: &'a CollectionView<Self>) -> BoxFuture<'a, ()> {
        noop()
    }

    /// Runs before the children and the root are dropped.
    fn before_remove(&self, _view: &CollectionView<Self>) {}

    /// Runs after the children and the root are dropped.
    fn after_remove(&self, _view: &CollectionView<Self>) {}
}

/// A rendered child and the bridges from its events to the collection view.
struct Child<C> {
    view: Arc<View<C>>,
    attachments: Vec<Attachment>,
}

impl<C: RecordTemplate> Child<C> {
    fn renders(&self, id: &RecordId) -> Result<bool> {
        Ok(self.view.record().id()? == *id)
    }

    fn remove(self) -> Result<()> {
        for attachment in self.attachments {
            attachment.detach();
        }
        self.view.remove()
    }
}

/// Renders a [`RecordSet`] as child views.
pub struct CollectionView<T: CollectionTemplate> {
    template: T,
    records: RecordSet<ChildAttrs<T>>,
    surface: SharedSurface,
    el: RwLock<Option<NodeId>>,
    lifecycle: Lifecycle,
    events: EventBus<Payload>,
    container: Option<Reference>,
    children: RwLock<Vec<Child<T::Child>>>,
    empty_view: Mutex<Option<ViewHandle>>,
    empty_view_factory: RwLock<Option<EmptyViewFactory>>,
    filter: RwLock<Option<RecordsFn<ChildAttrs<T>>>>,
    sort: RwLock<Option<RecordsFn<ChildAttrs<T>>>>,
    wiring: Mutex<Wiring>,
    this: Weak<Self>,
}

impl<T: CollectionTemplate> fmt::Debug for CollectionView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionView")
            .field("template", &std::any::type_name::<T>())
            .field("el", &*self.el.read())
            .field("children", &self.children.read().len())
            .finish_non_exhaustive()
    }
}

impl<T: CollectionTemplate> CollectionView<T> {
    /// Create an unrendered collection view of `records`.
    pub fn new(template: T, records: RecordSet<ChildAttrs<T>>, surface: SharedSurface) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let container = template.child_container().map(|selector| {
                let parent: Weak<dyn Rooted> = this.clone();
                Reference::from_weak(parent, selector)
            });
            Self {
                template,
                records,
                surface,
                el: RwLock::new(None),
                lifecycle: Lifecycle::new(),
                events: EventBus::new(),
                container,
                children: RwLock::new(Vec::new()),
                empty_view: Mutex::new(None),
                empty_view_factory: RwLock::new(None),
                filter: RwLock::new(None),
                sort: RwLock::new(None),
                wiring: Mutex::new(Wiring::default()),
                this: this.clone(),
            }
        })
    }

    /// The collection view's template.
    pub fn template(&self) -> &T {
        &self.template
    }

    /// The rendered record set.
    pub fn records(&self) -> &RecordSet<ChildAttrs<T>> {
        &self.records
    }

    /// The root node, once rendered or mounted.
    pub fn el(&self) -> Option<NodeId> {
        *self.el.read()
    }

    /// The surface the collection view renders into.
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    /// The bus collection view events are published on.
    pub fn events(&self) -> &EventBus<Payload> {
        &self.events
    }

    /// Once-only hook bookkeeping.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// This collection view as a type-erased handle.
    pub fn handle(self: &Arc<Self>) -> ViewHandle {
        self.clone()
    }

    /// Narrow the records rendered by `init`. Applied before the sort.
    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(Vec<Record<ChildAttrs<T>>>) -> Vec<Record<ChildAttrs<T>>> + Send + Sync + 'static,
    {
        *self.filter.write() = Some(Arc::new(filter));
    }

    /// Order the records rendered by `init`. Applied after the filter.
    pub fn set_sort<F>(&self, sort: F)
    where
        F: Fn(Vec<Record<ChildAttrs<T>>>) -> Vec<Record<ChildAttrs<T>>> + Send + Sync + 'static,
    {
        *self.sort.write() = Some(Arc::new(sort));
    }

    /// Show a view built by `factory` while there is nothing to render.
    pub fn set_empty_view<F>(&self, factory: F)
    where
        F: Fn(&SharedSurface) -> ViewHandle + Send + Sync + 'static,
    {
        *self.empty_view_factory.write() = Some(Arc::new(factory));
    }

    /// The child views, in insertion order.
    pub fn child_views(&self) -> Vec<Arc<View<T::Child>>> {
        self.children.read().iter().map(|child| child.view.clone()).collect()
    }

    /// The empty view, while it is displayed.
    pub fn empty_view(&self) -> Option<ViewHandle> {
        self.empty_view.lock().clone()
    }

    /// The element children are rendered into.
    pub fn child_container(&self) -> Result<NodeId> {
        match &self.container {
            Some(reference) => reference.get(),
            None => self.el().ok_or(WeaveError::NotRendered),
        }
    }

    /// Render the container and the records, then wire listeners.
    ///
    /// The records are filtered, then sorted. With nothing left to render
    /// and an empty-view factory set, the empty view is shown instead.
    /// Calling `init` again drops the previous rendering first.
    pub async fn init(&self) -> Result<String> {
        self.lifecycle.before_init(|| self.template.before_init(self)).await;

        let markup = self.template.html();
        let root = create_root::<T>(&*self.surface, &markup)?;
        self.discard_rendering()?;
        *self.el.write() = Some(root);

        let records = self.records_to_render();
        tracing::debug!(
            target: "horizon_weave::collection",
            records = records.len(),
            "rendering collection"
        );
        if records.is_empty() {
            self.show_empty_view().await?;
        } else {
            self.add_child_views(records, Position::End).await?;
        }

        self.wire(root)?;
        self.lifecycle.after_init(|| self.template.after_init(self)).await;
        Ok(self.surface.outer_html(root)?)
    }

    /// Adopt `node` as the root and wire listeners, without rendering
    /// children or running the init hooks.
    pub fn mount_to(&self, node: NodeId) -> Result<()> {
        self.unwire();
        *self.el.write() = Some(node);
        if let Some(reference) = &self.container {
            reference.reset();
        }
        self.wire(node)
    }

    /// Render `records` as child views at `position`, with one insertion.
    ///
    /// Every child runs `before_init` and renders its markup before the
    /// surface is touched; the markup is inserted as a whole, then each new
    /// element is bound to its child, whose `after_init` runs last.
    pub async fn add_child_views(&self, records: Vec<Record<ChildAttrs<T>>>, position: Position) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let (anchor, adjacent, container) = self.resolve_position(&position)?;
        self.hide_empty_view()?;

        let views: Vec<Arc<View<T::Child>>> = records
            .into_iter()
            .map(|record| View::<T::Child>::from_record(record, self.surface.clone()))
            .collect();
        let markup = join_all(views.iter().map(|view| view.render_markup()))
            .await
            .concat();

        let nodes = {
            let _span = PerfSpan::new(span_names::RENDER);
            self.surface.insert_adjacent_markup(anchor, adjacent, &markup)?;
            self.inserted_nodes(container, anchor, &position, views.len())?
        };

        for (view, node) in views.into_iter().zip(nodes) {
            view.mount_to(node)?;
            let attachments = self.subscribe_to(&view);
            view.complete_init().await;
            self.children.write().push(Child { view, attachments });
        }
        Ok(())
    }

    /// Render `record` as a child view at `position`.
    pub async fn add_child_view(&self, record: Record<ChildAttrs<T>>, position: Position) -> Result<()> {
        let (anchor, adjacent, _) = self.resolve_position(&position)?;
        self.hide_empty_view()?;

        let view = View::<T::Child>::from_record(record, self.surface.clone());
        let attachments = self.subscribe_to(&view);
        let child = Child { view, attachments };

        let placed = match child.view.init().await {
            Ok(_) => match child.view.el() {
                Some(node) => self.surface.insert_node(anchor, adjacent, node).map_err(WeaveError::from),
                None => Err(WeaveError::NotRendered),
            },
            Err(err) => Err(err),
        };
        if let Err(err) = placed {
            if let Err(cleanup) = child.remove() {
                tracing::warn!(target: "horizon_weave::collection", error = %cleanup, "failed to drop a child view that could not be placed");
            }
            return Err(err);
        }

        self.children.write().push(child);
        Ok(())
    }

    /// Remove the child view of the record with identity `id`.
    ///
    /// Returns false if no child renders that record.
    pub fn remove_child_view(&self, id: &RecordId) -> Result<bool> {
        let removed = {
            let mut children = self.children.write();
            let mut index = None;
            for (i, child) in children.iter().enumerate() {
                if child.renders(id)? {
                    index = Some(i);
                    break;
                }
            }
            index.map(|i| children.remove(i))
        };
        match removed {
            Some(child) => {
                child.remove()?;
                tracing::trace!(target: "horizon_weave::collection", %id, "child view removed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every child view.
    pub fn remove_all_child_views(&self) -> Result<()> {
        let children = std::mem::take(&mut *self.children.write());
        let mut result = Ok(());
        for child in children {
            if let Err(err) = child.remove()
                && result.is_ok()
            {
                result = Err(err);
            }
        }
        result
    }

    /// Run the remove hooks, drop children, the empty view and the root, and
    /// stop listening to the record set.
    ///
    /// Does nothing if the collection view was never rendered.
    pub fn remove(&self) -> Result<()> {
        if self.el().is_none() {
            return Ok(());
        }
        self.template.before_remove(self);
        self.discard_rendering()?;
        self.template.after_remove(self);
        tracing::debug!(target: "horizon_weave::collection", "collection view removed");
        Ok(())
    }

    fn records_to_render(&self) -> Vec<Record<ChildAttrs<T>>> {
        let filter = self.filter.read().clone();
        let sort = self.sort.read().clone();

        let mut records = self.records.records();
        if let Some(filter) = filter {
            records = filter(records);
        }
        if let Some(sort) = sort {
            records = sort(records);
        }
        records
    }

    /// Anchor node and relative position for an insert, plus the container.
    fn resolve_position(&self, position: &Position) -> Result<(NodeId, AdjacentPosition, NodeId)> {
        if self.el().is_none() {
            tracing::warn!(target: "horizon_weave::collection", "cannot add child views before the container is rendered");
            return Err(WeaveError::NotRendered);
        }
        let container = self.child_container()?;
        Ok(match position {
            Position::Start => (container, AdjacentPosition::AfterBegin, container),
            Position::End => (container, AdjacentPosition::BeforeEnd, container),
            Position::Before(id) => (self.target(id)?, AdjacentPosition::BeforeBegin, container),
            Position::After(id) => (self.target(id)?, AdjacentPosition::AfterEnd, container),
        })
    }

    /// Root of the child view rendering record `id`.
    fn target(&self, id: &RecordId) -> Result<NodeId> {
        for view in self.child_views() {
            if view.record().id()? == *id {
                return view.el().ok_or_else(|| WeaveError::TargetNotMounted { id: id.clone() });
            }
        }
        tracing::warn!(target: "horizon_weave::collection", %id, "insert target not found");
        Err(WeaveError::TargetNotFound { id: id.clone() })
    }

    /// The `count` elements a bulk insert at `position` just created, in order.
    fn inserted_nodes(&self, container: NodeId, anchor: NodeId, position: &Position, count: usize) -> Result<Vec<NodeId>> {
        let nodes = match position {
            Position::Start => {
                let children = self.surface.element_children(container)?;
                children.into_iter().take(count).collect()
            }
            Position::End => {
                let children = self.surface.element_children(container)?;
                let skip = children.len().saturating_sub(count);
                children.into_iter().skip(skip).collect()
            }
            Position::Before(_) => {
                let mut nodes = walk_siblings(&*self.surface, anchor, count, |surface, node| {
                    surface.previous_element_sibling(node)
                })?;
                nodes.reverse();
                nodes
            }
            Position::After(_) => walk_siblings(&*self.surface, anchor, count, |surface, node| {
                surface.next_element_sibling(node)
            })?,
        };

        if nodes.len() < count {
            return Err(element_not_found(count, nodes.len()));
        }
        Ok(nodes)
    }

    fn subscribe_to(&self, view: &View<T::Child>) -> Vec<Attachment> {
        self.template
            .child_events()
            .iter()
            .map(|handler| handler.attach(view.events(), &self.this))
            .collect()
    }

    async fn show_empty_view(&self) -> Result<()> {
        let factory = self.empty_view_factory.read().clone();
        let Some(factory) = factory else {
            return Ok(());
        };
        let container = self.child_container()?;

        let view = factory(&self.surface);
        view.init().await?;
        if let Some(el) = view.el() {
            self.surface.insert_node(container, AdjacentPosition::BeforeEnd, el)?;
        }
        *self.empty_view.lock() = Some(view);
        Ok(())
    }

    fn hide_empty_view(&self) -> Result<()> {
        let shown = self.empty_view.lock().take();
        match shown {
            Some(view) => view.remove(),
            None => Ok(()),
        }
    }

    fn wire(&self, root: NodeId) -> Result<()> {
        let bindings = self.template.dom_events();
        let attachments: Vec<Attachment> = self
            .template
            .record_set_events()
            .iter()
            .map(|handler| handler.attach(self.records.events(), &self.this))
            .collect();

        let mut wiring = self.wiring.lock();
        wiring.hold(attachments);
        wiring.bind(&bindings, &*self.surface, root, &self.this)
    }

    fn unwire(&self) {
        let wiring = std::mem::take(&mut *self.wiring.lock());
        wiring.teardown(&*self.surface);
    }

    /// Drop children, the empty view, listeners and the root.
    fn discard_rendering(&self) -> Result<()> {
        self.unwire();
        let children = self.remove_all_child_views();
        let empty = self.hide_empty_view();
        if let Some(reference) = &self.container {
            reference.reset();
        }
        let previous = self.el.write().take();
        if let Some(root) = previous {
            release_root(&*self.surface, root)?;
        }
        children.and(empty)
    }
}

fn walk_siblings(
    surface: &dyn RenderSurface,
    from: NodeId,
    count: usize,
    step: impl Fn(&dyn RenderSurface, NodeId) -> horizon_weave_dom::Result<Option<NodeId>>,
) -> Result<Vec<NodeId>> {
    let mut nodes = Vec::with_capacity(count);
    let mut cursor = from;
    while nodes.len() < count {
        match step(surface, cursor)? {
            Some(node) => {
                nodes.push(node);
                cursor = node;
            }
            None => break,
        }
    }
    Ok(nodes)
}

fn element_not_found(expected: usize, found: usize) -> WeaveError {
    tracing::warn!(target: "horizon_weave::collection", expected, found, "child markup produced too few elements");
    WeaveError::ElementNotFound { expected, found }
}

impl<T: CollectionTemplate> Observable<Payload> for CollectionView<T> {
    fn events(&self) -> &EventBus<Payload> {
        &self.events
    }
}

impl<T: CollectionTemplate> Rooted for CollectionView<T> {
    fn el(&self) -> Option<NodeId> {
        CollectionView::el(self)
    }

    fn surface(&self) -> &SharedSurface {
        &self.surface
    }
}

impl<T: CollectionTemplate> Mountable for CollectionView<T> {
    fn init(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(CollectionView::init(self))
    }

    fn mount_to(&self, node: NodeId) -> Result<()> {
        CollectionView::mount_to(self, node)
    }

    fn remove(&self) -> Result<()> {
        CollectionView::remove(self)
    }

    fn events(&self) -> &EventBus<Payload> {
        &self.events
    }
}
