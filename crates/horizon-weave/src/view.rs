//! Views: components owning one subtree of the rendering surface.
//!
//! A [`View`] pairs a user-supplied [`ViewTemplate`] (markup, declared
//! listeners, lifecycle hooks) with the runtime state every view needs: the
//! surface, the root node, the event bus and the listener wiring.
//!
//! Views that render a [`Record`] implement [`RecordTemplate`] as well and are
//! built with [`View::from_record`]; the record events they declare are
//! subscribed whenever the view mounts and unsubscribed when it is removed.
//!
//! # Example
//!
//! ```ignore
//! use horizon_weave::prelude::*;
//!
//! struct Greeting;
//!
//! impl ViewTemplate for Greeting {
//!     fn html(&self) -> String {
//!         "<p>Hello</p>".into()
//!     }
//! }
//!
//! let view = View::new(Greeting, surface);
//! let markup = view.init().await?;
//! assert_eq!(markup, "<p>Hello</p>");
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;
use horizon_weave_core::{Attachment, Attributes, EventBus, EventHandler, Observable, Record};
use horizon_weave_dom::NodeId;
use parking_lot::{Mutex, RwLock};

use crate::component::{
    create_root, release_root, DomBinding, Mountable, Payload, Rooted, SharedSurface, ViewHandle, Wiring,
};
use crate::error::Result;
use crate::lifecycle::{noop, Lifecycle};

/// What a concrete view supplies.
pub trait ViewTemplate: Send + Sync + Sized + 'static {
    /// Markup of the view. The first element becomes the view's root.
    fn html(&self) -> String;

    /// Surface listeners to wire on mount.
    fn dom_events(&self) -> Vec<DomBinding<View<Self>>> {
        Vec::new()
    }

    /// Runs once, before the view first renders.
    fn before_init<'a>(&'a self, _view: &'a View<Self>) -> BoxFuture<'a, ()> {
        noop()
    }

    /// Runs once, after the view first renders and is wired.
    fn after_init<'a>(&'a self, _view: &'a View<Self>) -> BoxFuture<'a, ()> {
        noop()
    }

    /// Runs before the root is dropped.
    fn before_remove(&self, _view: &View<Self>) {}

    /// Runs after the root is dropped.
    fn after_remove(&self, _view: &View<Self>) {}
}

/// A view template rendering one record.
pub trait RecordTemplate: ViewTemplate {
    /// Attribute type of the rendered record.
    type Attrs: Attributes;

    /// Build the template for `record`.
    fn from_record(record: Record<Self::Attrs>) -> Self;

    /// The rendered record.
    fn record(&self) -> &Record<Self::Attrs>;

    /// Record events handled by the view while it is mounted.
    fn record_events(&self) -> Vec<EventHandler<View<Self>, Record<Self::Attrs>>> {
        Vec::new()
    }
}

type RecordBinder<T> = fn(&View<T>) -> Vec<Attachment>;

fn bind_record_events<T: RecordTemplate>(view: &View<T>) -> Vec<Attachment> {
    let record = view.template.record();
    view.template
        .record_events()
        .iter()
        .map(|handler| handler.attach(record.events(), &view.this))
        .collect()
}

/// A component owning one subtree of a rendering surface.
pub struct View<T> {
    template: T,
    surface: SharedSurface,
    el: RwLock<Option<NodeId>>,
    lifecycle: Lifecycle,
    events: EventBus<Payload>,
    wiring: Mutex<Wiring>,
    record_binder: Option<RecordBinder<T>>,
    this: Weak<View<T>>,
}

impl<T> fmt::Debug for View<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("template", &std::any::type_name::<T>())
            .field("el", &*self.el.read())
            .finish_non_exhaustive()
    }
}

impl<T: ViewTemplate> View<T> {
    /// Create an unrendered view.
    pub fn new(template: T, surface: SharedSurface) -> Arc<Self> {
        Self::build(template, surface, None)
    }

    fn build(template: T, surface: SharedSurface, record_binder: Option<RecordBinder<T>>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            template,
            surface,
            el: RwLock::new(None),
            lifecycle: Lifecycle::new(),
            events: EventBus::new(),
            wiring: Mutex::new(Wiring::default()),
            record_binder,
            this: this.clone(),
        })
    }

    /// The view's template.
    pub fn template(&self) -> &T {
        &self.template
    }

    /// The root node, once rendered or mounted.
    pub fn el(&self) -> Option<NodeId> {
        *self.el.read()
    }

    /// The surface the view renders into.
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    /// The bus view events are published on.
    pub fn events(&self) -> &EventBus<Payload> {
        &self.events
    }

    /// Once-only hook bookkeeping.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// This view as a type-erased handle.
    pub fn handle(self: &Arc<Self>) -> ViewHandle {
        self.clone()
    }

    /// Render the view and wire its listeners.
    ///
    /// Runs `before_init` (once), parses the template markup, keeps its
    /// first element as the root, wires listeners, runs `after_init` (once)
    /// and returns the serialized root. Calling it again re-renders: the
    /// previous root is dropped first.
    pub async fn init(&self) -> Result<String> {
        let markup = self.render_markup().await;
        let root = create_root::<T>(&*self.surface, &markup)?;
        self.discard_root()?;
        self.mount_to(root)?;
        self.complete_init().await;
        tracing::debug!(target: "horizon_weave::view", view = std::any::type_name::<T>(), "view initialized");
        Ok(self.surface.outer_html(root)?)
    }

    /// Adopt `node` as the root and wire listeners, without the init hooks.
    ///
    /// Used when a parent rendered this view's markup in bulk.
    pub fn mount_to(&self, node: NodeId) -> Result<()> {
        self.unwire();
        *self.el.write() = Some(node);

        let bindings = self.template.dom_events();
        let attachments = self.record_binder.map(|bind| bind(self)).unwrap_or_default();

        let mut wiring = self.wiring.lock();
        wiring.hold(attachments);
        wiring.bind(&bindings, &*self.surface, node, &self.this)
    }

    /// Run the remove hooks, unwire and drop the root.
    ///
    /// Does nothing if the view was never rendered.
    pub fn remove(&self) -> Result<()> {
        if self.el().is_none() {
            return Ok(());
        }
        self.template.before_remove(self);
        self.discard_root()?;
        self.template.after_remove(self);
        tracing::debug!(target: "horizon_weave::view", view = std::any::type_name::<T>(), "view removed");
        Ok(())
    }

    /// Run `before_init` (once) and produce the template markup.
    pub(crate) async fn render_markup(&self) -> String {
        self.lifecycle.before_init(|| self.template.before_init(self)).await;
        self.template.html()
    }

    /// Run `after_init` (once).
    pub(crate) async fn complete_init(&self) {
        self.lifecycle.after_init(|| self.template.after_init(self)).await;
    }

    fn unwire(&self) {
        let wiring = std::mem::take(&mut *self.wiring.lock());
        wiring.teardown(&*self.surface);
    }

    fn discard_root(&self) -> Result<()> {
        self.unwire();
        let previous = self.el.write().take();
        match previous {
            Some(root) => release_root(&*self.surface, root),
            None => Ok(()),
        }
    }
}

impl<T: RecordTemplate> View<T> {
    /// Create an unrendered view of `record`.
    pub fn from_record(record: Record<T::Attrs>, surface: SharedSurface) -> Arc<Self> {
        Self::bound(T::from_record(record), surface)
    }

    /// Create an unrendered view whose record events are wired on mount.
    pub fn bound(template: T, surface: SharedSurface) -> Arc<Self> {
        Self::build(template, surface, Some(bind_record_events::<T>))
    }

    /// The rendered record.
    pub fn record(&self) -> &Record<T::Attrs> {
        self.template.record()
    }
}

impl<T: ViewTemplate> Observable<Payload> for View<T> {
    fn events(&self) -> &EventBus<Payload> {
        &self.events
    }
}

impl<T: ViewTemplate> Rooted for View<T> {
    fn el(&self) -> Option<NodeId> {
        View::el(self)
    }

    fn surface(&self) -> &SharedSurface {
        &self.surface
    }
}

impl<T: ViewTemplate> Mountable for View<T> {
    fn init(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(View::init(self))
    }

    fn mount_to(&self, node: NodeId) -> Result<()> {
        View::mount_to(self, node)
    }

    fn remove(&self) -> Result<()> {
        View::remove(self)
    }

    fn events(&self) -> &EventBus<Payload> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_weave_core::events;
    use horizon_weave_dom::{AdjacentPosition, Document, DomEvent, RenderSurface};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        before_init: AtomicUsize,
        after_init: AtomicUsize,
        before_remove: AtomicUsize,
        after_remove: AtomicUsize,
        clicks: AtomicUsize,
    }

    #[derive(Default)]
    struct Panel {
        counters: Counters,
    }

    impl Panel {
        fn clicked(view: &View<Self>, _event: &DomEvent) {
            view.template().counters.clicks.fetch_add(1, Ordering::SeqCst);
            view.trigger("clicked", &Payload::Null);
        }
    }

    impl ViewTemplate for Panel {
        fn html(&self) -> String {
            "<div class=\"panel\"><button>Go</button></div>".into()
        }

        fn dom_events(&self) -> Vec<DomBinding<View<Self>>> {
            vec![DomBinding::new("button", "click", Panel::clicked)]
        }

        fn before_init<'a>(&'a self, view: &'a View<Self>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                assert!(view.el().is_none());
                self.counters.before_init.fetch_add(1, Ordering::SeqCst);
            })
        }

        fn after_init<'a>(&'a self, view: &'a View<Self>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                assert!(view.el().is_some());
                self.counters.after_init.fetch_add(1, Ordering::SeqCst);
            })
        }

        fn before_remove(&self, view: &View<Self>) {
            assert!(view.el().is_some());
            self.counters.before_remove.fetch_add(1, Ordering::SeqCst);
        }

        fn after_remove(&self, view: &View<Self>) {
            assert!(view.el().is_none());
            self.counters.after_remove.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn surface() -> SharedSurface {
        Arc::new(Document::new())
    }

    #[tokio::test]
    async fn test_init_renders_and_wires() {
        let surface = surface();
        let view = View::new(Panel::default(), surface.clone());

        let markup = view.init().await.unwrap();
        assert_eq!(markup, "<div class=\"panel\"><button>Go</button></div>");

        let triggered = Arc::new(AtomicUsize::new(0));
        let sink = triggered.clone();
        view.events().on(
            "clicked",
            horizon_weave_core::callback(move |_: &Payload, _| {
                sink.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let button = surface.query_selector(view.el().unwrap(), "button").unwrap().unwrap();
        surface.dispatch(button, "click").unwrap();

        assert_eq!(view.template().counters.clicks.load(Ordering::SeqCst), 1);
        assert_eq!(triggered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hooks_run_once_across_reinit() {
        let document = Arc::new(Document::new());
        let view = View::new(Panel::default(), document.clone());

        view.init().await.unwrap();
        let first = view.el().unwrap();
        view.init().await.unwrap();

        let counters = &view.template().counters;
        assert_eq!(counters.before_init.load(Ordering::SeqCst), 1);
        assert_eq!(counters.after_init.load(Ordering::SeqCst), 1);
        assert!(!document.contains(first));
        assert_eq!(document.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let surface = surface();
        let view = View::new(Panel::default(), surface.clone());

        view.remove().unwrap();
        assert_eq!(view.template().counters.before_remove.load(Ordering::SeqCst), 0);

        view.init().await.unwrap();
        let root = view.el().unwrap();
        surface
            .insert_node(surface.body(), AdjacentPosition::BeforeEnd, root)
            .unwrap();

        view.remove().unwrap();
        assert!(view.el().is_none());
        assert!(!surface.contains(root));
        assert_eq!(surface.inner_html(surface.body()).unwrap(), "");

        let counters = &view.template().counters;
        assert_eq!(counters.before_remove.load(Ordering::SeqCst), 1);
        assert_eq!(counters.after_remove.load(Ordering::SeqCst), 1);
    }

    struct Greeting;

    impl ViewTemplate for Greeting {
        fn html(&self) -> String {
            "<p>Hello <b>World</b></p>".into()
        }
    }

    #[tokio::test]
    async fn test_init_keeps_inline_spacing() {
        let view = View::new(Greeting, Arc::new(Document::new()));
        assert_eq!(view.init().await.unwrap(), "<p>Hello <b>World</b></p>");
    }

    #[tokio::test]
    async fn test_mount_to_skips_hooks() {
        let surface = surface();
        let node = surface
            .parse_fragment("<div class=\"panel\"><button>Go</button></div>")
            .unwrap()[0];
        let view = View::new(Panel::default(), surface.clone());

        view.mount_to(node).unwrap();
        assert_eq!(view.el(), Some(node));
        assert_eq!(view.template().counters.before_init.load(Ordering::SeqCst), 0);

        let button = surface.query_selector(node, "button").unwrap().unwrap();
        surface.dispatch(button, "click").unwrap();
        assert_eq!(view.template().counters.clicks.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug, Clone, PartialEq, horizon_weave_macros::Attributes)]
    struct Note {
        #[attributes(id)]
        id: i64,
        text: String,
    }

    struct NoteView {
        record: Record<Note>,
    }

    impl NoteView {
        fn text_changed(view: &View<Self>, record: &Record<Note>, _name: &str) {
            if let Some(el) = view.el() {
                let text = record.attrs().text.clone();
                view.surface().set_text_content(el, &text).unwrap();
            }
        }
    }

    impl ViewTemplate for NoteView {
        fn html(&self) -> String {
            format!("<p>{}</p>", self.record.attrs().text)
        }
    }

    impl RecordTemplate for NoteView {
        type Attrs = Note;

        fn from_record(record: Record<Note>) -> Self {
            Self { record }
        }

        fn record(&self) -> &Record<Note> {
            &self.record
        }

        fn record_events(&self) -> Vec<EventHandler<View<Self>, Record<Note>>> {
            vec![EventHandler::new(events::attribute_changed("text"), NoteView::text_changed)]
        }
    }

    #[tokio::test]
    async fn test_record_events_follow_mounting() {
        let surface = surface();
        let record = Record::new(Note {
            id: 1,
            text: "draft".into(),
        });
        let view = View::<NoteView>::from_record(record.clone(), surface.clone());
        assert_eq!(record.events().listener_count("change text"), 0);

        view.init().await.unwrap();
        assert_eq!(record.events().listener_count("change text"), 1);

        record.set_attribute("text", String::from("final"), true).unwrap();
        assert_eq!(surface.outer_html(view.el().unwrap()).unwrap(), "<p>final</p>");

        view.remove().unwrap();
        assert_eq!(record.events().listener_count("change text"), 0);
    }
}
