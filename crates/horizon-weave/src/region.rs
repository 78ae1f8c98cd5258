//! Regions: named slots that swap the component they display.

use std::fmt;
use std::sync::{Arc, Weak};

use horizon_weave_core::{events, EventBus, Observable};
use horizon_weave_dom::{AdjacentPosition, NodeId};
use parking_lot::Mutex;

use crate::component::{same_component, Payload, Rooted, ViewHandle};
use crate::error::{Result, WeaveError};
use crate::presenter::PresenterHandle;
use crate::reference::Reference;

/// Anything a region can display.
#[derive(Clone)]
pub enum Displayable {
    /// A bare view.
    View(ViewHandle),
    /// A presenter, displayed through its view.
    Presenter(PresenterHandle),
}

impl fmt::Debug for Displayable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(_) => f.write_str("View"),
            Self::Presenter(_) => f.write_str("Presenter"),
        }
    }
}

impl From<ViewHandle> for Displayable {
    fn from(view: ViewHandle) -> Self {
        Self::View(view)
    }
}

impl From<PresenterHandle> for Displayable {
    fn from(presenter: PresenterHandle) -> Self {
        Self::Presenter(presenter)
    }
}

/// A slot inside a parent component that displays one view or presenter at a
/// time.
///
/// The container is found by selector under the parent's root on first use
/// and remembered. `"show"` and `"empty"` are triggered on the region's bus.
pub struct Region {
    container: Reference,
    view: Mutex<Option<ViewHandle>>,
    presenter: Mutex<Option<PresenterHandle>>,
    events: EventBus<Payload>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("selector", &self.container.selector())
            .field("has_view", &self.view.lock().is_some())
            .field("has_presenter", &self.presenter.lock().is_some())
            .finish()
    }
}

impl Region {
    /// A region in the element matching `selector` under `parent`'s root.
    pub fn new<P: Rooted + 'static>(parent: &Arc<P>, selector: impl Into<String>) -> Self {
        Self::with_container(Reference::new(parent, selector))
    }

    /// Like [`new`](Self::new), for a parent that is only reachable weakly.
    pub fn from_weak(parent: Weak<dyn Rooted>, selector: impl Into<String>) -> Self {
        Self::with_container(Reference::from_weak(parent, selector))
    }

    fn with_container(container: Reference) -> Self {
        Self {
            container,
            view: Mutex::new(None),
            presenter: Mutex::new(None),
            events: EventBus::new(),
        }
    }

    /// The container element.
    pub fn el(&self) -> Result<NodeId> {
        self.container.get()
    }

    /// The displayed view, which is the presenter's view when a presenter
    /// is displayed.
    pub fn view(&self) -> Option<ViewHandle> {
        self.view.lock().clone()
    }

    /// The displayed presenter.
    pub fn presenter(&self) -> Option<PresenterHandle> {
        self.presenter.lock().clone()
    }

    /// The bus region events are published on.
    pub fn events(&self) -> &EventBus<Payload> {
        &self.events
    }

    /// Display `displayable`, replacing whatever was displayed.
    ///
    /// The new component is rendered first; the previous one is torn down
    /// only once the new root exists.
    pub async fn show(&self, displayable: impl Into<Displayable>) -> Result<()> {
        let container = self.container.get()?;

        let (view, presenter) = match displayable.into() {
            Displayable::View(view) => {
                view.init().await?;
                (view, None)
            }
            Displayable::Presenter(presenter) => {
                presenter.init().await;
                let view = presenter.view();
                view.init().await?;
                (view, Some(presenter))
            }
        };
        let Some(el) = view.el() else {
            return Err(WeaveError::NotRendered);
        };

        self.replace(&view, presenter.as_ref())?;
        view.surface().insert_node(container, AdjacentPosition::BeforeEnd, el)?;
        *self.view.lock() = Some(view);
        *self.presenter.lock() = presenter;

        tracing::debug!(target: "horizon_weave::region", selector = self.container.selector(), "region shown");
        self.events.trigger(events::SHOW, &Payload::Null);
        Ok(())
    }

    /// Tear down the displayed presenter and view.
    ///
    /// Both are checked independently; a presenter's view is removed along
    /// with the presenter.
    pub fn empty(&self) -> Result<()> {
        let presenter = self.presenter.lock().take();
        let view = self.view.lock().take();

        let mut result = Ok(());
        if let Some(presenter) = presenter {
            result = presenter.remove();
        }
        if let Some(view) = view
            && let Err(err) = view.remove()
            && result.is_ok()
        {
            result = Err(err);
        }

        self.events.trigger(events::EMPTY, &Payload::Null);
        result
    }

    /// Empty the region for `next`, keeping whichever of the current
    /// components is being shown again.
    ///
    /// A replaced presenter whose view is being shown again releases the view
    /// instead of removing it. On failure the current components stay in
    /// their slots.
    fn replace(&self, next: &ViewHandle, next_presenter: Option<&PresenterHandle>) -> Result<()> {
        let mut presenter = self.presenter.lock().take();
        let view = self.view.lock().take();

        if let Some(current) = &presenter
            && !next_presenter.is_some_and(|next| same_component(next, current))
        {
            if same_component(&current.view(), next) {
                current.release();
            } else if let Err(err) = current.remove() {
                self.restore(presenter, view);
                return Err(err);
            }
            presenter = None;
        }
        if let Some(current) = &view
            && !same_component(current, next)
            && let Err(err) = current.remove()
        {
            self.restore(presenter, view);
            return Err(err);
        }
        Ok(())
    }

    fn restore(&self, presenter: Option<PresenterHandle>, view: Option<ViewHandle>) {
        *self.presenter.lock() = presenter;
        *self.view.lock() = view;
    }
}

impl Observable<Payload> for Region {
    fn events(&self) -> &EventBus<Payload> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::SharedSurface;
    use crate::presenter::{Presenter, PresenterTemplate, Presents};
    use crate::view::{View, ViewTemplate};
    use futures_util::future::BoxFuture;
    use horizon_weave_core::{callback, EventHandler, Record};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use horizon_weave_dom::{Document, RenderSurface};
    use parking_lot::RwLock;

    struct Page {
        surface: SharedSurface,
        el: RwLock<Option<NodeId>>,
    }

    impl Rooted for Page {
        fn el(&self) -> Option<NodeId> {
            *self.el.read()
        }

        fn surface(&self) -> &SharedSurface {
            &self.surface
        }
    }

    struct Text(&'static str);

    impl ViewTemplate for Text {
        fn html(&self) -> String {
            format!("<p>{}</p>", self.0)
        }
    }

    #[derive(Debug, Clone, PartialEq, horizon_weave_macros::Attributes)]
    struct Note {
        #[attributes(id)]
        id: i64,
    }

    #[derive(Default)]
    struct Presses(AtomicUsize);

    impl Presses {
        fn pressed(presenter: &Presenter<Self>, _payload: &Payload, _name: &str) {
            presenter.template().0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl PresenterTemplate for Presses {
        type Attrs = Note;

        fn view_events(&self) -> Vec<EventHandler<Presenter<Self>, Payload>> {
            vec![EventHandler::new("press", Presses::pressed)]
        }
    }

    /// A presenter whose teardown always fails.
    struct Stuck {
        view: ViewHandle,
    }

    impl Presents for Stuck {
        fn init(&self) -> BoxFuture<'_, ()> {
            Box::pin(async {})
        }

        fn remove(&self) -> Result<()> {
            Err(WeaveError::NotRendered)
        }

        fn release(&self) {}

        fn view(&self) -> ViewHandle {
            self.view.clone()
        }
    }

    fn page() -> Arc<Page> {
        let surface: SharedSurface = Arc::new(Document::new());
        let root = surface.parse_fragment("<div><main/></div>").unwrap()[0];
        Arc::new(Page {
            surface,
            el: RwLock::new(Some(root)),
        })
    }

    fn contents(page: &Page, region: &Region) -> String {
        page.surface.inner_html(region.el().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_show_replaces_previous_view() {
        let page = page();
        let region = Region::new(&page, "main");

        let first = View::new(Text("one"), page.surface.clone());
        region.show(first.handle()).await.unwrap();
        assert_eq!(contents(&page, &region), "<p>one</p>");

        let second = View::new(Text("two"), page.surface.clone());
        region.show(second.handle()).await.unwrap();
        assert_eq!(contents(&page, &region), "<p>two</p>");
        assert!(first.el().is_none());
        assert!(region.view().is_some());
    }

    #[tokio::test]
    async fn test_showing_the_same_view_again() {
        let page = page();
        let region = Region::new(&page, "main");
        let view = View::new(Text("same"), page.surface.clone());

        region.show(view.handle()).await.unwrap();
        region.show(view.handle()).await.unwrap();

        assert_eq!(contents(&page, &region), "<p>same</p>");
        assert!(view.el().is_some());
    }

    #[tokio::test]
    async fn test_replaced_presenter_releases_a_shared_view() {
        let page = page();
        let region = Region::new(&page, "main");
        let view = View::new(Text("shared"), page.surface.clone());
        let record = Record::new(Note { id: 1 });
        let first = Presenter::new(Presses::default(), record.clone(), view.handle());
        let second = Presenter::new(Presses::default(), record, view.handle());

        region.show(first.handle()).await.unwrap();
        region.show(second.handle()).await.unwrap();
        view.trigger("press", &Payload::Null);

        assert_eq!(first.template().0.load(Ordering::SeqCst), 0);
        assert_eq!(second.template().0.load(Ordering::SeqCst), 1);
        assert_eq!(view.events().listener_count("press"), 1);
        assert_eq!(contents(&page, &region), "<p>shared</p>");
        assert!(view.el().is_some());
    }

    #[tokio::test]
    async fn test_failed_teardown_keeps_the_current_content() {
        let page = page();
        let region = Region::new(&page, "main");
        let view = View::new(Text("stuck"), page.surface.clone());
        let stuck: PresenterHandle = Arc::new(Stuck { view: view.handle() });
        region.show(stuck.clone()).await.unwrap();

        let next = View::new(Text("next"), page.surface.clone());
        let err = region.show(next.handle()).await.unwrap_err();

        assert_eq!(err, WeaveError::NotRendered);
        assert!(region.presenter().is_some_and(|current| same_component(&current, &stuck)));
        assert!(region.view().is_some_and(|current| same_component(&current, &view)));
        assert_eq!(contents(&page, &region), "<p>stuck</p>");
    }

    #[tokio::test]
    async fn test_missing_container() {
        let page = page();
        let region = Region::new(&page, "aside");
        let view = View::new(Text("lost"), page.surface.clone());

        let err = region.show(view.handle()).await.unwrap_err();
        assert_eq!(
            err,
            WeaveError::SelectorNotFound {
                selector: "aside".into()
            }
        );
        assert!(view.el().is_none());
    }

    #[tokio::test]
    async fn test_empty_triggers_event() {
        let page = page();
        let region = Region::new(&page, "main");
        let emptied = Arc::new(parking_lot::Mutex::new(0));
        let sink = emptied.clone();
        region.on(events::EMPTY, callback(move |_: &Payload, _| *sink.lock() += 1));

        region.show(View::new(Text("x"), page.surface.clone()).handle()).await.unwrap();
        region.empty().unwrap();

        assert_eq!(contents(&page, &region), "");
        assert!(region.view().is_none());
        assert_eq!(*emptied.lock(), 1);
    }
}
