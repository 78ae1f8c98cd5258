//! Presenters couple one record with one view.

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;
use horizon_weave_core::{Attachment, Attributes, EventHandler, Record};
use parking_lot::Mutex;

use crate::component::{Payload, ViewHandle};
use crate::error::Result;
use crate::lifecycle::{noop, Lifecycle};

/// A type-erased, shareable presenter.
pub type PresenterHandle = Arc<dyn Presents>;

/// The object-safe face of [`Presenter`].
pub trait Presents: Send + Sync {
    /// Subscribe the declared bridges.
    fn init(&self) -> BoxFuture<'_, ()>;

    /// Unsubscribe the bridges and remove the view.
    fn remove(&self) -> Result<()>;

    /// Unsubscribe the bridges, leaving the view in place.
    fn release(&self);

    /// The presented view.
    fn view(&self) -> ViewHandle;
}

/// What a concrete presenter supplies.
pub trait PresenterTemplate: Send + Sync + Sized + 'static {
    /// Attribute type of the presented record.
    type Attrs: Attributes;

    /// Record events handled by the presenter.
    fn record_events(&self) -> Vec<EventHandler<Presenter<Self>, Record<Self::Attrs>>> {
        Vec::new()
    }

    /// View events handled by the presenter.
    fn view_events(&self) -> Vec<EventHandler<Presenter<Self>, Payload>> {
        Vec::new()
    }

    /// Runs once, before the bridges are first subscribed.
    fn before_init<'a>(&'a self, _presenter: &'a Presenter<Self>) -> BoxFuture<'a, ()> {
        noop()
    }

    /// Runs once, after the bridges are first subscribed.
    fn after_init<'a>(&'a self, _presenter: &'a Presenter<Self>) -> BoxFuture<'a, ()> {
        noop()
    }

    /// Runs before the bridges are unsubscribed.
    fn before_remove(&self, _presenter: &Presenter<Self>) {}

    /// Runs after the view is removed.
    fn after_remove(&self, _presenter: &Presenter<Self>) {}
}

/// Mediates between a record and the view presenting it.
///
/// Declared record and view events are bridged to the presenter on `init`,
/// with the presenter as the handlers' receiver.
pub struct Presenter<T: PresenterTemplate> {
    template: T,
    record: Record<T::Attrs>,
    view: ViewHandle,
    lifecycle: Lifecycle,
    attachments: Mutex<Vec<Attachment>>,
    this: Weak<Self>,
}

impl<T: PresenterTemplate> fmt::Debug for Presenter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presenter")
            .field("template", &std::any::type_name::<T>())
            .field("bridges", &self.attachments.lock().len())
            .finish_non_exhaustive()
    }
}

impl<T: PresenterTemplate> Presenter<T> {
    /// Create a presenter of `record` through `view`.
    pub fn new(template: T, record: Record<T::Attrs>, view: ViewHandle) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            template,
            record,
            view,
            lifecycle: Lifecycle::new(),
            attachments: Mutex::new(Vec::new()),
            this: this.clone(),
        })
    }

    /// The presenter's template.
    pub fn template(&self) -> &T {
        &self.template
    }

    /// The presented record.
    pub fn record(&self) -> &Record<T::Attrs> {
        &self.record
    }

    /// The presented view.
    pub fn view(&self) -> &ViewHandle {
        &self.view
    }

    /// Once-only hook bookkeeping.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// This presenter as a type-erased handle.
    pub fn handle(self: &Arc<Self>) -> PresenterHandle {
        self.clone()
    }

    /// Subscribe the declared record and view bridges.
    ///
    /// Does not render the view. Calling it again replaces the bridges.
    pub async fn init(&self) {
        self.lifecycle.before_init(|| self.template.before_init(self)).await;

        let mut attachments: Vec<Attachment> = self
            .template
            .record_events()
            .iter()
            .map(|handler| handler.attach(self.record.events(), &self.this))
            .collect();
        attachments.extend(
            self.template
                .view_events()
                .iter()
                .map(|handler| handler.attach(self.view.events(), &self.this)),
        );
        let previous = std::mem::replace(&mut *self.attachments.lock(), attachments);
        for attachment in previous {
            attachment.detach();
        }

        self.lifecycle.after_init(|| self.template.after_init(self)).await;
        tracing::debug!(target: "horizon_weave::presenter", presenter = std::any::type_name::<T>(), "presenter initialized");
    }

    /// Unsubscribe the bridges, then remove the view.
    pub fn remove(&self) -> Result<()> {
        self.template.before_remove(self);
        self.detach_bridges();
        self.view.remove()?;
        self.template.after_remove(self);
        Ok(())
    }

    /// Run the remove hooks and unsubscribe the bridges, but keep the view.
    ///
    /// Used when another presenter takes over the same view.
    pub fn release(&self) {
        self.template.before_remove(self);
        self.detach_bridges();
        self.template.after_remove(self);
        tracing::debug!(target: "horizon_weave::presenter", presenter = std::any::type_name::<T>(), "presenter released its view");
    }

    fn detach_bridges(&self) {
        let attachments = std::mem::take(&mut *self.attachments.lock());
        for attachment in attachments {
            attachment.detach();
        }
    }
}

impl<T: PresenterTemplate> Presents for Presenter<T> {
    fn init(&self) -> BoxFuture<'_, ()> {
        Box::pin(Presenter::init(self))
    }

    fn remove(&self) -> Result<()> {
        Presenter::remove(self)
    }

    fn release(&self) {
        Presenter::release(self)
    }

    fn view(&self) -> ViewHandle {
        self.view.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{View, ViewTemplate};
    use horizon_weave_core::{events, Observable};
    use horizon_weave_dom::Document;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, horizon_weave_macros::Attributes)]
    struct Counter {
        #[attributes(id)]
        id: i64,
        value: i64,
    }

    struct CounterView;

    impl ViewTemplate for CounterView {
        fn html(&self) -> String {
            "<button>+</button>".into()
        }
    }

    #[derive(Default)]
    struct CounterPresenter {
        changes: AtomicUsize,
    }

    impl CounterPresenter {
        fn increment(presenter: &Presenter<Self>, _payload: &Payload, _name: &str) {
            let next = presenter.record().attrs().value + 1;
            presenter.record().set_attribute("value", next, false).unwrap();
        }

        fn changed(presenter: &Presenter<Self>, _record: &Record<Counter>, _name: &str) {
            presenter.template().changes.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl PresenterTemplate for CounterPresenter {
        type Attrs = Counter;

        fn record_events(&self) -> Vec<EventHandler<Presenter<Self>, Record<Counter>>> {
            vec![EventHandler::new(events::CHANGE, CounterPresenter::changed)]
        }

        fn view_events(&self) -> Vec<EventHandler<Presenter<Self>, Payload>> {
            vec![EventHandler::new("increment", CounterPresenter::increment)]
        }
    }

    fn fixture() -> (Arc<Presenter<CounterPresenter>>, Arc<View<CounterView>>, Record<Counter>) {
        let record = Record::new(Counter { id: 1, value: 0 });
        let view = View::new(CounterView, Arc::new(Document::new()));
        let presenter = Presenter::new(CounterPresenter::default(), record.clone(), view.handle());
        (presenter, view, record)
    }

    #[tokio::test]
    async fn test_bridges() {
        let (presenter, view, record) = fixture();
        presenter.init().await;

        view.trigger("increment", &Payload::Null);
        view.trigger("increment", &Payload::Null);

        assert_eq!(record.attrs().value, 2);
        assert_eq!(presenter.template().changes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reinit_does_not_duplicate_bridges() {
        let (presenter, view, record) = fixture();
        presenter.init().await;
        presenter.init().await;

        view.trigger("increment", &Payload::Null);
        assert_eq!(record.attrs().value, 1);
        assert_eq!(view.events().listener_count("increment"), 1);
    }

    #[tokio::test]
    async fn test_release_keeps_the_view() {
        let (presenter, view, record) = fixture();
        presenter.init().await;
        view.init().await.unwrap();

        presenter.release();
        assert!(view.el().is_some());
        assert_eq!(view.events().listener_count("increment"), 0);
        assert_eq!(record.events().listener_count(events::CHANGE), 0);

        view.trigger("increment", &Payload::Null);
        assert_eq!(record.attrs().value, 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let (presenter, view, record) = fixture();
        presenter.init().await;
        view.init().await.unwrap();

        presenter.remove().unwrap();
        assert!(view.el().is_none());
        assert_eq!(view.events().listener_count("increment"), 0);
        assert_eq!(record.events().listener_count(events::CHANGE), 0);
    }
}
