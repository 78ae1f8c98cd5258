//! Event bus for Horizon Weave.
//!
//! This module provides the publish/subscribe mechanism every record, record
//! set, view, presenter and region is built on. Listeners subscribe to an
//! event by name, or to every event through [`Subscription::Wildcard`], and
//! are invoked synchronously when the event is triggered.
//!
//! # Key Types
//!
//! - [`EventBus<P>`] - A cheaply cloneable handle to a listener registry
//! - [`Subscription`] - Which events a listener receives
//! - [`Callback<P>`] - A shared listener closure; its `Arc` is its identity
//! - [`ListenerId`] - Unique identifier returned when registering a listener
//! - [`EventHandler<R, P>`] - A declarative `{event, handler}` pair bound to a receiver
//! - [`Attachment`] - A registered listener that can be detached later
//!
//! # Dispatch Order
//!
//! Listeners for the triggered name run first, in registration order, then
//! every wildcard listener, also in registration order. The listener list is
//! snapshotted before the first callback runs: a listener registered during
//! dispatch is not visited until the next trigger, and a listener removed
//! during dispatch still receives the event in flight.
//!
//! # Example
//!
//! ```
//! use horizon_weave_core::{callback, EventBus, Subscription};
//!
//! let bus = EventBus::<u32>::new();
//! let on_tick = callback(|value: &u32, name: &str| {
//!     println!("{name}: {value}");
//! });
//!
//! bus.on("tick", on_tick.clone());
//! bus.on(Subscription::Wildcard, on_tick.clone());
//!
//! // Runs the named listener, then the wildcard listener.
//! bus.trigger("tick", &1);
//!
//! // Removes every registration of `on_tick` for "tick".
//! assert_eq!(bus.off("tick", &on_tick), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// A unique identifier for a registered listener.
    ///
    /// Use this ID to remove a specific registration via [`EventBus::off_id`].
    pub struct ListenerId;
}

/// Which events a listener receives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Events with exactly this name.
    Named(String),
    /// Every event, whatever its name.
    Wildcard,
}

impl Subscription {
    /// Subscribe to events named `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Returns true if an event called `name` reaches this subscription.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Named(own) => own == name,
            Self::Wildcard => true,
        }
    }
}

impl From<&str> for Subscription {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for Subscription {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Wildcard => write!(f, "*"),
        }
    }
}

/// A listener callback, invoked with the event payload and the event name.
///
/// The `Arc` allocation is the callback's identity: registering the same
/// `Callback` twice yields two invocations per trigger, and
/// [`EventBus::off`] removes every registration sharing the allocation.
pub type Callback<P> = Arc<dyn Fn(&P, &str) + Send + Sync>;

/// Wrap a closure into a [`Callback`].
pub fn callback<P, F>(f: F) -> Callback<P>
where
    F: Fn(&P, &str) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Internal storage for a single registration.
struct Listener<P> {
    subscription: Subscription,
    callback: Callback<P>,
}

/// All registrations of one bus, with dispatch order kept per subscription.
struct Registry<P> {
    listeners: SlotMap<ListenerId, Listener<P>>,
    named: HashMap<String, Vec<ListenerId>>,
    wildcard: Vec<ListenerId>,
}

impl<P> Registry<P> {
    fn new() -> Self {
        Self {
            listeners: SlotMap::with_key(),
            named: HashMap::new(),
            wildcard: Vec::new(),
        }
    }

    fn order_mut(&mut self, subscription: &Subscription) -> Option<&mut Vec<ListenerId>> {
        match subscription {
            Subscription::Named(name) => self.named.get_mut(name),
            Subscription::Wildcard => Some(&mut self.wildcard),
        }
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let Some(listener) = self.listeners.remove(id) else {
            return false;
        };
        if let Some(order) = self.order_mut(&listener.subscription) {
            order.retain(|other| *other != id);
        }
        if let Subscription::Named(name) = &listener.subscription
            && self.named.get(name).is_some_and(Vec::is_empty)
        {
            self.named.remove(name);
        }
        true
    }

    fn snapshot(&self, name: &str) -> Vec<Callback<P>> {
        self.named
            .get(name)
            .into_iter()
            .flatten()
            .chain(self.wildcard.iter())
            .filter_map(|id| self.listeners.get(*id))
            .map(|listener| listener.callback.clone())
            .collect()
    }
}

/// A handle to a listener registry.
///
/// Cloning an `EventBus` yields another handle to the same registry. Records,
/// record sets and views each own one and expose it through
/// [`Observable::events`].
///
/// # Thread Safety
///
/// `EventBus<P>` is `Send + Sync`. Registrations are guarded by a mutex that
/// is never held while a callback runs, so callbacks may freely register,
/// remove or trigger on the same bus.
pub struct EventBus<P> {
    registry: Arc<Mutex<Registry<P>>>,
}

impl<P> Clone for EventBus<P> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("EventBus")
            .field("listeners", &registry.listeners.len())
            .field("wildcard", &registry.wildcard.len())
            .finish()
    }
}

impl<P: 'static> EventBus<P> {
    /// Create a bus with no listeners.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Register `callback` for `subscription`.
    ///
    /// No deduplication is performed; the same callback registered twice is
    /// invoked twice.
    pub fn on(&self, subscription: impl Into<Subscription>, callback: Callback<P>) -> ListenerId {
        let subscription = subscription.into();
        let mut registry = self.registry.lock();
        let id = registry.listeners.insert(Listener {
            subscription: subscription.clone(),
            callback,
        });
        match subscription {
            Subscription::Named(name) => registry.named.entry(name).or_default().push(id),
            Subscription::Wildcard => registry.wildcard.push(id),
        }
        id
    }

    /// Register a handler invoked as a method of `context`.
    ///
    /// The bus holds the context weakly; once it is dropped the handler is
    /// skipped.
    pub fn on_with_context<C>(
        &self,
        subscription: impl Into<Subscription>,
        context: &Arc<C>,
        handler: fn(&C, &P, &str),
    ) -> ListenerId
    where
        C: Send + Sync + 'static,
    {
        self.on_with_weak_context(subscription, Arc::downgrade(context), handler)
    }

    /// Like [`on_with_context`](Self::on_with_context), for a context that is
    /// only available as a `Weak` (e.g. while it is still being constructed).
    pub fn on_with_weak_context<C>(
        &self,
        subscription: impl Into<Subscription>,
        context: Weak<C>,
        handler: fn(&C, &P, &str),
    ) -> ListenerId
    where
        C: Send + Sync + 'static,
    {
        self.on(
            subscription,
            Arc::new(move |payload: &P, name: &str| {
                if let Some(context) = context.upgrade() {
                    handler(&context, payload, name);
                }
            }),
        )
    }

    /// Remove every registration of `callback` for `subscription`.
    ///
    /// Matching is by callback identity. Returns the number of registrations
    /// removed.
    pub fn off(&self, subscription: impl Into<Subscription>, callback: &Callback<P>) -> usize {
        let subscription = subscription.into();
        let mut registry = self.registry.lock();
        let Some(order) = registry.order_mut(&subscription) else {
            return 0;
        };
        let ids: Vec<ListenerId> = order.clone();
        let mut removed = 0;
        for id in ids {
            let same = registry
                .listeners
                .get(id)
                .is_some_and(|listener| Arc::ptr_eq(&listener.callback, callback));
            if same && registry.remove(id) {
                removed += 1;
            }
        }
        removed
    }

    /// Remove a single registration by its ID.
    ///
    /// Returns `true` if the registration was found and removed.
    pub fn off_id(&self, id: ListenerId) -> bool {
        self.registry.lock().remove(id)
    }

    /// Remove every registration.
    pub fn clear(&self) {
        *self.registry.lock() = Registry::new();
    }

    /// Number of registrations for `subscription`.
    pub fn listener_count(&self, subscription: impl Into<Subscription>) -> usize {
        let registry = self.registry.lock();
        match subscription.into() {
            Subscription::Named(name) => registry.named.get(&name).map_or(0, Vec::len),
            Subscription::Wildcard => registry.wildcard.len(),
        }
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.lock().listeners.is_empty()
    }

    /// Trigger `name`, invoking the matching listeners with `payload`.
    ///
    /// Triggering an event nobody listens to is not an error.
    #[tracing::instrument(skip_all, target = "horizon_weave_core::bus", level = "trace", fields(event = name))]
    pub fn trigger(&self, name: &str, payload: &P) {
        let snapshot = self.registry.lock().snapshot(name);
        tracing::trace!(target: "horizon_weave_core::bus", listener_count = snapshot.len(), "triggering event");

        for callback in snapshot {
            callback(payload, name);
        }
    }

    /// Re-trigger every event of this bus on `target`, under the same name.
    ///
    /// `target` is held weakly.
    pub fn relay(&self, target: &EventBus<P>) -> ListenerId {
        let target = target.downgrade();
        self.on(
            Subscription::Wildcard,
            Arc::new(move |payload: &P, name: &str| {
                if let Some(target) = target.upgrade() {
                    target.trigger(name, payload);
                }
            }),
        )
    }

    /// Create a weak handle that does not keep the registry alive.
    pub fn downgrade(&self) -> WeakEventBus<P> {
        WeakEventBus {
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Returns true if both handles refer to the same registry.
    pub fn same_bus(&self, other: &EventBus<P>) -> bool {
        Arc::ptr_eq(&self.registry, &other.registry)
    }
}

/// A weak handle to an [`EventBus`].
pub struct WeakEventBus<P> {
    registry: Weak<Mutex<Registry<P>>>,
}

impl<P> Clone for WeakEventBus<P> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<P> WeakEventBus<P> {
    /// Upgrade to a strong handle if the bus is still alive.
    pub fn upgrade(&self) -> Option<EventBus<P>> {
        self.registry.upgrade().map(|registry| EventBus { registry })
    }
}

/// Type-erased removal of one registration.
trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId) -> bool;
}

impl<P: 'static> Detach for WeakEventBus<P> {
    fn detach(&self, id: ListenerId) -> bool {
        self.upgrade().is_some_and(|bus| bus.off_id(id))
    }
}

/// A registration made on some bus, detachable without knowing its payload type.
///
/// Views, collection views and presenters keep their bridges as attachments so
/// they can tear them down symmetrically on removal.
pub struct Attachment {
    id: ListenerId,
    bus: Box<dyn Detach>,
}

impl Attachment {
    /// Record that `id` was registered on `bus`.
    pub fn new<P: 'static>(bus: &EventBus<P>, id: ListenerId) -> Self {
        Self {
            id,
            bus: Box::new(bus.downgrade()),
        }
    }

    /// The registration's ID.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the registration. Returns `false` if it was already gone.
    pub fn detach(self) -> bool {
        self.bus.detach(self.id)
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment").field("id", &self.id).finish()
    }
}

/// A declarative `{event, handler}` pair.
///
/// Components declare lists of these to bridge events from records, record
/// sets or other components to their own methods. When attached, the handler
/// is invoked with the receiver as its first argument.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use horizon_weave_core::{EventBus, EventHandler};
///
/// struct Counter(AtomicUsize);
///
/// impl Counter {
///     fn bump(&self, _payload: &(), _name: &str) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let bus = EventBus::<()>::new();
/// let counter = Arc::new(Counter(AtomicUsize::new(0)));
/// let handler = EventHandler::new("tick", Counter::bump);
///
/// let attachment = handler.attach(&bus, &Arc::downgrade(&counter));
/// bus.trigger("tick", &());
/// assert!(attachment.detach());
/// bus.trigger("tick", &());
///
/// assert_eq!(counter.0.load(Ordering::SeqCst), 1);
/// ```
pub struct EventHandler<R, P> {
    subscription: Subscription,
    handler: fn(&R, &P, &str),
}

impl<R, P> Clone for EventHandler<R, P> {
    fn clone(&self) -> Self {
        Self {
            subscription: self.subscription.clone(),
            handler: self.handler,
        }
    }
}

impl<R, P> fmt::Debug for EventHandler<R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl<R, P> EventHandler<R, P>
where
    R: Send + Sync + 'static,
    P: 'static,
{
    /// Pair `subscription` with `handler`.
    pub fn new(subscription: impl Into<Subscription>, handler: fn(&R, &P, &str)) -> Self {
        Self {
            subscription: subscription.into(),
            handler,
        }
    }

    /// The events this handler listens to.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Register the handler on `bus`, with `receiver` as its context.
    pub fn attach(&self, bus: &EventBus<P>, receiver: &Weak<R>) -> Attachment {
        let id = bus.on_with_weak_context(self.subscription.clone(), receiver.clone(), self.handler);
        Attachment::new(bus, id)
    }
}

/// Capability of owning an [`EventBus`].
///
/// Implementors get `on`/`off`/`trigger` for free.
pub trait Observable<P: 'static> {
    /// The bus events of this entity are published on.
    fn events(&self) -> &EventBus<P>;

    /// Register `callback` for `subscription`.
    fn on(&self, subscription: impl Into<Subscription>, callback: Callback<P>) -> ListenerId {
        self.events().on(subscription, callback)
    }

    /// Remove every registration of `callback` for `subscription`.
    fn off(&self, subscription: impl Into<Subscription>, callback: &Callback<P>) -> usize {
        self.events().off(subscription, callback)
    }

    /// Trigger `name` with `payload`.
    fn trigger(&self, name: &str, payload: &P) {
        self.events().trigger(name, payload);
    }
}

static_assertions::assert_impl_all!(EventBus<()>: Send, Sync);
static_assertions::assert_impl_all!(Attachment: Send, Sync);
