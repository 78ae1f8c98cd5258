//! Records: identity-bearing attribute containers with change notification.
//!
//! A [`Record<A>`] wraps a caller-supplied attribute object `A` and publishes
//! change events on its own [`EventBus`]. The attribute object is exposed
//! directly through [`Record::attrs`] and [`Record::attrs_mut`]; no copy is
//! kept.
//!
//! # Attribute Shape
//!
//! The [`Attributes`] trait describes the fixed set of named attributes of a
//! record type. It is usually derived:
//!
//! ```ignore
//! use horizon_weave_core::{Attributes, Record};
//!
//! #[derive(Attributes, Clone)]
//! struct Article {
//!     #[attributes(id)]
//!     id: u32,
//!     title: String,
//! }
//!
//! let article = Record::new(Article { id: 1, title: "One".into() });
//! article.set_attribute("title", String::from("Uno"), false)?;
//! ```
//!
//! # Change Events
//!
//! Assigning a different value to attribute `x` fires `"change x"` with the
//! record as payload. A bulk [`Record::set`] fires one `"change"` after all
//! attributes are processed, and only if at least one of them changed.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{CoreError, Result};
use crate::events;
use crate::observable::{EventBus, Observable};

/// A type-erased attribute value.
pub type AttributeValue = Box<dyn Any + Send + Sync>;

/// The identity of a record, used for every lookup inside a record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    /// A numeric identity.
    Number(i64),
    /// A textual identity.
    Text(String),
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u32> for RecordId {
    fn from(value: u32) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// The attribute shape of a record type.
///
/// Implemented by `#[derive(Attributes)]` for structs with named fields.
/// Manual implementations must keep [`attribute_names`](Self::attribute_names)
/// stable for the lifetime of the program.
pub trait Attributes: Send + Sync + 'static {
    /// Names of every attribute, in declaration order.
    fn attribute_names(&self) -> &'static [&'static str];

    /// Current value of `name`, or `None` if there is no such attribute.
    fn attribute(&self, name: &str) -> Option<AttributeValue>;

    /// Assign `value` to `name` if it differs from the current value.
    ///
    /// Returns `Ok(true)` if the attribute changed.
    fn assign_attribute(&mut self, name: &str, value: AttributeValue) -> Result<bool>;

    /// The identity of this record.
    ///
    /// Every record type stored in a [`RecordSet`](crate::RecordSet) must
    /// provide one; the default reports a contract violation.
    fn id(&self) -> Result<RecordId> {
        Err(CoreError::contract::<Self>("Attributes::id"))
    }
}

struct RecordInner<A> {
    attrs: RwLock<A>,
    events: EventBus<Record<A>>,
}

/// A shared handle to an attribute object with change notification.
///
/// Cloning a `Record` yields another handle to the same record;
/// [`Record::ptr_eq`] compares handles by identity.
pub struct Record<A> {
    inner: Arc<RecordInner<A>>,
}

impl<A> Clone for Record<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Attributes + fmt::Debug> fmt::Debug for Record<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("attrs", &*self.inner.attrs.read())
            .finish()
    }
}

impl<A: Attributes> Record<A> {
    /// Wrap `attrs` in a new record.
    pub fn new(attrs: A) -> Self {
        Self {
            inner: Arc::new(RecordInner {
                attrs: RwLock::new(attrs),
                events: EventBus::new(),
            }),
        }
    }

    /// Read access to the attribute object.
    ///
    /// The guard must be dropped before mutating the record.
    pub fn attrs(&self) -> RwLockReadGuard<'_, A> {
        self.inner.attrs.read()
    }

    /// Write access to the attribute object.
    ///
    /// Writes through this guard bypass change notification.
    pub fn attrs_mut(&self) -> RwLockWriteGuard<'_, A> {
        self.inner.attrs.write()
    }

    /// Borrow a projection of the attribute object.
    pub fn map<U: ?Sized>(&self, f: impl FnOnce(&A) -> &U) -> MappedRwLockReadGuard<'_, U> {
        RwLockReadGuard::map(self.inner.attrs.read(), f)
    }

    /// The record's identity.
    pub fn id(&self) -> Result<RecordId> {
        self.inner.attrs.read().id()
    }

    /// Current value of attribute `name`, if it exists and has type `V`.
    pub fn get<V: Clone + 'static>(&self, name: &str) -> Option<V> {
        let value = self.inner.attrs.read().attribute(name)?;
        value.downcast::<V>().ok().map(|boxed| *boxed)
    }

    /// Assign every attribute of `attrs`.
    ///
    /// Fires `"change <attr>"` per changed attribute, then one `"change"` if
    /// anything changed. Returns whether anything changed.
    pub fn set(&self, attrs: A) -> Result<bool> {
        let values = collect_values(&attrs);
        self.apply(values)
    }

    /// Assign every attribute of `other` to this record.
    ///
    /// Merging a record into itself is a no-op.
    pub fn merge(&self, other: &Record<A>) -> Result<bool> {
        if self.ptr_eq(other) {
            return Ok(false);
        }
        let values = collect_values(&*other.attrs());
        self.apply(values)
    }

    /// Assign a single attribute.
    ///
    /// Fires `"change <name>"` if the value changed, followed by `"change"`
    /// unless `suppress_whole_event` is set.
    pub fn set_attribute<V>(&self, name: &str, value: V, suppress_whole_event: bool) -> Result<bool>
    where
        V: Any + Send + Sync,
    {
        let changed = self.assign(name, Box::new(value))?;
        if changed && !suppress_whole_event {
            self.inner.events.trigger(events::CHANGE, self);
        }
        Ok(changed)
    }

    /// Returns true if both handles refer to the same record.
    pub fn ptr_eq(&self, other: &Record<A>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn apply(&self, values: Vec<(&'static str, AttributeValue)>) -> Result<bool> {
        let mut changed = false;
        for (name, value) in values {
            changed |= self.assign(name, value)?;
        }
        if changed {
            self.inner.events.trigger(events::CHANGE, self);
        }
        Ok(changed)
    }

    fn assign(&self, name: &str, value: AttributeValue) -> Result<bool> {
        let changed = self.inner.attrs.write().assign_attribute(name, value)?;
        if changed {
            tracing::trace!(target: "horizon_weave_core::record", attribute = name, "attribute changed");
            self.inner
                .events
                .trigger(&events::attribute_changed(name), self);
        }
        Ok(changed)
    }
}

fn collect_values<A: Attributes>(attrs: &A) -> Vec<(&'static str, AttributeValue)> {
    attrs
        .attribute_names()
        .iter()
        .filter_map(|name| attrs.attribute(name).map(|value| (*name, value)))
        .collect()
}

impl<A: Attributes> Observable<Record<A>> for Record<A> {
    fn events(&self) -> &EventBus<Record<A>> {
        &self.inner.events
    }
}

impl<A: Attributes> Record<A> {
    /// The bus this record publishes change events on.
    pub fn events(&self) -> &EventBus<Record<A>> {
        &self.inner.events
    }
}

impl<A: Attributes + Default> Default for Record<A> {
    fn default() -> Self {
        Self::new(A::default())
    }
}

static_assertions::assert_impl_all!(Record<()>: Send, Sync);
