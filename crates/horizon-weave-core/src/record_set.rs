//! Ordered, observable collections of records.
//!
//! A [`RecordSet<A>`] owns a sequence of [`Record<A>`] handles and publishes
//! structural events on its own bus:
//!
//! | event | payload |
//! |---|---|
//! | `"add"` | [`RecordSetEvent::Record`] or [`RecordSetEvent::Records`], mirroring what was added |
//! | `"remove"` | [`RecordSetEvent::Record`] with the removed record |
//! | `"reset"` | [`RecordSetEvent::Reset`] |
//!
//! Lookups go through [`Record::id`]; identities are expected to be unique
//! within a set.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::events;
use crate::observable::{EventBus, Observable};
use crate::record::{Attributes, Record, RecordId};

/// Payload of record set events.
pub enum RecordSetEvent<A> {
    /// A single record was added or removed.
    Record(Record<A>),
    /// Several records were added in one call.
    Records(Vec<Record<A>>),
    /// The whole sequence was replaced.
    Reset,
}

impl<A> RecordSetEvent<A> {
    /// The records carried by this event, in order.
    pub fn records(&self) -> &[Record<A>] {
        match self {
            Self::Record(record) => std::slice::from_ref(record),
            Self::Records(records) => records,
            Self::Reset => &[],
        }
    }
}

impl<A> Clone for RecordSetEvent<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Record(record) => Self::Record(record.clone()),
            Self::Records(records) => Self::Records(records.clone()),
            Self::Reset => Self::Reset,
        }
    }
}

impl<A> fmt::Debug for RecordSetEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(_) => f.write_str("Record"),
            Self::Records(records) => write!(f, "Records({})", records.len()),
            Self::Reset => f.write_str("Reset"),
        }
    }
}

struct RecordSetInner<A> {
    records: RwLock<Vec<Record<A>>>,
    events: EventBus<RecordSetEvent<A>>,
}

/// A shared handle to an ordered sequence of records.
pub struct RecordSet<A> {
    inner: Arc<RecordSetInner<A>>,
}

impl<A> Clone for RecordSet<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> fmt::Debug for RecordSet<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSet")
            .field("len", &self.inner.records.read().len())
            .finish()
    }
}

impl<A: Attributes> Default for RecordSet<A> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<A: Attributes> RecordSet<A> {
    /// Create a set owning `records`.
    pub fn new(records: Vec<Record<A>>) -> Self {
        Self {
            inner: Arc::new(RecordSetInner {
                records: RwLock::new(records),
                events: EventBus::new(),
            }),
        }
    }

    /// A snapshot of the current records, in order.
    pub fn records(&self) -> Vec<Record<A>> {
        self.inner.records.read().clone()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.records.read().len()
    }

    /// Returns true if the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.records.read().is_empty()
    }

    /// The bus structural events are published on.
    pub fn events(&self) -> &EventBus<RecordSetEvent<A>> {
        &self.inner.events
    }

    /// Append `record` and fire `"add"`.
    pub fn add(&self, record: Record<A>) {
        self.inner.records.write().push(record.clone());
        self.inner
            .events
            .trigger(events::ADD, &RecordSetEvent::Record(record));
    }

    /// Append every record and fire a single `"add"` carrying all of them.
    pub fn add_many(&self, records: Vec<Record<A>>) {
        self.inner.records.write().extend(records.iter().cloned());
        self.inner
            .events
            .trigger(events::ADD, &RecordSetEvent::Records(records));
    }

    /// Find the first record whose identity is `id`.
    pub fn get(&self, id: &RecordId) -> Result<Option<Record<A>>> {
        for record in self.inner.records.read().iter() {
            if record.id()? == *id {
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }

    /// Remove the record with identity `id` and fire `"remove"`.
    ///
    /// Returns the removed record. Nothing happens if no record matches.
    pub fn remove(&self, id: &RecordId) -> Result<Option<Record<A>>> {
        let Some(found) = self.get(id)? else {
            return Ok(None);
        };

        {
            let mut records = self.inner.records.write();
            let mut kept = Vec::with_capacity(records.len());
            for record in records.iter() {
                if record.id()? != *id {
                    kept.push(record.clone());
                }
            }
            *records = kept;
        }

        tracing::trace!(target: "horizon_weave_core::record_set", %id, "record removed");
        self.inner
            .events
            .trigger(events::REMOVE, &RecordSetEvent::Record(found.clone()));
        Ok(Some(found))
    }

    /// Replace the contents of the set with `records`.
    ///
    /// With `hard_reset`, the sequence is swapped wholesale and a single
    /// `"reset"` fires. Otherwise the sets are merged: a record whose
    /// identity is already present is merged into the existing record (which
    /// fires its change events and keeps its handle), a new identity is
    /// added, and finally every current record that was neither merged into
    /// nor added is removed.
    pub fn set(&self, records: Vec<Record<A>>, hard_reset: bool) -> Result<()> {
        if hard_reset {
            *self.inner.records.write() = records;
            tracing::debug!(target: "horizon_weave_core::record_set", "record set reset");
            self.inner.events.trigger(events::RESET, &RecordSetEvent::Reset);
            return Ok(());
        }

        let mut retained: Vec<Record<A>> = Vec::with_capacity(records.len());
        for incoming in records {
            match self.get(&incoming.id()?)? {
                Some(existing) => {
                    existing.merge(&incoming)?;
                    retained.push(existing);
                }
                None => {
                    self.add(incoming.clone());
                    retained.push(incoming);
                }
            }
        }

        let stale: Vec<Record<A>> = self
            .records()
            .into_iter()
            .filter(|record| !retained.iter().any(|kept| kept.ptr_eq(record)))
            .collect();
        for record in stale {
            self.remove(&record.id()?)?;
        }
        Ok(())
    }
}

impl<A: Attributes> Observable<RecordSetEvent<A>> for RecordSet<A> {
    fn events(&self) -> &EventBus<RecordSetEvent<A>> {
        &self.inner.events
    }
}

static_assertions::assert_impl_all!(RecordSet<()>: Send, Sync);
static_assertions::assert_impl_all!(RecordSetEvent<()>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::observable::{callback, Subscription};
    use crate::record::AttributeValue;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Employee {
        id: u32,
        name: String,
    }

    impl Attributes for Employee {
        fn attribute_names(&self) -> &'static [&'static str] {
            &["id", "name"]
        }

        fn attribute(&self, name: &str) -> Option<AttributeValue> {
            match name {
                "id" => Some(Box::new(self.id)),
                "name" => Some(Box::new(self.name.clone())),
                _ => None,
            }
        }

        fn assign_attribute(&mut self, name: &str, value: AttributeValue) -> Result<bool> {
            match name {
                "id" => {
                    let value = *value.downcast::<u32>().map_err(|_| CoreError::AttributeTypeMismatch {
                        attribute: name.into(),
                        expected: "u32",
                    })?;
                    let changed = self.id != value;
                    self.id = value;
                    Ok(changed)
                }
                "name" => {
                    let value = *value.downcast::<String>().map_err(|_| CoreError::AttributeTypeMismatch {
                        attribute: name.into(),
                        expected: "String",
                    })?;
                    let changed = self.name != value;
                    self.name = value;
                    Ok(changed)
                }
                _ => Err(CoreError::UnknownAttribute {
                    attribute: name.into(),
                }),
            }
        }

        fn id(&self) -> Result<RecordId> {
            Ok(self.id.into())
        }
    }

    fn employee(id: u32, name: &str) -> Record<Employee> {
        Record::new(Employee {
            id,
            name: name.into(),
        })
    }

    fn names(set: &RecordSet<Employee>) -> Vec<String> {
        set.records().iter().map(|r| r.attrs().name.clone()).collect()
    }

    fn event_log(set: &RecordSet<Employee>) -> Arc<Mutex<Vec<(String, usize)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        set.events().on(
            Subscription::Wildcard,
            callback(move |event: &RecordSetEvent<Employee>, name: &str| {
                sink.lock().push((name.to_owned(), event.records().len()));
            }),
        );
        log
    }

    #[test]
    fn test_new_keeps_passed_records() {
        let set = RecordSet::new(vec![employee(1, "Unu")]);
        assert_eq!(set.len(), 1);
        assert_eq!(names(&set), vec!["Unu"]);
    }

    #[test]
    fn test_add_appends_and_fires_once() {
        let set = RecordSet::new(vec![employee(1, "Unu")]);
        let log = event_log(&set);

        set.add(employee(2, "Du"));
        assert_eq!(names(&set), vec!["Unu", "Du"]);

        set.add_many(vec![employee(3, "Tri"), employee(4, "Kvar")]);
        assert_eq!(set.len(), 4);
        assert_eq!(
            *log.lock(),
            vec![("add".to_string(), 1), ("add".to_string(), 2)]
        );
    }

    #[test]
    fn test_add_many_payload_preserves_order() {
        let set = RecordSet::<Employee>::default();
        let a = employee(1, "a");
        let b = employee(2, "b");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        set.events().on(
            "add",
            callback(move |event: &RecordSetEvent<Employee>, _: &str| {
                sink.lock().extend(event.records().iter().cloned());
            }),
        );

        set.add_many(vec![a.clone(), b.clone()]);
        let seen = seen.lock();
        assert!(seen[0].ptr_eq(&a));
        assert!(seen[1].ptr_eq(&b));
    }

    #[test]
    fn test_get_finds_by_id() {
        let set = RecordSet::new(vec![employee(1, "Unu"), employee(2, "Du")]);
        let found = set.get(&RecordId::Number(1)).unwrap().unwrap();
        assert_eq!(found.attrs().name, "Unu");
        assert!(set.get(&RecordId::Number(9)).unwrap().is_none());
    }

    #[test]
    fn test_remove_present_and_absent() {
        let set = RecordSet::new(vec![employee(1, "Unu"), employee(2, "Du")]);
        let log = event_log(&set);

        let removed = set.remove(&RecordId::Number(1)).unwrap().unwrap();
        assert_eq!(removed.attrs().name, "Unu");
        assert_eq!(names(&set), vec!["Du"]);

        assert!(set.remove(&RecordId::Number(1)).unwrap().is_none());
        assert_eq!(set.len(), 1);
        assert_eq!(*log.lock(), vec![("remove".to_string(), 1)]);
    }

    #[test]
    fn test_hard_reset_replaces_and_fires_reset_only() {
        let set = RecordSet::new(vec![employee(1, "Unu")]);
        let log = event_log(&set);

        set.set(vec![employee(5, "Kvin"), employee(6, "Ses")], true)
            .unwrap();

        assert_eq!(names(&set), vec!["Kvin", "Ses"]);
        assert_eq!(*log.lock(), vec![("reset".to_string(), 0)]);
    }

    #[test]
    fn test_merge_updates_adds_and_removes() {
        let unu = employee(1, "Unu");
        let set = RecordSet::new(vec![unu.clone(), employee(2, "Du")]);
        let log = event_log(&set);
        let changes = Arc::new(Mutex::new(0));
        let sink = changes.clone();
        unu.events().on(
            "change",
            callback(move |_: &Record<Employee>, _: &str| *sink.lock() += 1),
        );

        set.set(vec![employee(1, "One"), employee(3, "Three")], false)
            .unwrap();

        assert_eq!(names(&set), vec!["One", "Three"]);
        assert!(set.get(&RecordId::Number(1)).unwrap().unwrap().ptr_eq(&unu));
        assert_eq!(*changes.lock(), 1);
        assert_eq!(
            *log.lock(),
            vec![("add".to_string(), 1), ("remove".to_string(), 1)]
        );
    }

    #[test]
    fn test_merge_with_unchanged_set_is_silent() {
        let set = RecordSet::new(vec![employee(1, "Unu")]);
        let log = event_log(&set);

        set.set(vec![employee(1, "Unu")], false).unwrap();

        assert_eq!(set.len(), 1);
        assert!(log.lock().is_empty());
    }
}
