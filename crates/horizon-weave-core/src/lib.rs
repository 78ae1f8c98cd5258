//! Core systems for Horizon Weave.
//!
//! This crate provides the surface-independent foundation of the Horizon
//! Weave component framework:
//!
//! - **Event Bus**: Named and wildcard publish/subscribe, with declarative
//!   event bridges between components
//! - **Records**: Identity-bearing attribute containers with per-attribute
//!   and whole-record change events
//! - **Record Sets**: Ordered record collections with add/remove/reset
//!   notification and merge-or-replace reconciliation
//!
//! # Event Bus Example
//!
//! ```
//! use horizon_weave_core::{callback, EventBus};
//!
//! let bus = EventBus::<String>::new();
//! let greet = callback(|who: &String, _name: &str| println!("hello {who}"));
//!
//! bus.on("greet", greet.clone());
//! bus.trigger("greet", &"world".to_string());
//! bus.off("greet", &greet);
//! ```
//!
//! # Record Example
//!
//! ```ignore
//! use horizon_weave_core::{Attributes, Record, RecordSet};
//!
//! #[derive(Attributes, Clone)]
//! struct Employee {
//!     #[attributes(id)]
//!     id: u32,
//!     name: String,
//! }
//!
//! let employees = RecordSet::new(vec![Record::new(Employee { id: 1, name: "Unu".into() })]);
//! employees.add(Record::new(Employee { id: 2, name: "Du".into() }));
//! employees.remove(&RecordId::Number(1))?;
//! ```

pub mod error;
pub mod events;
pub mod logging;
mod observable;
mod record;
mod record_set;

pub use error::{CoreError, Result};
pub use observable::{
    callback, Attachment, Callback, EventBus, EventHandler, ListenerId, Observable, Subscription,
    WeakEventBus,
};
pub use record::{AttributeValue, Attributes, Record, RecordId};
pub use record_set::{RecordSet, RecordSetEvent};
