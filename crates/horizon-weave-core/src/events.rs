//! Well-known event names.
//!
//! Records and record sets announce their changes on their [`EventBus`](crate::EventBus)
//! using these names. Per-attribute change events are built with
//! [`attribute_changed`].

/// Whole-record change. Fired once per `set`, however many attributes changed.
pub const CHANGE: &str = "change";

/// One or more records were appended to a record set.
pub const ADD: &str = "add";

/// A record was removed from a record set.
pub const REMOVE: &str = "remove";

/// A record set was replaced wholesale.
pub const RESET: &str = "reset";

/// A region started displaying a component.
pub const SHOW: &str = "show";

/// A region tore down what it was displaying.
pub const EMPTY: &str = "empty";

/// Name of the event fired when a single attribute changes.
///
/// ```
/// use horizon_weave_core::events;
///
/// assert_eq!(events::attribute_changed("title"), "change title");
/// ```
pub fn attribute_changed(attribute: &str) -> String {
    format!("{CHANGE} {attribute}")
}
