//! Error types for Horizon Weave components.

use horizon_weave_core::{CoreError, RecordId};
use horizon_weave_dom::DomError;

/// Errors raised while rendering, mounting or composing components.
///
/// None of these are retried. A component that failed part-way through
/// `init` or `add_child_views` is left partially constructed and should be
/// discarded by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeaveError {
    /// A concrete component did not supply a required capability, e.g. its
    /// markup produced no element.
    #[error("{type_name} does not implement required capability `{capability}`")]
    ContractViolation {
        /// The missing capability.
        capability: &'static str,
        /// The concrete type that failed to supply it.
        type_name: &'static str,
    },

    /// A selector matched nothing under the component root.
    #[error("selector \"{selector}\" not found")]
    SelectorNotFound {
        /// The selector that was looked up.
        selector: String,
    },

    /// A positioned insert named a record that has no child view.
    #[error("no child view renders record {id}")]
    TargetNotFound {
        /// Identity of the target record.
        id: RecordId,
    },

    /// A positioned insert named a child view that has no root element yet.
    #[error("child view of record {id} is not mounted")]
    TargetNotMounted {
        /// Identity of the target record.
        id: RecordId,
    },

    /// The component's own root element was never created.
    #[error("component has no root element")]
    NotRendered,

    /// Fewer new elements were found than child views to bind.
    #[error("expected {expected} new elements, found {found}")]
    ElementNotFound {
        /// Number of child views waiting for an element.
        expected: usize,
        /// Number of elements actually found.
        found: usize,
    },

    /// A record or attribute failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A rendering surface failure.
    #[error(transparent)]
    Dom(#[from] DomError),
}

impl WeaveError {
    /// Create a contract violation for capability `capability` on type `T`.
    pub fn contract<T: ?Sized>(capability: &'static str) -> Self {
        Self::ContractViolation {
            capability,
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// A specialized Result type for component operations.
pub type Result<T> = std::result::Result<T, WeaveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_weave_dom::NodeId;

    #[test]
    fn test_conversions() {
        let err: WeaveError = DomError::UnknownNode(NodeId::default()).into();
        assert!(matches!(err, WeaveError::Dom(DomError::UnknownNode(_))));

        let err: WeaveError = CoreError::UnknownAttribute {
            attribute: "title".into(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown attribute 'title'");
    }

    #[test]
    fn test_messages() {
        let err = WeaveError::TargetNotFound { id: RecordId::Number(7) };
        assert_eq!(err.to_string(), "no child view renders record 7");

        let err = WeaveError::contract::<String>("html");
        assert!(err.to_string().contains("`html`"));
    }
}
