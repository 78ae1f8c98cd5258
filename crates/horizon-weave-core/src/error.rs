//! Error types for Horizon Weave core.

/// Errors raised by records, record sets and the attribute contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A capability every concrete type must supply was not implemented.
    ///
    /// Raised, for example, when a record is asked for its identity but its
    /// attribute type never declared an identity field.
    #[error("{type_name} does not implement required capability `{capability}`")]
    ContractViolation {
        /// The missing capability.
        capability: &'static str,
        /// The concrete type that failed to supply it.
        type_name: &'static str,
    },

    /// An attribute name that is not part of the record's attribute shape.
    #[error("unknown attribute '{attribute}'")]
    UnknownAttribute {
        /// The offending attribute name.
        attribute: String,
    },

    /// An attribute was assigned a value of the wrong type.
    #[error("attribute '{attribute}' expects a value of type {expected}")]
    AttributeTypeMismatch {
        /// The attribute being assigned.
        attribute: String,
        /// Name of the type the attribute holds.
        expected: &'static str,
    },
}

impl CoreError {
    /// Create a contract violation for capability `capability` on type `T`.
    pub fn contract<T: ?Sized>(capability: &'static str) -> Self {
        Self::ContractViolation {
            capability,
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// A specialized Result type for Horizon Weave core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
