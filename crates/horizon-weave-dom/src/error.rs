//! Error types for the rendering surface.

use crate::NodeId;

/// Result type alias for rendering surface operations.
pub type Result<T> = std::result::Result<T, DomError>;

/// Errors that can occur while parsing markup or manipulating the tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The markup fragment is not well formed.
    #[error("malformed markup at byte {position}: {message}")]
    Markup {
        /// What went wrong.
        message: String,
        /// Byte offset in the fragment where the problem was found.
        position: u64,
    },

    /// A selector could not be parsed.
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector {
        /// The selector text.
        selector: String,
        /// What went wrong.
        message: String,
    },

    /// The node handle does not refer to a live node.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// A sibling-relative insertion was requested on a node without a parent.
    #[error("node {0:?} has no parent")]
    NoParent(NodeId),

    /// Children were requested to be inserted into a non-element node.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// The insertion would make a node its own ancestor.
    #[error("node {node:?} cannot be inserted relative to its own descendant {anchor:?}")]
    Hierarchy {
        /// The node being inserted.
        node: NodeId,
        /// The node the insertion is relative to.
        anchor: NodeId,
    },

    /// The document body cannot be detached or released.
    #[error("the document body cannot be removed")]
    BodyRemoval,
}

impl DomError {
    /// Create a markup error.
    pub fn markup(message: impl Into<String>, position: u64) -> Self {
        Self::Markup {
            message: message.into(),
            position,
        }
    }

    /// Create a selector error.
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }
}
