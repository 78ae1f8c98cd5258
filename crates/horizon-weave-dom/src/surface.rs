//! The rendering surface capability.
//!
//! Components never touch tree storage directly. Everything they need from a
//! host tree (parse markup, query by selector, listen for interactions,
//! insert and remove nodes, serialize) goes through [`RenderSurface`], with
//! nodes identified by opaque [`NodeId`] handles.

use std::fmt;
use std::sync::Arc;

use slotmap::new_key_type;

use crate::error::Result;

new_key_type! {
    /// Handle to a node of a rendering surface.
    pub struct NodeId;

    /// Handle to a listener registered with [`RenderSurface::add_listener`].
    pub struct DomListenerId;
}

/// Where to insert relative to an anchor node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjacentPosition {
    /// Immediately before the anchor, as its previous sibling.
    BeforeBegin,
    /// As the anchor's first children.
    AfterBegin,
    /// As the anchor's last children.
    BeforeEnd,
    /// Immediately after the anchor, as its next sibling.
    AfterEnd,
}

/// An interaction delivered to a node listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    /// Interaction name (e.g., "click").
    pub name: String,
    /// The node the interaction was dispatched on.
    pub target: NodeId,
    /// The node whose listener is running; the target or one of its ancestors.
    pub current_target: NodeId,
}

/// A node listener.
pub type DomCallback = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// A host tree that components render into.
///
/// All methods take `&self`; implementations synchronize internally and must
/// never hold a lock while a listener runs, so listeners may call back into
/// the surface.
pub trait RenderSurface: Send + Sync {
    /// Parse `markup` into new, detached nodes and return the top-level ones
    /// in order.
    fn parse_fragment(&self, markup: &str) -> Result<Vec<NodeId>>;

    /// First descendant of `root` (in document order) matching `selector`.
    fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>>;

    /// Every descendant of `root` matching `selector`, in document order.
    fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>>;

    /// Listen for interactions named `event` on `node`.
    fn add_listener(&self, node: NodeId, event: &str, callback: DomCallback) -> Result<DomListenerId>;

    /// Stop a listener. Returns false if it was already gone.
    fn remove_listener(&self, listener: DomListenerId) -> bool;

    /// Deliver interaction `event` to `target`, then to each of its ancestors.
    ///
    /// Returns the number of listeners invoked.
    fn dispatch(&self, target: NodeId, event: &str) -> Result<usize>;

    /// Parse `markup` and insert the resulting nodes at `position` relative
    /// to `anchor`, in one operation.
    fn insert_adjacent_markup(&self, anchor: NodeId, position: AdjacentPosition, markup: &str) -> Result<()>;

    /// Move `node` to `position` relative to `anchor`.
    fn insert_node(&self, anchor: NodeId, position: AdjacentPosition, node: NodeId) -> Result<()>;

    /// Detach `node` from its parent. Detaching a parentless node does nothing.
    fn detach(&self, node: NodeId) -> Result<()>;

    /// Drop `node`, its subtree and their listeners.
    fn release(&self, node: NodeId) -> Result<()>;

    /// Serialize `node` and its subtree.
    fn outer_html(&self, node: NodeId) -> Result<String>;

    /// Serialize the children of `node`.
    fn inner_html(&self, node: NodeId) -> Result<String>;

    /// Concatenated text of `node` and its descendants.
    fn text_content(&self, node: NodeId) -> Result<String>;

    /// Replace the children of an element with a single text node, or the
    /// data of a text or comment node.
    fn set_text_content(&self, node: NodeId, text: &str) -> Result<()>;

    /// Tag name of an element; `None` for text and comment nodes.
    fn tag_name(&self, node: NodeId) -> Result<Option<String>>;

    /// Value of attribute `name` of an element.
    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>>;

    /// Set attribute `name` of an element.
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()>;

    /// Element children of `node`, in order.
    fn element_children(&self, node: NodeId) -> Result<Vec<NodeId>>;

    /// Parent of `node`, if attached.
    fn parent(&self, node: NodeId) -> Result<Option<NodeId>>;

    /// Nearest preceding sibling that is an element.
    fn previous_element_sibling(&self, node: NodeId) -> Result<Option<NodeId>>;

    /// Nearest following sibling that is an element.
    fn next_element_sibling(&self, node: NodeId) -> Result<Option<NodeId>>;

    /// Returns true if `node` is a live handle.
    fn contains(&self, node: NodeId) -> bool;

    /// The body element every application renders into.
    fn body(&self) -> NodeId;
}

impl fmt::Display for AdjacentPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeforeBegin => "beforebegin",
            Self::AfterBegin => "afterbegin",
            Self::BeforeEnd => "beforeend",
            Self::AfterEnd => "afterend",
        };
        f.write_str(name)
    }
}
