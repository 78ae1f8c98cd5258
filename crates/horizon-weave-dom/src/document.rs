//! In-memory document.
//!
//! [`Document`] is the reference [`RenderSurface`]: an arena of element, text
//! and comment nodes addressed by [`NodeId`], with a body element created up
//! front. Nodes produced by parsing start detached and become part of the
//! rendered tree once inserted under the body.
//!
//! # Example
//!
//! ```
//! use horizon_weave_dom::{AdjacentPosition, Document, RenderSurface};
//!
//! let document = Document::new();
//! let body = document.body();
//!
//! document
//!     .insert_adjacent_markup(body, AdjacentPosition::BeforeEnd, "<ul><li>One</li><li>Two</li></ul>")
//!     .unwrap();
//!
//! let items = document.query_selector_all(body, "ul > li").unwrap();
//! assert_eq!(items.len(), 2);
//! assert_eq!(document.text_content(items[1]).unwrap(), "Two");
//! ```

use std::fmt;

use parking_lot::RwLock;
use quick_xml::escape::{escape, partial_escape};
use slotmap::SlotMap;

use crate::config::DocumentConfig;
use crate::error::{DomError, Result};
use crate::markup::{self, ParsedNode};
use crate::selector::{matches_any, parse_selector, ElementContext, SelectorList};
use crate::surface::{AdjacentPosition, DomCallback, DomEvent, DomListenerId, NodeId, RenderSurface};

// ============================================================================
// Tree storage
// ============================================================================

enum NodeData {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<DomListenerId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }
}

struct DomListener {
    node: NodeId,
    event: String,
    callback: DomCallback,
}

struct Tree {
    nodes: SlotMap<NodeId, Node>,
    listeners: SlotMap<DomListenerId, DomListener>,
    body: NodeId,
}

impl Tree {
    fn new(body_tag: &str) -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(Node::new(NodeData::Element {
            tag: body_tag.to_string(),
            attributes: Vec::new(),
        }));
        Self {
            nodes,
            listeners: SlotMap::with_key(),
            body,
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(id).ok_or(DomError::UnknownNode(id))
    }

    fn instantiate(&mut self, parsed: ParsedNode) -> NodeId {
        match parsed {
            ParsedNode::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.nodes.insert(Node::new(NodeData::Element { tag, attributes }));
                for child in children {
                    let child_id = self.instantiate(child);
                    if let Some(child_node) = self.nodes.get_mut(child_id) {
                        child_node.parent = Some(id);
                    }
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.children.push(child_id);
                    }
                }
                id
            }
            ParsedNode::Text(text) => self.nodes.insert(Node::new(NodeData::Text(text))),
            ParsedNode::Comment(text) => self.nodes.insert(Node::new(NodeData::Comment(text))),
        }
    }

    /// Ancestors of `id`, nearest first.
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes.get(parent).and_then(|n| n.parent);
        }
        chain
    }

    /// Descendants of `root` in document order, excluding `root`.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .nodes
            .get(root)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn context(&self, id: NodeId) -> Option<ElementContext<'_>> {
        match &self.nodes.get(id)?.data {
            NodeData::Element { tag, attributes } => Some(ElementContext::new(tag, attributes)),
            _ => None,
        }
    }

    fn matches(&self, id: NodeId, selectors: &SelectorList) -> bool {
        let Some(context) = self.context(id) else {
            return false;
        };
        let ancestors: Vec<ElementContext<'_>> = self
            .ancestors(id)
            .into_iter()
            .filter_map(|ancestor| self.context(ancestor))
            .collect();
        matches_any(selectors, &context, &ancestors)
    }

    fn unlink(&mut self, id: NodeId) -> Result<()> {
        let parent = self.node_mut(id)?.parent.take();
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        Ok(())
    }

    /// Move `nodes`, in order, to `position` relative to `anchor`.
    fn insert(&mut self, anchor: NodeId, position: AdjacentPosition, nodes: &[NodeId]) -> Result<()> {
        let anchor_node = self.node(anchor)?;
        let parent = match position {
            AdjacentPosition::BeforeBegin | AdjacentPosition::AfterEnd => {
                anchor_node.parent.ok_or(DomError::NoParent(anchor))?
            }
            AdjacentPosition::AfterBegin | AdjacentPosition::BeforeEnd => {
                if !anchor_node.is_element() {
                    return Err(DomError::NotAnElement(anchor));
                }
                anchor
            }
        };

        let mut lineage = self.ancestors(parent);
        lineage.push(parent);
        for node in nodes {
            self.node(*node)?;
            if *node == anchor || lineage.contains(node) {
                return Err(DomError::Hierarchy {
                    node: *node,
                    anchor,
                });
            }
            if *node == self.body {
                return Err(DomError::BodyRemoval);
            }
        }

        for node in nodes {
            self.unlink(*node)?;
        }

        let siblings = &self.node(parent)?.children;
        let index = match position {
            AdjacentPosition::AfterBegin => 0,
            AdjacentPosition::BeforeEnd => siblings.len(),
            AdjacentPosition::BeforeBegin | AdjacentPosition::AfterEnd => {
                let at = siblings
                    .iter()
                    .position(|child| *child == anchor)
                    .ok_or(DomError::NoParent(anchor))?;
                if position == AdjacentPosition::AfterEnd { at + 1 } else { at }
            }
        };

        for node in nodes {
            self.node_mut(*node)?.parent = Some(parent);
        }
        let children = &mut self.node_mut(parent)?.children;
        for (offset, node) in nodes.iter().enumerate() {
            children.insert(index + offset, *node);
        }
        Ok(())
    }

    fn release(&mut self, id: NodeId) -> Result<()> {
        if id == self.body {
            return Err(DomError::BodyRemoval);
        }
        self.unlink(id)?;
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node_id in doomed {
            if let Some(node) = self.nodes.remove(node_id) {
                for listener in node.listeners {
                    self.listeners.remove(listener);
                }
            }
        }
        Ok(())
    }

    fn serialize(&self, id: NodeId, out: &mut String) -> Result<()> {
        let node = self.node(id)?;
        match &node.data {
            NodeData::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape(value.as_str()));
                    out.push('"');
                }
                out.push('>');
                for child in &node.children {
                    self.serialize(*child, out)?;
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeData::Text(text) => out.push_str(&partial_escape(text.as_str())),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
        Ok(())
    }

    fn collect_text(&self, id: NodeId, out: &mut String) -> Result<()> {
        let node = self.node(id)?;
        match &node.data {
            NodeData::Element { .. } => {
                for child in &node.children {
                    if let Some(NodeData::Text(text)) = self.nodes.get(*child).map(|n| &n.data) {
                        out.push_str(text);
                    } else if self.nodes.get(*child).is_some_and(Node::is_element) {
                        self.collect_text(*child, out)?;
                    }
                }
            }
            NodeData::Text(text) | NodeData::Comment(text) => out.push_str(text),
        }
        Ok(())
    }

    fn sibling_element(&self, id: NodeId, forward: bool) -> Result<Option<NodeId>> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(None);
        };
        let siblings = &self.node(parent)?.children;
        let Some(index) = siblings.iter().position(|child| *child == id) else {
            return Ok(None);
        };
        let is_element = |candidate: &&NodeId| self.nodes.get(**candidate).is_some_and(Node::is_element);
        let found = if forward {
            siblings[index + 1..].iter().find(is_element)
        } else {
            siblings[..index].iter().rev().find(is_element)
        };
        Ok(found.copied())
    }
}

// ============================================================================
// Document
// ============================================================================

/// An in-memory rendering surface.
///
/// # Thread Safety
///
/// `Document` is `Send + Sync`. The tree is guarded by a read-write lock that
/// is released before any listener runs.
pub struct Document {
    tree: RwLock<Tree>,
    config: DocumentConfig,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read();
        f.debug_struct("Document")
            .field("nodes", &tree.nodes.len())
            .field("listeners", &tree.listeners.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Document {
    /// Create a document with default configuration.
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    /// Create a document with a custom configuration.
    pub fn with_config(config: DocumentConfig) -> Self {
        Self {
            tree: RwLock::new(Tree::new(&config.body_tag)),
            config,
        }
    }

    /// The configuration this document was created with.
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Number of live nodes, including the body.
    pub fn node_count(&self) -> usize {
        self.tree.read().nodes.len()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.tree.read().listeners.len()
    }

    /// Returns true if `node` is the body or has the body as an ancestor.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let tree = self.tree.read();
        node == tree.body || tree.ancestors(node).contains(&tree.body)
    }

    /// All children of `node`, including text and comment nodes.
    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.tree.read().node(node)?.children.clone())
    }

    fn parse(&self, markup: &str) -> Result<Vec<ParsedNode>> {
        markup::parse_fragment(markup, &self.config).inspect_err(|err| {
            tracing::warn!(target: "horizon_weave_dom::document", error = %err, "failed to parse markup");
        })
    }
}

impl RenderSurface for Document {
    fn parse_fragment(&self, markup: &str) -> Result<Vec<NodeId>> {
        let parsed = self.parse(markup)?;
        let mut tree = self.tree.write();
        Ok(parsed.into_iter().map(|node| tree.instantiate(node)).collect())
    }

    fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selectors = parse_selector(selector)?;
        let tree = self.tree.read();
        tree.node(root)?;
        Ok(tree
            .descendants(root)
            .into_iter()
            .find(|id| tree.matches(*id, &selectors)))
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let selectors = parse_selector(selector)?;
        let tree = self.tree.read();
        tree.node(root)?;
        Ok(tree
            .descendants(root)
            .into_iter()
            .filter(|id| tree.matches(*id, &selectors))
            .collect())
    }

    fn add_listener(&self, node: NodeId, event: &str, callback: DomCallback) -> Result<DomListenerId> {
        let mut tree = self.tree.write();
        tree.node(node)?;
        let id = tree.listeners.insert(DomListener {
            node,
            event: event.to_string(),
            callback,
        });
        tree.node_mut(node)?.listeners.push(id);
        Ok(id)
    }

    fn remove_listener(&self, listener: DomListenerId) -> bool {
        let mut tree = self.tree.write();
        let Some(removed) = tree.listeners.remove(listener) else {
            return false;
        };
        if let Some(node) = tree.nodes.get_mut(removed.node) {
            node.listeners.retain(|id| *id != listener);
        }
        true
    }

    #[tracing::instrument(skip_all, target = "horizon_weave_dom::document", level = "trace", fields(name = event))]
    fn dispatch(&self, target: NodeId, event: &str) -> Result<usize> {
        let calls: Vec<(NodeId, DomCallback)> = {
            let tree = self.tree.read();
            tree.node(target)?;
            let mut path = vec![target];
            path.extend(tree.ancestors(target));
            path.into_iter()
                .filter_map(|id| tree.nodes.get(id).map(|node| (id, node)))
                .flat_map(|(id, node)| {
                    node.listeners
                        .iter()
                        .filter_map(|lid| tree.listeners.get(*lid))
                        .filter(|listener| listener.event == event)
                        .map(move |listener| (id, listener.callback.clone()))
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        for (current_target, callback) in &calls {
            callback(&DomEvent {
                name: event.to_string(),
                target,
                current_target: *current_target,
            });
        }
        Ok(calls.len())
    }

    fn insert_adjacent_markup(&self, anchor: NodeId, position: AdjacentPosition, markup: &str) -> Result<()> {
        let parsed = self.parse(markup)?;
        let mut tree = self.tree.write();
        tree.node(anchor)?;
        let nodes: Vec<NodeId> = parsed.into_iter().map(|node| tree.instantiate(node)).collect();
        if let Err(err) = tree.insert(anchor, position, &nodes) {
            for node in nodes {
                tree.release(node)?;
            }
            return Err(err);
        }
        tracing::trace!(target: "horizon_weave_dom::document", %position, count = nodes.len(), "inserted markup");
        Ok(())
    }

    fn insert_node(&self, anchor: NodeId, position: AdjacentPosition, node: NodeId) -> Result<()> {
        self.tree.write().insert(anchor, position, &[node])
    }

    fn detach(&self, node: NodeId) -> Result<()> {
        let mut tree = self.tree.write();
        if node == tree.body {
            return Err(DomError::BodyRemoval);
        }
        tree.unlink(node)
    }

    fn release(&self, node: NodeId) -> Result<()> {
        self.tree.write().release(node)
    }

    fn outer_html(&self, node: NodeId) -> Result<String> {
        let mut out = String::new();
        self.tree.read().serialize(node, &mut out)?;
        Ok(out)
    }

    fn inner_html(&self, node: NodeId) -> Result<String> {
        let tree = self.tree.read();
        let mut out = String::new();
        for child in &tree.node(node)?.children {
            tree.serialize(*child, &mut out)?;
        }
        Ok(out)
    }

    fn text_content(&self, node: NodeId) -> Result<String> {
        let mut out = String::new();
        self.tree.read().collect_text(node, &mut out)?;
        Ok(out)
    }

    fn set_text_content(&self, node: NodeId, text: &str) -> Result<()> {
        let mut tree = self.tree.write();
        match &mut tree.node_mut(node)?.data {
            NodeData::Text(data) | NodeData::Comment(data) => {
                *data = text.to_string();
                return Ok(());
            }
            NodeData::Element { .. } => {}
        }
        let children = tree.node(node)?.children.clone();
        for child in children {
            tree.release(child)?;
        }
        if !text.is_empty() {
            let id = tree.nodes.insert(Node::new(NodeData::Text(text.to_string())));
            tree.insert(node, AdjacentPosition::BeforeEnd, &[id])?;
        }
        Ok(())
    }

    fn tag_name(&self, node: NodeId) -> Result<Option<String>> {
        match &self.tree.read().node(node)?.data {
            NodeData::Element { tag, .. } => Ok(Some(tag.clone())),
            _ => Ok(None),
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>> {
        match &self.tree.read().node(node)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())),
            _ => Ok(None),
        }
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let mut tree = self.tree.write();
        match &mut tree.node_mut(node)?.data {
            NodeData::Element { attributes, .. } => {
                match attributes.iter_mut().find(|(key, _)| key == name) {
                    Some((_, existing)) => *existing = value.to_string(),
                    None => attributes.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            _ => Err(DomError::NotAnElement(node)),
        }
    }

    fn element_children(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let tree = self.tree.read();
        Ok(tree
            .node(node)?
            .children
            .iter()
            .copied()
            .filter(|child| tree.nodes.get(*child).is_some_and(Node::is_element))
            .collect())
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.tree.read().node(node)?.parent)
    }

    fn previous_element_sibling(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.tree.read().sibling_element(node, false)
    }

    fn next_element_sibling(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.tree.read().sibling_element(node, true)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.tree.read().nodes.contains_key(node)
    }

    fn body(&self) -> NodeId {
        self.tree.read().body
    }
}

static_assertions::assert_impl_all!(Document: Send, Sync);
