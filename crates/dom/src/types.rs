//! Core node types
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Use SmallVec for small arrays (most nodes have few children/attributes)
//! 3. Attributes keep insertion order, like the DOM's NamedNodeMap

use crate::events::Listener;
use ahash::AHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Node identifier (index into arena)
pub type NodeId = u32;

/// Node type matching DOM specification numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
}

impl NodeType {
    pub fn node_name(&self) -> &'static str {
        match self {
            NodeType::Element => "#element",
            NodeType::Text => "#text",
            NodeType::Comment => "#comment",
            NodeType::Document => "#document",
        }
    }
}

/// Single attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Ordered attribute list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(SmallVec<[Attribute; 4]>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|a| a.name == name)
    }

    /// Set attribute, replacing in place if it already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Attribute { name, value }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.0.iter().position(|a| a.name == name)?;
        Some(self.0.remove(pos).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Event listeners registered on a node, keyed by event type
#[derive(Clone, Default)]
pub struct ListenerMap(AHashMap<String, Vec<Listener>>);

impl ListenerMap {
    /// Register a listener. The same listener (by identity) is only kept once per type.
    pub fn add(&mut self, event_type: &str, listener: &Listener) {
        let entry = self.0.entry(event_type.to_string()).or_default();
        if !entry.iter().any(|l| Arc::ptr_eq(l, listener)) {
            entry.push(listener.clone());
        }
    }

    /// Deregister a listener by identity. Returns whether it was present.
    pub fn remove(&mut self, event_type: &str, listener: &Listener) -> bool {
        let Some(entry) = self.0.get_mut(event_type) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|l| !Arc::ptr_eq(l, listener));
        let removed = entry.len() != before;
        if entry.is_empty() {
            self.0.remove(event_type);
        }
        removed
    }

    pub fn get(&self, event_type: &str) -> &[Listener] {
        self.0.get(event_type).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ListenerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

/// The main DOM tree node structure
///
/// Design philosophy:
/// - Use indices instead of pointers
/// - Element-only state (attributes, value, listeners) is empty for other kinds
#[derive(Debug, Clone)]
pub struct DomNode {
    pub node_id: NodeId,
    pub node_type: NodeType,

    // Navigation indices
    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>,

    /// Lowercase tag name for elements, `#text`/`#comment`/`#document` otherwise
    pub node_name: String,
    /// Character data for text and comment nodes
    pub node_value: String,
    pub attributes: Attributes,

    /// Form control `value` property. Falls back to the `value` attribute when unset.
    pub value: Option<String>,

    pub listeners: ListenerMap,
}

impl DomNode {
    fn new(node_id: NodeId, node_type: NodeType, node_name: String) -> Self {
        Self {
            node_id,
            node_type,
            parent_id: None,
            children_ids: SmallVec::new(),
            node_name,
            node_value: String::new(),
            attributes: Attributes::new(),
            value: None,
            listeners: ListenerMap::default(),
        }
    }

    pub fn element(node_id: NodeId, tag_name: &str) -> Self {
        Self::new(node_id, NodeType::Element, tag_name.to_ascii_lowercase())
    }

    pub fn text(node_id: NodeId, data: impl Into<String>) -> Self {
        let mut node = Self::new(node_id, NodeType::Text, NodeType::Text.node_name().into());
        node.node_value = data.into();
        node
    }

    pub fn comment(node_id: NodeId, data: impl Into<String>) -> Self {
        let mut node = Self::new(node_id, NodeType::Comment, NodeType::Comment.node_name().into());
        node.node_value = data.into();
        node
    }

    pub fn document(node_id: NodeId) -> Self {
        Self::new(node_id, NodeType::Document, NodeType::Document.node_name().into())
    }

    /// Get tag name for element nodes
    pub fn tag_name(&self) -> Option<&str> {
        if self.node_type == NodeType::Element {
            Some(&self.node_name)
        } else {
            None
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    /// Whitespace-separated tokens of the `class` attribute
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.class_names().any(|c| c == name)
    }
}

/// Elements that never have children or a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text up to the matching close tag
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}
