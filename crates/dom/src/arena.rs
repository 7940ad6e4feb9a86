//! Arena-based DOM tree storage
//!
//! ## Memory Layout
//!
//! ```text
//! Arena: Vec<DomNode>
//!        [Doc][Node1][Node2]...
//!         ↑ 4-byte index, not 8-byte pointer
//! ```
//!
//! Nodes are never freed. A removed node is simply detached (no parent) and
//! can be inserted again later, which is what element handles expect.

use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId, NodeType};

/// Arena allocator for DOM nodes
///
/// Design:
/// - Single Vec<DomNode> for sequential allocation
/// - Node 0 is always the `#document` root
/// - No Rc/Arc: use indices everywhere
#[derive(Debug)]
pub struct DomArena {
    nodes: Vec<DomNode>,
    root_id: NodeId,
}

impl DomArena {
    /// Create an arena holding only the document root
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(DomNode::document(0));
        Self { nodes, root_id: 0 }
    }

    fn next_id(&self) -> NodeId {
        self.nodes.len() as NodeId
    }

    /// Add a detached element node
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        let node = DomNode::element(self.next_id(), tag_name);
        self.add_node(node)
    }

    /// Add a detached text node
    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        let node = DomNode::text(self.next_id(), data);
        self.add_node(node)
    }

    /// Add a detached comment node
    pub fn create_comment(&mut self, data: impl Into<String>) -> NodeId {
        let node = DomNode::comment(self.next_id(), data);
        self.add_node(node)
    }

    fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.next_id();
        node.node_id = node_id;
        self.nodes.push(node);
        node_id
    }

    /// Get node by ID (immutable)
    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node by ID (mutable)
    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get element by ID, rejecting other node kinds
    pub fn element(&self, node_id: NodeId) -> Result<&DomNode> {
        let node = self.get(node_id)?;
        if node.is_element() {
            Ok(node)
        } else {
            Err(invalid_type(node.node_type))
        }
    }

    /// Get element by ID (mutable), rejecting other node kinds
    pub fn element_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        let node = self.get_mut(node_id)?;
        if node.is_element() {
            Ok(node)
        } else {
            Err(invalid_type(node.node_type))
        }
    }

    /// Root (`#document`) node ID
    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Total number of nodes, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of any node
    pub fn parent_id(&self, node_id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.get(node_id)?.parent_id)
    }

    /// Parent only if it is an element (`parentElement`)
    pub fn parent_element_id(&self, node_id: NodeId) -> Result<Option<NodeId>> {
        match self.get(node_id)?.parent_id {
            Some(parent_id) if self.get(parent_id)?.is_element() => Ok(Some(parent_id)),
            _ => Ok(None),
        }
    }

    /// Element children in order (`children`, not `childNodes`)
    pub fn element_children(&self, node_id: NodeId) -> Result<Vec<NodeId>> {
        let node = self.get(node_id)?;
        let mut out = Vec::with_capacity(node.children_ids.len());
        for &child_id in &node.children_ids {
            if self.get(child_id)?.is_element() {
                out.push(child_id);
            }
        }
        Ok(out)
    }

    /// Previous sibling that is an element
    pub fn previous_element_sibling(&self, node_id: NodeId) -> Result<Option<NodeId>> {
        let Some(parent_id) = self.parent_id(node_id)? else {
            return Ok(None);
        };
        let siblings = self.element_children(parent_id)?;
        let pos = siblings.iter().position(|&id| id == node_id);
        Ok(pos.and_then(|p| p.checked_sub(1)).map(|p| siblings[p]))
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return Ok(true);
            }
            cursor = self.get(id)?.parent_id;
        }
        Ok(false)
    }

    /// Detach a node from its parent. No-op for detached nodes.
    pub fn detach(&mut self, node_id: NodeId) -> Result<()> {
        let Some(parent_id) = self.get(node_id)?.parent_id else {
            return Ok(());
        };
        self.get_mut(parent_id)?
            .children_ids
            .retain(|id| *id != node_id);
        self.get_mut(node_id)?.parent_id = None;
        Ok(())
    }

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. The child is moved out of its current parent first.
    pub fn insert_before(
        &mut self,
        parent_id: NodeId,
        child_id: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        let parent = self.get(parent_id)?;
        let child = self.get(child_id)?;
        let can_hold_children = matches!(parent.node_type, NodeType::Element | NodeType::Document);
        if !can_hold_children
            || child.node_type == NodeType::Document
            || self.is_inclusive_ancestor(child_id, parent_id)?
        {
            return Err(DomError::HierarchyRequest {
                parent: parent_id,
                child: child_id,
            });
        }
        if let Some(reference_id) = reference {
            if self.get(reference_id)?.parent_id != Some(parent_id) {
                return Err(DomError::NotAChild {
                    parent: parent_id,
                    child: reference_id,
                });
            }
        }
        // Inserting a node before itself leaves the tree unchanged
        if reference == Some(child_id) {
            return Ok(());
        }

        self.detach(child_id)?;

        let parent = self.get_mut(parent_id)?;
        let index = reference
            .and_then(|r| parent.children_ids.iter().position(|id| *id == r))
            .unwrap_or(parent.children_ids.len());
        parent.children_ids.insert(index, child_id);
        self.get_mut(child_id)?.parent_id = Some(parent_id);
        Ok(())
    }

    /// Append `child` as last child of `parent`
    pub fn append_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        self.insert_before(parent_id, child_id, None)
    }

    /// Remove `child` from `parent`, failing if it is not a child
    pub fn remove_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        if self.get(child_id)?.parent_id != Some(parent_id) {
            return Err(DomError::NotAChild {
                parent: parent_id,
                child: child_id,
            });
        }
        self.detach(child_id)
    }

    /// Detach every child of a node
    pub fn clear_children(&mut self, node_id: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.get_mut(node_id)?.children_ids);
        for child_id in children {
            self.get_mut(child_id)?.parent_id = None;
        }
        Ok(())
    }

    /// Copy a node into a new detached node. With `deep`, the whole subtree is
    /// copied. Listeners are not copied, matching `cloneNode`.
    pub fn clone_node(&mut self, node_id: NodeId, deep: bool) -> Result<NodeId> {
        let source = self.get(node_id)?;
        let mut copy = source.clone();
        copy.parent_id = None;
        copy.children_ids.clear();
        copy.listeners = Default::default();
        let children = if deep {
            source.children_ids.to_vec()
        } else {
            Vec::new()
        };

        let copy_id = self.add_node(copy);
        for child_id in children {
            let child_copy = self.clone_node(child_id, true)?;
            self.append_child(copy_id, child_copy)?;
        }
        Ok(copy_id)
    }

    /// Traverse tree depth-first (iterative, no recursion)
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut stack = vec![start_id];

        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            visit(node)?;

            // Push children in reverse order (so they're visited left-to-right)
            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
        }

        Ok(())
    }

    /// Element descendants of `start_id` (excluding itself), in document order
    pub fn descendant_elements(&self, start_id: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        self.traverse_df(start_id, |node| {
            if node.is_element() && node.node_id != start_id {
                out.push(node.node_id);
            }
            Ok(())
        })?;
        Ok(out)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node_id: NodeId) -> Result<String> {
        let mut text = String::new();
        self.traverse_df(node_id, |node| {
            if node.is_text() {
                text.push_str(&node.node_value);
            }
            Ok(())
        })?;
        Ok(text)
    }

    /// Find first attached element by ID attribute
    pub fn find_by_id(&self, id: &str) -> Result<Option<NodeId>> {
        for node_id in self.descendant_elements(self.root_id)? {
            if self.get(node_id)?.attr("id") == Some(id) {
                return Ok(Some(node_id));
            }
        }
        Ok(None)
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_type(actual: NodeType) -> DomError {
    DomError::InvalidNodeType {
        expected: "element".to_string(),
        actual: format!("{:?}", actual),
    }
}
