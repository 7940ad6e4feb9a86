//! DOM Serializer - Convert a subtree back to HTML markup
//!
//! This is the getter side of `innerHTML`/`outerHTML`. Output is compact
//! (no indentation) so that parsing it again yields the same tree.

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::*;
use crate::utils::{escape_attr, escape_text};

/// DOM Tree Serializer
#[derive(Debug, Default)]
pub struct DomSerializer;

impl DomSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Markup of the node's children
    pub fn inner_html(&self, arena: &DomArena, node_id: NodeId) -> Result<String> {
        let mut output = String::new();
        for &child_id in &arena.get(node_id)?.children_ids {
            self.serialize_node(arena, child_id, &mut output)?;
        }
        Ok(output)
    }

    /// Markup of the node itself, including its children
    pub fn outer_html(&self, arena: &DomArena, node_id: NodeId) -> Result<String> {
        let mut output = String::new();
        self.serialize_node(arena, node_id, &mut output)?;
        Ok(output)
    }

    /// Serialize a single node recursively
    fn serialize_node(&self, arena: &DomArena, node_id: NodeId, output: &mut String) -> Result<()> {
        let node = arena.get(node_id)?;

        match node.node_type {
            NodeType::Element => {
                output.push('<');
                output.push_str(&node.node_name);
                for attr in node.attributes.iter() {
                    output.push(' ');
                    output.push_str(&attr.name);
                    output.push_str("=\"");
                    output.push_str(&escape_attr(&attr.value));
                    output.push('"');
                }
                output.push('>');

                if is_void_element(&node.node_name) {
                    return Ok(());
                }

                let raw = RAW_TEXT_ELEMENTS.contains(&node.node_name.as_str());
                for &child_id in &node.children_ids {
                    let child = arena.get(child_id)?;
                    if raw && child.is_text() {
                        output.push_str(&child.node_value);
                    } else {
                        self.serialize_node(arena, child_id, output)?;
                    }
                }

                output.push_str("</");
                output.push_str(&node.node_name);
                output.push('>');
            }
            NodeType::Text => output.push_str(&escape_text(&node.node_value)),
            NodeType::Comment => {
                output.push_str("<!--");
                output.push_str(&node.node_value);
                output.push_str("-->");
            }
            NodeType::Document => {
                for &child_id in &node.children_ids {
                    self.serialize_node(arena, child_id, output)?;
                }
            }
        }

        Ok(())
    }
}
