//! Error types for DOM operations
//!
//! One flat enum for the whole crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Node {child} cannot be inserted into {parent}")]
    HierarchyRequest { parent: u32, child: u32 },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: u32, child: u32 },

    #[error("Node belongs to a different document")]
    WrongDocument,

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
}
