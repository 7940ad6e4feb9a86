//! Error types for the helper functions

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolsError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolsError {
    #[error("Object required for serialize_object, got {0}")]
    ObjectRequired(crate::TypeTag),
}
