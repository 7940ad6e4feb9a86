//! Error types for the request pipeline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AjaxError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("No <meta name=\"csrf-token\"> in the document for {method} {url}")]
    MissingCsrfToken { method: String, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-200 terminal status. `message` is what gets reported.
    #[error("{message}")]
    Response { status: u16, message: String },

    #[error(transparent)]
    Tools(#[from] tools::ToolsError),

    #[error(transparent)]
    Dom(#[from] dom::DomError),
}

/// Result type for request operations
pub type Result<T> = std::result::Result<T, AjaxError>;
