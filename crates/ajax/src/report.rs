use serde::Serialize;

use crate::error::Result;

/// What gets POSTed to the error log endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Location of the document the error happened in
    pub url: String,
    pub message: String,
}

impl ErrorReport {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Form body: `url=<location>&message=<message>`
    pub fn to_form(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(tools::serialize_object(&value)?)
    }
}
