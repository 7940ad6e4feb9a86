use serde::{Deserialize, Serialize};

/// Client configuration, fixed once the client is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AjaxConfig {
    /// Emit diagnostics for reported errors and for failures of the reporter itself
    pub debug: bool,
    /// Where error reports are POSTed
    pub error_log_url: String,
}

impl Default for AjaxConfig {
    fn default() -> Self {
        Self {
            debug: false,
            error_log_url: "/some/url/error-log".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: AjaxConfig = serde_json::from_str(r#"{"debug": true}"#).unwrap();
        assert!(config.debug);
        assert_eq!(config.error_log_url, "/some/url/error-log");
        assert_eq!(serde_json::from_str::<AjaxConfig>("{}").unwrap(), AjaxConfig::default());
    }
}
