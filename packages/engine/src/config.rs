//! Editor configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// View name matched against `hiddenViews` and used to pick page layouts
    #[serde(default = "default_active_view")]
    pub active_view: String,

    /// Evaluate every formula when a document is opened
    #[serde(default = "default_true")]
    pub recalculate_on_load: bool,

    /// Tag stamped on outgoing change records
    #[serde(default = "default_sdk")]
    pub sdk: String,
}

fn default_active_view() -> String {
    "mobile".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sdk() -> String {
    "rust".to_string()
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            active_view: default_active_view(),
            recalculate_on_load: default_true(),
            sdk: default_sdk(),
        }
    }
}

impl EditorConfig {
    pub fn with_active_view(mut self, view: impl Into<String>) -> Self {
        self.active_view = view.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.active_view, "mobile");
        assert!(config.recalculate_on_load);
    }

    #[test]
    fn test_partial_override() {
        let config: EditorConfig = serde_json::from_str(r#"{ "activeView": "desktop" }"#).unwrap();
        assert_eq!(config.active_view, "desktop");
        assert_eq!(config.sdk, "rust");
    }
}
