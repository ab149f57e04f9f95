use formdoc_engine::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "formdoc.config.json";

/// Formdoc configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// View whose layout and `hiddenViews` apply
    #[serde(default = "default_active_view")]
    pub active_view: String,

    /// Pretty-print written documents
    #[serde(default = "default_pretty")]
    pub pretty: bool,

    /// Directory for written documents when no `--output` is given
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub out_dir: Option<String>,
}

fn default_active_view() -> String {
    "mobile".to_string()
}

fn default_pretty() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Editor settings, with `view` overriding the configured active view
    pub fn editor_config(&self, view: Option<&str>) -> EditorConfig {
        EditorConfig::default().with_active_view(view.unwrap_or(&self.active_view))
    }

    /// Where a document derived from `input` is written. `None` means stdout.
    pub fn output_path(&self, cwd: &str, input: &Path, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let out_dir = self.out_dir.as_ref()?;
        let file_name = input.file_name()?;
        Some(PathBuf::from(cwd).join(out_dir).join(file_name))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_view: default_active_view(),
            pretty: default_pretty(),
            out_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "activeView": "desktop",
            "pretty": false,
            "outDir": "dist"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.active_view, "desktop");
        assert!(!config.pretty);
        assert_eq!(config.out_dir, Some("dist".to_string()));
        assert_eq!(config.editor_config(None).active_view, "desktop");
        assert_eq!(config.editor_config(Some("web")).active_view, "web");
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.active_view, "mobile");
        assert!(config.pretty);
    }

    #[test]
    fn test_output_path() {
        let input = Path::new("forms/inspection.json");
        let config = Config::default();
        assert_eq!(config.output_path("/work", input, None), None);
        assert_eq!(
            config.output_path("/work", input, Some(Path::new("out.json"))),
            Some(PathBuf::from("out.json"))
        );

        let config = Config {
            out_dir: Some("dist".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.output_path("/work", input, None),
            Some(PathBuf::from("/work/dist/inspection.json"))
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = Config::load("/definitely/not/a/real/dir").unwrap();
        assert_eq!(config, Config::default());
    }
}
