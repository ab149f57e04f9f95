pub mod apply;
pub mod duplicate;
pub mod eval;
pub mod init;
pub mod validate;
pub mod visibility;

pub use apply::{apply, ApplyArgs};
pub use duplicate::{duplicate_page, DuplicatePageArgs};
pub use eval::{eval, EvalArgs};
pub use init::{init, InitArgs};
pub use validate::{validate, ValidateArgs};
pub use visibility::{visibility, VisibilityArgs};

use crate::config::Config;
use anyhow::{Context as _, Result};
use clap::ValueEnum;
use colored::Colorize;
use formdoc_engine::DocumentEditor;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Settings shared by every document command
#[derive(Debug)]
pub struct Context {
    pub cwd: String,
    pub config: Config,
    pub format: OutputFormat,
    pub view: Option<String>,
}

impl Context {
    pub fn open(&self, path: &Path) -> Result<DocumentEditor> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let editor = DocumentEditor::from_json_str(&source, self.config.editor_config(self.view.as_deref()))
            .with_context(|| format!("Failed to load {}", path.display()))?;
        debug!(path = %path.display(), version = editor.version(), "Opened document");
        Ok(editor)
    }

    /// Writes the edited document next to the configured output, or to
    /// stdout when there is none
    pub fn write_document(&self, editor: &DocumentEditor, input: &Path, output: Option<&Path>) -> Result<()> {
        let json = editor.to_json_string(self.config.pretty)?;
        match self.config.output_path(&self.cwd, input, output) {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, json)?;
                debug!(path = %path.display(), "Wrote document");
                if self.format == OutputFormat::Text {
                    println!("  {} Wrote {}", "✓".green(), path.display());
                }
            }
            None => println!("{}", json),
        }
        Ok(())
    }

    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let json = if self.config.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{}", json);
        Ok(())
    }
}
