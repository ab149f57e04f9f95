//! # Formdoc Engine
//!
//! Reactive editing core for form documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: serde Document, Field, Change        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ engine: DocumentEditor                      │
//! │  - DocumentStore (single writer, version)   │
//! │  - Mutation + change decoding               │
//! │  - PostEffectEngine (formula cascade)       │
//! │  - VisibilityCache (logic dependency index) │
//! │  - page duplication / deletion, navigation  │
//! │  - Validator                                │
//! └─────────────────────────────────────────────┘
//!                     ↑
//! ┌─────────────────────────────────────────────┐
//! │ formula: parse + evaluate expressions       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One writer**: the editor owns the document; callers read through it
//! 2. **Fail open**: unknown ids read as visible, bad changes are skipped
//! 3. **Tombstones**: deleted rows keep their id and slot in `rowOrder`
//! 4. **Bounded cascades**: each formula and visibility target is
//!    recomputed at most once per triggering change
//!
//! ## Usage
//!
//! ```rust,ignore
//! use formdoc_engine::{DocumentEditor, EditorConfig, RowPath};
//!
//! let mut editor = DocumentEditor::from_json_str(&source, EditorConfig::default())?;
//!
//! // incoming records from another client
//! let report = editor.apply_changes(&changes);
//!
//! // local edits produce outgoing records
//! editor.duplicate_rows(&RowPath::root("items"), &["row1".to_string()])?;
//! let outgoing = editor.take_changes();
//!
//! let validation = editor.validate();
//! ```

pub mod config;
pub mod dependency;
pub mod duplicate;
pub mod editor;
pub mod errors;
pub mod formulas;
pub mod logic;
pub mod mutations;
pub mod navigation;
pub mod pages;
pub mod post_effects;
pub mod rows;
pub mod store;
pub mod validation;

pub use config::EditorConfig;
pub use dependency::{VisibilityCache, VisibilityTarget};
pub use duplicate::{duplicate_page, exclusive_fields, DuplicatedPage};
pub use editor::{BatchReport, DocumentEditor, SkippedChange};
pub use errors::{ChangeError, EditorError, EditorResult, MutationError, MutationResult};
pub use formulas::{evaluate_expression, FormulaGraph};
pub use logic::{compare_value, LogicEvaluator};
pub use mutations::Mutation;
pub use navigation::{GotoConfig, NavigationStatus, NavigationTarget};
pub use pages::{can_delete_page, delete_page, PageDeletionCheck};
pub use post_effects::{FormulaRecalculation, PostEffect, PostEffectEngine};
pub use rows::{find_row, RowPath};
pub use store::DocumentStore;
pub use validation::{
    CellValidity, ColumnValidity, FieldValidity, RowValidity, Validation, ValidationStatus, Validator,
};

// Re-export model and formula crates for convenience
pub use formdoc_formula as formula;
pub use formdoc_model as model;
