//! # Formdoc Model
//!
//! Serde data model for form documents.
//!
//! ## Layout
//!
//! ```text
//! Document
//!  ├── files[]  ── pages[] ── fieldPositions[] ──┐
//!  │     └── views[] ── pages[]                   │ (field id)
//!  ├── fields[] <──────────────────────────────────┘
//!  │     └── value: rows[] ── cells{}, children{schemaKey: rows[]}
//!  └── formulas[]
//! ```
//!
//! Unknown keys on documents, pages, field positions and rows are preserved
//! so a document survives a load/save cycle through the engine.

pub mod change;
pub mod document;
pub mod error;
pub mod field;
pub mod id_generator;
pub mod logic;
pub mod value;

pub use change::{
    Change, ChangeTarget, FieldUpdatePayload, PathHop, RowCells, RowCreatePayload,
    RowDeletePayload, RowMovePayload, RowUpdatePayload,
};
pub use document::{Document, FieldPosition, File, Formula, Page, View};
pub use error::{ModelError, ModelResult};
pub use field::{AppliedFormula, Field, FieldKind, FieldOption, Schema, TableColumn};
pub use id_generator::{get_document_seed, IDGenerator};
pub use logic::{Condition, ConditionOp, Logic, LogicAction, LogicEval};
pub use value::{Children, FieldValue, ValueElement};
