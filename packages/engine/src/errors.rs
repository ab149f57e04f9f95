//! Error types for the engine

use formdoc_model::{ChangeTarget, ModelError};
use thiserror::Error;

/// Why a single row or value mutation could not be applied.
///
/// The change applicator never aborts a batch on these; they are logged and
/// reported per change.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Field {0} is not a table or collection")]
    NotRowContainer(String),

    #[error("Field {0} has no value to mutate")]
    ValueAbsent(String),

    #[error("Parent row {row_id} not found in field {field_id}")]
    ParentRowNotFound { field_id: String, row_id: String },

    #[error("Row {row_id} not found in field {field_id}")]
    RowNotFound { field_id: String, row_id: String },

    #[error("Row {row_id} already exists in field {field_id}")]
    RowExists { field_id: String, row_id: String },
}

impl MutationError {
    pub fn row_not_found(field_id: &str, row_id: &str) -> Self {
        Self::RowNotFound {
            field_id: field_id.to_string(),
            row_id: row_id.to_string(),
        }
    }

    pub fn parent_not_found(field_id: &str, row_id: &str) -> Self {
        Self::ParentRowNotFound {
            field_id: field_id.to_string(),
            row_id: row_id.to_string(),
        }
    }

    pub fn row_exists(field_id: &str, row_id: &str) -> Self {
        Self::RowExists {
            field_id: field_id.to_string(),
            row_id: row_id.to_string(),
        }
    }
}

pub type MutationResult<T> = Result<T, MutationError>;

/// Why an incoming change record could not be turned into a mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChangeError {
    #[error("Change {target} has no fieldId")]
    MissingFieldId { target: ChangeTarget },

    #[error("Malformed {target} payload: {message}")]
    MalformedPayload { target: ChangeTarget, message: String },

    #[error("Unsupported change target: {0}")]
    UnsupportedTarget(ChangeTarget),
}

impl ChangeError {
    pub fn malformed(target: ChangeTarget, err: impl std::fmt::Display) -> Self {
        Self::MalformedPayload {
            target,
            message: err.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Change error: {0}")]
    Change(#[from] ChangeError),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Page {page_id} cannot be deleted: {reason}")]
    PageNotDeletable { page_id: String, reason: String },
}

pub type EditorResult<T> = Result<T, EditorError>;
