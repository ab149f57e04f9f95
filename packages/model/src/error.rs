//! Error types for the document model

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Page {page_id} position {position_id} references unknown field {field_id}")]
    DanglingFieldPosition {
        page_id: String,
        position_id: String,
        field_id: String,
    },

    #[error("Duplicate field id: {0}")]
    DuplicateFieldId(String),
}

impl ModelError {
    pub fn dangling_position(page_id: &str, position_id: &str, field_id: &str) -> Self {
        Self::DanglingFieldPosition {
            page_id: page_id.to_string(),
            position_id: position_id.to_string(),
            field_id: field_id.to_string(),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
