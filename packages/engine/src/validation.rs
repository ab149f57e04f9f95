//! # Validation
//!
//! Walks the fields placed on the pages of the active view and reports
//! required-value violations. Hidden pages and hidden fields are always
//! valid.
//!
//! ```text
//! Validation
//!  └── FieldValidity (field, page)
//!        ├── RowValidity ── CellValidity (required, visible columns)
//!        │     └── RowValidity (nested collection rows)
//!        └── ColumnValidity
//! ```

use crate::logic::LogicEvaluator;
use formdoc_model::{Document, Field, FieldKind, FieldValue, TableColumn, ValueElement};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

impl ValidationStatus {
    fn from_valid(valid: bool) -> Self {
        if valid {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        }
    }

    pub fn is_valid(&self) -> bool {
        *self == ValidationStatus::Valid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellValidity {
    pub row_id: String,
    pub column_id: String,
    pub status: ValidationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowValidity {
    pub row_id: String,
    pub status: ValidationStatus,
    pub cell_validities: Vec<CellValidity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RowValidity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnValidity {
    pub column_id: String,
    pub status: ValidationStatus,
    pub cell_validities: Vec<CellValidity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidity {
    pub field_id: String,
    pub page_id: String,
    pub status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_validities: Vec<RowValidity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_validities: Vec<ColumnValidity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl FieldValidity {
    fn valid(field_id: &str, page_id: &str) -> Self {
        Self {
            field_id: field_id.to_string(),
            page_id: page_id.to_string(),
            status: ValidationStatus::Valid,
            row_validities: Vec::new(),
            column_validities: Vec::new(),
            reasons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub status: ValidationStatus,
    pub field_validities: Vec<FieldValidity>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    pub fn invalid_fields(&self) -> impl Iterator<Item = &FieldValidity> {
        self.field_validities.iter().filter(|v| !v.status.is_valid())
    }
}

pub struct Validator<'a> {
    doc: &'a Document,
    logic: LogicEvaluator<'a>,
}

impl<'a> Validator<'a> {
    pub fn new(doc: &'a Document, logic: LogicEvaluator<'a>) -> Self {
        Self { doc, logic }
    }

    #[instrument(skip(self), fields(view = %self.logic.active_view()))]
    pub fn validate(&self) -> Validation {
        let mut seen = HashSet::new();
        let mut field_validities = Vec::new();

        for page in self.logic.pages_for_view() {
            let page_visible = self.logic.should_show_page(&page.id);
            for position in &page.field_positions {
                if !seen.insert(position.field.as_str()) {
                    continue;
                }
                let Some(field) = self.doc.field(&position.field) else {
                    continue;
                };

                let validity = if !page_visible || !self.logic.should_show_field(&field.id) {
                    debug!(field_id = %field.id, "Skipping hidden field");
                    FieldValidity::valid(&field.id, &page.id)
                } else {
                    self.validate_field(field, &page.id)
                };
                field_validities.push(validity);
            }
        }

        let valid = field_validities.iter().all(|v| v.status.is_valid());
        info!(fields = field_validities.len(), valid, "Validated document");
        Validation {
            status: ValidationStatus::from_valid(valid),
            field_validities,
        }
    }

    fn validate_field(&self, field: &Field, page_id: &str) -> FieldValidity {
        let mut validity = FieldValidity::valid(&field.id, page_id);
        if !field.is_required() {
            return validity;
        }

        match &field.kind {
            FieldKind::Table { .. } | FieldKind::Collection { .. } => {
                let rows = field.active_rows();
                if rows.is_empty() {
                    validity.reasons.push("Required field has no rows".to_string());
                }

                let root_columns = match field.root_schema() {
                    Some((_, schema)) => schema.table_columns.as_slice(),
                    None => field.table_columns(),
                };
                let root_key = field.root_schema().map(|(key, _)| key);
                validity.row_validities = rows
                    .into_iter()
                    .map(|row| self.validate_row(field, row, root_columns, root_key))
                    .collect();
                validity.column_validities = column_validities(&validity.row_validities);

                if validity.row_validities.iter().any(|r| !r.status.is_valid()) {
                    validity.reasons.push("Required cells are empty".to_string());
                }
            }
            _ => {
                if is_empty(field.value.as_ref()) {
                    validity.reasons.push("Required field is empty".to_string());
                }
            }
        }

        validity.status = ValidationStatus::from_valid(validity.reasons.is_empty());
        validity
    }

    fn validate_row(
        &self,
        field: &Field,
        row: &ValueElement,
        columns: &[TableColumn],
        schema_key: Option<&str>,
    ) -> RowValidity {
        let cell_validities: Vec<CellValidity> = columns
            .iter()
            .filter(|column| column.required == Some(true))
            .filter(|column| self.logic.should_show_column(&field.id, &column.id))
            .map(|column| CellValidity {
                row_id: row.id.clone(),
                column_id: column.id.clone(),
                status: ValidationStatus::from_valid(!is_empty(row.cell(&column.id))),
            })
            .collect();

        let mut reasons = Vec::new();
        let mut children = Vec::new();
        let schemas = field.schema();
        let child_keys = schema_key
            .and_then(|key| schemas?.get(key))
            .map(|schema| schema.children.as_slice())
            .unwrap_or_default();

        for child_key in child_keys {
            let Some(child_schema) = schemas.and_then(|s| s.get(child_key)) else {
                continue;
            };
            if !self.logic.should_show_schema(&field.id, &row.id, child_key) {
                continue;
            }
            let child_rows = row.active_children(child_key);
            if child_schema.required == Some(true) && child_rows.is_empty() {
                reasons.push(format!("Required {} has no rows", child_schema.title.as_deref().unwrap_or(child_key)));
            }
            children.extend(
                child_rows
                    .into_iter()
                    .map(|child| self.validate_row(field, child, &child_schema.table_columns, Some(child_key))),
            );
        }

        let valid = reasons.is_empty()
            && cell_validities.iter().all(|c| c.status.is_valid())
            && children.iter().all(|c| c.status.is_valid());
        RowValidity {
            row_id: row.id.clone(),
            status: ValidationStatus::from_valid(valid),
            cell_validities,
            children,
            reasons,
        }
    }
}

fn is_empty(value: Option<&FieldValue>) -> bool {
    value.map_or(true, FieldValue::is_empty)
}

/// Groups every cell result, nested rows included, by column
fn column_validities(rows: &[RowValidity]) -> Vec<ColumnValidity> {
    fn collect(rows: &[RowValidity], out: &mut BTreeMap<String, Vec<CellValidity>>) {
        for row in rows {
            for cell in &row.cell_validities {
                out.entry(cell.column_id.clone()).or_default().push(cell.clone());
            }
            collect(&row.children, out);
        }
    }

    let mut by_column = BTreeMap::new();
    collect(rows, &mut by_column);
    by_column
        .into_iter()
        .map(|(column_id, cell_validities)| ColumnValidity {
            status: ValidationStatus::from_valid(cell_validities.iter().all(|c| c.status.is_valid())),
            column_id,
            cell_validities,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(doc: &Document, view: &str) -> Validation {
        Validator::new(doc, LogicEvaluator::new(doc, view)).validate()
    }

    fn document(hidden: bool, hidden_views: &[&str]) -> Document {
        Document::from_json(json!({
            "files": [{
                "_id": "file1",
                "pages": [ { "_id": "p1", "fieldPositions": [
                    { "_id": "fp1", "field": "name" },
                    { "_id": "fp2", "field": "optional" }
                ] } ]
            }],
            "fields": [
                { "_id": "name", "type": "text", "required": true, "hidden": hidden, "hiddenViews": hidden_views },
                { "_id": "optional", "type": "text" },
                { "_id": "unplaced", "type": "text", "required": true }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_hidden_required_field_is_valid() {
        assert!(validate(&document(true, &[]), "mobile").is_valid());
        assert!(validate(&document(false, &["mobile"]), "mobile").is_valid());

        let validation = validate(&document(false, &[]), "mobile");
        assert!(!validation.is_valid());
        let invalid: Vec<&str> = validation.invalid_fields().map(|v| v.field_id.as_str()).collect();
        assert_eq!(invalid, vec!["name"]);
        assert_eq!(validation.field_validities.len(), 2);
        assert_eq!(validation.field_validities[0].page_id, "p1");
    }

    #[test]
    fn test_table_rows_and_columns() {
        let doc = Document::from_json(json!({
            "files": [{ "_id": "f", "pages": [ { "_id": "p1", "fieldPositions": [ { "_id": "fp", "field": "t1" } ] } ] }],
            "fields": [{
                "_id": "t1", "type": "table", "required": true,
                "tableColumns": [
                    { "_id": "c1", "type": "text", "required": true },
                    { "_id": "c2", "type": "text", "required": true, "hiddenViews": ["mobile"] },
                    { "_id": "c3", "type": "text" }
                ],
                "value": [
                    { "_id": "r1", "cells": { "c1": "ok" } },
                    { "_id": "r2", "cells": { "c1": "" } },
                    { "_id": "r3", "deleted": true }
                ]
            }]
        }))
        .unwrap();
        let validation = validate(&doc, "mobile");
        let table = &validation.field_validities[0];
        assert_eq!(table.status, ValidationStatus::Invalid);
        assert_eq!(table.row_validities.len(), 2);
        assert!(table.row_validities[0].status.is_valid());
        assert!(!table.row_validities[1].status.is_valid());
        assert_eq!(table.column_validities.len(), 1);
        assert_eq!(table.column_validities[0].column_id, "c1");
    }

    #[test]
    fn test_required_table_without_rows() {
        let doc = Document::from_json(json!({
            "files": [{ "_id": "f", "pages": [ { "_id": "p1", "fieldPositions": [ { "_id": "fp", "field": "t1" } ] } ] }],
            "fields": [ { "_id": "t1", "type": "table", "required": true, "tableColumns": [], "value": [] } ]
        }))
        .unwrap();
        assert!(!validate(&doc, "mobile").is_valid());
    }
}
