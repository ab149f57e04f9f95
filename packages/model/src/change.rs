//! Change records: serializable mutations exchanged with the outside world.
//!
//! A change names the field it touches and carries a `target` verb with its
//! `change` payload. Row verbs address nested row lists through an explicit
//! `parentPath` of `(rowId, schemaId)` hops.

use crate::value::{FieldValue, ValueElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeTarget {
    #[serde(rename = "field.update")]
    FieldUpdate,
    #[serde(rename = "field.value.rowCreate")]
    RowCreate,
    #[serde(rename = "field.value.rowUpdate")]
    RowUpdate,
    #[serde(rename = "field.value.rowDelete")]
    RowDelete,
    #[serde(rename = "field.value.rowMove")]
    RowMove,
    #[serde(rename = "field.create")]
    FieldCreate,
    #[serde(rename = "page.create")]
    PageCreate,
    #[serde(rename = "page.delete")]
    PageDelete,
    #[serde(other)]
    Unknown,
}

impl ChangeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTarget::FieldUpdate => "field.update",
            ChangeTarget::RowCreate => "field.value.rowCreate",
            ChangeTarget::RowUpdate => "field.value.rowUpdate",
            ChangeTarget::RowDelete => "field.value.rowDelete",
            ChangeTarget::RowMove => "field.value.rowMove",
            ChangeTarget::FieldCreate => "field.create",
            ChangeTarget::PageCreate => "page.create",
            ChangeTarget::PageDelete => "page.delete",
            ChangeTarget::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ChangeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hop from a row list into the nested list of one of its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathHop {
    pub row_id: String,
    pub schema_id: String,
}

impl PathHop {
    pub fn new(row_id: impl Into<String>, schema_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            schema_id: schema_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdatePayload {
    #[serde(default)]
    pub value: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowCreatePayload {
    pub row: ValueElement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_row_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_path: Vec<PathHop>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowCells {
    #[serde(default)]
    pub cells: BTreeMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowUpdatePayload {
    pub row_id: String,
    #[serde(default)]
    pub row: RowCells,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_path: Vec<PathHop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDeletePayload {
    pub row_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_path: Vec<PathHop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowMovePayload {
    pub row_id: String,
    pub target_row_index: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_path: Vec<PathHop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_position_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<String>,

    #[serde(default = "default_version")]
    pub v: u32,

    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<i64>,

    pub target: ChangeTarget,

    #[serde(default)]
    pub change: serde_json::Value,
}

fn default_version() -> u32 {
    1
}

impl Change {
    pub fn new(target: ChangeTarget, field_id: Option<String>, change: serde_json::Value) -> Self {
        Self {
            id: None,
            identifier: None,
            file_id: None,
            page_id: None,
            field_id,
            field_identifier: None,
            field_position_id: None,
            view_id: None,
            view_type: None,
            sdk: None,
            v: default_version(),
            created_on: Some(chrono::Utc::now().timestamp_millis()),
            target,
            change,
        }
    }

    pub fn field_update(field_id: impl Into<String>, value: Option<FieldValue>) -> Self {
        let payload = FieldUpdatePayload { value };
        Self::new(ChangeTarget::FieldUpdate, Some(field_id.into()), to_payload(&payload))
    }

    pub fn row_create(
        field_id: impl Into<String>,
        row: ValueElement,
        target_row_index: Option<usize>,
        parent_path: Vec<PathHop>,
    ) -> Self {
        let payload = RowCreatePayload { row, target_row_index, parent_path };
        Self::new(ChangeTarget::RowCreate, Some(field_id.into()), to_payload(&payload))
    }

    pub fn row_update(
        field_id: impl Into<String>,
        row_id: impl Into<String>,
        cells: BTreeMap<String, FieldValue>,
        parent_path: Vec<PathHop>,
    ) -> Self {
        let payload = RowUpdatePayload {
            row_id: row_id.into(),
            row: RowCells { cells },
            parent_path,
        };
        Self::new(ChangeTarget::RowUpdate, Some(field_id.into()), to_payload(&payload))
    }

    pub fn row_delete(
        field_id: impl Into<String>,
        row_id: impl Into<String>,
        parent_path: Vec<PathHop>,
    ) -> Self {
        let payload = RowDeletePayload { row_id: row_id.into(), parent_path };
        Self::new(ChangeTarget::RowDelete, Some(field_id.into()), to_payload(&payload))
    }

    pub fn row_move(
        field_id: impl Into<String>,
        row_id: impl Into<String>,
        target_row_index: usize,
        parent_path: Vec<PathHop>,
    ) -> Self {
        let payload = RowMovePayload {
            row_id: row_id.into(),
            target_row_index,
            parent_path,
        };
        Self::new(ChangeTarget::RowMove, Some(field_id.into()), to_payload(&payload))
    }

    /// Decodes the verb payload into its typed shape.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.change.clone())
    }
}

fn to_payload<T: Serialize>(payload: &T) -> serde_json::Value {
    serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)
}
