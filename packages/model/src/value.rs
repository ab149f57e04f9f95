//! Field values and table/collection rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value stored in a field or in a row cell.
///
/// Absence of a value is modelled with `Option<FieldValue>`; a JSON `null`
/// nested inside a cell map lands in [`FieldValue::Json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(#[serde(serialize_with = "serialize_number")] f64),
    Text(String),
    Strings(Vec<String>),
    Rows(Vec<ValueElement>),
    Json(serde_json::Value),
}

impl FieldValue {
    /// Kind-aware emptiness: empty text, empty array, no active rows, or null.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Strings(items) => items.is_empty(),
            FieldValue::Rows(rows) => !rows.iter().any(ValueElement::is_active),
            FieldValue::Json(json) => match json {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::Object(map) => map.is_empty(),
                _ => false,
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Json(serde_json::Value::Null))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Json(serde_json::Value::String(text)) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Json(json) => json.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Json(json) => json.as_bool(),
            _ => None,
        }
    }

    /// String array view; an empty array decodes as `Strings`.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            FieldValue::Strings(items) => Some(items),
            _ => None,
        }
    }

    /// Row list view, including the empty array case.
    pub fn rows(&self) -> Option<&[ValueElement]> {
        match self {
            FieldValue::Rows(rows) => Some(rows),
            FieldValue::Strings(items) if items.is_empty() => Some(&[]),
            FieldValue::Json(serde_json::Value::Array(items)) if items.is_empty() => Some(&[]),
            _ => None,
        }
    }

    /// Mutable row list. An empty array is promoted to an empty row list so
    /// the first row can be inserted into a freshly created table.
    pub fn rows_mut(&mut self) -> Option<&mut Vec<ValueElement>> {
        let promote = match self {
            FieldValue::Strings(items) => items.is_empty(),
            FieldValue::Json(serde_json::Value::Array(items)) => items.is_empty(),
            _ => false,
        };
        if promote {
            *self = FieldValue::Rows(Vec::new());
        }
        match self {
            FieldValue::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Lossless conversion into a plain JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Converts plain JSON back into the most specific variant.
    pub fn from_json(json: serde_json::Value) -> Self {
        serde_json::from_value(json.clone()).unwrap_or(FieldValue::Json(json))
    }
}

/// Integral numbers are written without a fraction so `1` saves as `1`
fn serialize_number<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<ValueElement>> for FieldValue {
    fn from(rows: Vec<ValueElement>) -> Self {
        FieldValue::Rows(rows)
    }
}

/// Nested row list stored under a schema key of a parent row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Children {
    #[serde(default)]
    pub value: Vec<ValueElement>,
}

/// One row of a table or collection field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueElement {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cells: BTreeMap<String, FieldValue>,

    /// Soft-delete marker; tombstoned rows keep their id and position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Children>,

    /// Unknown row attributes, preserved on save.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ValueElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_cell(mut self, column_id: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.cells.insert(column_id.into(), value.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.deleted != Some(true)
    }

    pub fn cell(&self, column_id: &str) -> Option<&FieldValue> {
        self.cells.get(column_id)
    }

    /// Active rows of a nested schema, in stored order.
    pub fn active_children(&self, schema_key: &str) -> Vec<&ValueElement> {
        self.children
            .get(schema_key)
            .map(|c| c.value.iter().filter(|row| row.is_active()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_untagged_decoding() {
        let v: FieldValue = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(v, FieldValue::Text("hello".into()));

        let v: FieldValue = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(v.as_number(), Some(4.0));

        let v: FieldValue = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(v.as_strings().map(|s| s.len()), Some(2));

        let v: FieldValue = serde_json::from_value(json!([
            { "_id": "r1", "cells": { "c1": "x" } }
        ]))
        .unwrap();
        assert_eq!(v.rows().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_empty_array_is_empty_row_list() {
        let mut v: FieldValue = serde_json::from_value(json!([])).unwrap();
        assert!(v.is_empty());
        assert_eq!(v.rows().map(|r| r.len()), Some(0));

        v.rows_mut().unwrap().push(ValueElement::new("r1"));
        assert!(matches!(v, FieldValue::Rows(ref rows) if rows.len() == 1));
    }

    #[test]
    fn test_rows_with_only_tombstones_are_empty() {
        let mut row = ValueElement::new("r1");
        row.deleted = Some(true);
        assert!(FieldValue::Rows(vec![row]).is_empty());
    }

    #[test]
    fn test_unknown_row_keys_survive() {
        let json = json!({ "_id": "r1", "cells": {}, "customKey": 7 });
        let row: ValueElement = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(row.extra.get("customKey"), Some(&json!(7)));
        assert_eq!(serde_json::to_value(&row).unwrap(), json!({ "_id": "r1", "customKey": 7 }));
    }

    #[test]
    fn test_integral_numbers_save_without_fraction() {
        assert_eq!(FieldValue::Number(1.0).to_json(), json!(1));
        assert_eq!(FieldValue::Number(-3.0).to_json(), json!(-3));
        assert_eq!(FieldValue::Number(2.5).to_json(), json!(2.5));

        let row: ValueElement = serde_json::from_value(json!({ "_id": "r1", "cells": { "qty": 1 } })).unwrap();
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"_id":"r1","cells":{"qty":1}}"#
        );
    }

    #[test]
    fn test_nested_children_decode() {
        let row: ValueElement = serde_json::from_value(json!({
            "_id": "r1",
            "cells": {},
            "children": {
                "schemaA": { "value": [ { "_id": "c1" }, { "_id": "c2", "deleted": true } ] }
            }
        }))
        .unwrap();
        assert_eq!(row.active_children("schemaA").len(), 1);
        assert!(row.active_children("missing").is_empty());
    }
}
