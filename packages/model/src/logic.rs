//! Conditional show/hide rules attached to pages, fields, columns and schemas.

use crate::value::FieldValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicAction {
    #[default]
    Show,
    Hide,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicEval {
    #[default]
    And,
    Or,
}

/// Comparison operator of a condition, keyed by its wire code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "?=")]
    Contains,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "null=")]
    IsNull,
    #[serde(rename = "*=")]
    IsNotNull,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single comparison against a field value or a `(schema, column)` cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    /// Source field id for field and page logic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Schema key whose parent row holds the source cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Source column id for column and schema logic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    #[serde(default)]
    pub condition: ConditionOp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

impl Condition {
    pub fn on_field(field_id: impl Into<String>, op: ConditionOp, value: Option<FieldValue>) -> Self {
        Self {
            field: Some(field_id.into()),
            condition: op,
            value,
            ..Default::default()
        }
    }

    pub fn on_column(
        schema: impl Into<String>,
        column: impl Into<String>,
        op: ConditionOp,
        value: Option<FieldValue>,
    ) -> Self {
        Self {
            schema: Some(schema.into()),
            column: Some(column.into()),
            condition: op,
            value,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Logic {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub action: LogicAction,

    #[serde(default)]
    pub eval: LogicEval,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

impl Logic {
    pub fn new(action: LogicAction, eval: LogicEval, conditions: Vec<Condition>) -> Self {
        Self {
            id: None,
            action,
            eval,
            conditions: Some(conditions),
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        self.conditions.as_deref().unwrap_or(&[])
    }

    pub fn conditions_mut(&mut self) -> Option<&mut Vec<Condition>> {
        self.conditions.as_mut()
    }

    /// Field ids referenced by this logic's conditions.
    pub fn source_fields(&self) -> impl Iterator<Item = &str> {
        self.conditions().iter().filter_map(|c| c.field.as_deref())
    }
}
