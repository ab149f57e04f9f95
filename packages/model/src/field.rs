//! Fields: the addressable value slots of a document.

use crate::logic::Logic;
use crate::value::{FieldValue, ValueElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hidden_views: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,
}

/// Shape of one nesting level of a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub root: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,

    /// Keys of the schemas nested under rows of this schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    #[serde(default)]
    pub table_columns: Vec<TableColumn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Kind-specific part of a field, discriminated by the `type` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Date,
    Dropdown {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
    MultiSelect {
        #[serde(default)]
        options: Vec<FieldOption>,
    },
    Table {
        #[serde(rename = "tableColumns", default)]
        table_columns: Vec<TableColumn>,

        #[serde(rename = "rowOrder", default, skip_serializing_if = "Option::is_none")]
        row_order: Option<Vec<String>>,
    },
    Collection {
        #[serde(default)]
        schema: BTreeMap<String, Schema>,

        #[serde(rename = "rowOrder", default, skip_serializing_if = "Option::is_none")]
        row_order: Option<Vec<String>>,
    },
    Chart,
    Image,
    Signature,
    Block,
    RichText,
    #[serde(other)]
    Unknown,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Dropdown { .. } => "dropdown",
            FieldKind::MultiSelect { .. } => "multiSelect",
            FieldKind::Table { .. } => "table",
            FieldKind::Collection { .. } => "collection",
            FieldKind::Chart => "chart",
            FieldKind::Image => "image",
            FieldKind::Signature => "signature",
            FieldKind::Block => "block",
            FieldKind::RichText => "richText",
            FieldKind::Unknown => "unknown",
        }
    }
}

/// Binding of a document formula to a field attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedFormula {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Id of the document formula to evaluate.
    pub formula: String,

    /// Written attribute, `"value"` for all supported bindings.
    #[serde(default = "default_formula_key")]
    pub key: String,
}

fn default_formula_key() -> String {
    "value".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub kind: FieldKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hidden_views: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formulas: Vec<AppliedFormula>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Field {
    pub fn new(id: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            identifier: None,
            title: None,
            kind,
            value: None,
            required: None,
            hidden: None,
            hidden_views: Vec::new(),
            logic: None,
            formulas: Vec::new(),
            file: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_logic(mut self, logic: Logic) -> Self {
        self.logic = Some(logic);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required == Some(true)
    }

    pub fn is_row_container(&self) -> bool {
        matches!(self.kind, FieldKind::Table { .. } | FieldKind::Collection { .. })
    }

    pub fn table_columns(&self) -> &[TableColumn] {
        match &self.kind {
            FieldKind::Table { table_columns, .. } => table_columns,
            _ => &[],
        }
    }

    pub fn table_columns_mut(&mut self) -> Option<&mut Vec<TableColumn>> {
        match &mut self.kind {
            FieldKind::Table { table_columns, .. } => Some(table_columns),
            _ => None,
        }
    }

    pub fn schema(&self) -> Option<&BTreeMap<String, Schema>> {
        match &self.kind {
            FieldKind::Collection { schema, .. } => Some(schema),
            _ => None,
        }
    }

    pub fn schema_mut(&mut self) -> Option<&mut BTreeMap<String, Schema>> {
        match &mut self.kind {
            FieldKind::Collection { schema, .. } => Some(schema),
            _ => None,
        }
    }

    /// Key and definition of the collection's root schema.
    pub fn root_schema(&self) -> Option<(&str, &Schema)> {
        self.schema()?
            .iter()
            .find(|(_, schema)| schema.root)
            .map(|(key, schema)| (key.as_str(), schema))
    }

    pub fn options(&self) -> &[FieldOption] {
        match &self.kind {
            FieldKind::Dropdown { options } | FieldKind::MultiSelect { options } => options,
            _ => &[],
        }
    }

    pub fn row_order(&self) -> Option<&Vec<String>> {
        match &self.kind {
            FieldKind::Table { row_order, .. } | FieldKind::Collection { row_order, .. } => {
                row_order.as_ref()
            }
            _ => None,
        }
    }

    pub fn row_order_mut(&mut self) -> Option<&mut Option<Vec<String>>> {
        match &mut self.kind {
            FieldKind::Table { row_order, .. } | FieldKind::Collection { row_order, .. } => {
                Some(row_order)
            }
            _ => None,
        }
    }

    /// Active top-level rows. `rowOrder` decides the order; rows missing
    /// from it follow in stored order.
    pub fn active_rows(&self) -> Vec<&ValueElement> {
        let rows = match self.value.as_ref().and_then(FieldValue::rows) {
            Some(rows) => rows,
            None => return Vec::new(),
        };

        let Some(order) = self.row_order() else {
            return rows.iter().filter(|row| row.is_active()).collect();
        };

        let mut ordered: Vec<&ValueElement> = order
            .iter()
            .filter_map(|id| rows.iter().find(|row| &row.id == id))
            .filter(|row| row.is_active())
            .collect();
        ordered.extend(
            rows.iter()
                .filter(|row| row.is_active() && !order.contains(&row.id)),
        );
        ordered
    }

    /// Column title lookup, used by formulas addressing cells by name.
    pub fn column_for_title(&self, title: &str) -> Option<&TableColumn> {
        let needle = title.to_lowercase();
        let matches = |column: &&TableColumn| {
            column.title.as_deref().map(str::to_lowercase).as_deref() == Some(needle.as_str())
        };
        if let Some(column) = self.table_columns().iter().find(matches) {
            return Some(column);
        }
        self.schema()?
            .values()
            .flat_map(|schema| schema.table_columns.iter())
            .find(matches)
    }
}
