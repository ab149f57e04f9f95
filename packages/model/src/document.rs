//! Document tree: files, views, pages and field positions.

use crate::error::{ModelError, ModelResult};
use crate::field::Field;
use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPosition {
    #[serde(rename = "_id")]
    pub id: String,

    /// Id of the positioned field.
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,

    /// Layout attributes (x, y, width, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,

    #[serde(default)]
    pub field_positions: Vec<FieldPosition>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Page {
    pub fn positions_of<'a>(&'a self, field_id: &'a str) -> impl Iterator<Item = &'a FieldPosition> {
        self.field_positions.iter().filter(move |p| p.field == field_id)
    }
}

/// Alternate per-device layout of a file's pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(rename = "type")]
    pub view_type: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_order: Vec<String>,

    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_order: Vec<String>,

    #[serde(default)]
    pub pages: Vec<Page>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<View>,
}

impl File {
    pub fn view(&self, view_type: &str) -> Option<&View> {
        self.views.iter().find(|v| v.view_type == view_type)
    }

    /// Pages rendered for a view, falling back to the file's own pages when
    /// the view is absent or empty.
    pub fn pages_for_view(&self, view_type: &str) -> &[Page] {
        match self.view(view_type) {
            Some(view) if !view.pages.is_empty() => &view.pages,
            _ => &self.pages,
        }
    }

    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    /// Pages in `pageOrder`, then any unlisted pages in stored order.
    pub fn ordered_pages(&self) -> Vec<&Page> {
        let mut ordered: Vec<&Page> = self
            .page_order
            .iter()
            .filter_map(|id| self.page(id))
            .collect();
        ordered.extend(self.pages.iter().filter(|p| !self.page_order.contains(&p.id)));
        ordered
    }
}

/// Named expression referenced by fields through `formulas[].formula`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub formula_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    pub expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub files: Vec<File>,

    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formulas: Vec<Formula>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Document {
    pub fn from_json_str(source: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_json(value: serde_json::Value) -> ModelResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_string(&self, pretty: bool) -> ModelResult<String> {
        let out = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(out)
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn field_mut(&mut self, field_id: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == field_id)
    }

    pub fn field_by_identifier(&self, identifier: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.identifier.as_deref() == Some(identifier))
    }

    pub fn formula(&self, formula_id: &str) -> Option<&Formula> {
        self.formulas.iter().find(|f| f.id == formula_id)
    }

    pub fn first_file(&self) -> Option<&File> {
        self.files.first()
    }

    /// Checks that every field position points at an existing field.
    pub fn check_integrity(&self) -> ModelResult<()> {
        let known: HashSet<&str> = self.fields.iter().map(|f| f.id.as_str()).collect();
        let pages = self.files.iter().flat_map(|file| {
            file.pages
                .iter()
                .chain(file.views.iter().flat_map(|v| v.pages.iter()))
        });

        for page in pages {
            if let Some(position) = page
                .field_positions
                .iter()
                .find(|p| !known.contains(p.field.as_str()))
            {
                return Err(ModelError::dangling_position(&page.id, &position.id, &position.field));
            }
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.fields.iter().find(|f| !seen.insert(f.id.as_str())) {
            return Err(ModelError::DuplicateFieldId(dup.id.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "_id": "doc1",
            "identifier": "doc_1",
            "files": [{
                "_id": "file1",
                "pageOrder": ["p2", "p1"],
                "pages": [
                    { "_id": "p1", "fieldPositions": [ { "_id": "fp1", "field": "f1", "type": "text", "x": 0 } ] },
                    { "_id": "p2", "fieldPositions": [] }
                ],
                "views": [ { "_id": "v1", "type": "mobile", "pageOrder": ["p1"], "pages": [] } ]
            }],
            "fields": [ { "_id": "f1", "identifier": "name", "type": "text", "value": "Ann" } ],
            "formulas": [ { "_id": "fx", "expression": "1 + 1" } ]
        })
    }

    #[test]
    fn test_document_lookups() {
        let doc = Document::from_json(sample()).unwrap();
        assert!(doc.field("f1").is_some());
        assert_eq!(doc.field_by_identifier("name").map(|f| f.id.as_str()), Some("f1"));
        assert_eq!(doc.formula("fx").map(|f| f.expression.as_str()), Some("1 + 1"));

        let file = doc.first_file().unwrap();
        let order: Vec<_> = file.ordered_pages().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["p2", "p1"]);
        // empty mobile view falls back to the file pages
        assert_eq!(file.pages_for_view("mobile").len(), 2);
    }

    #[test]
    fn test_layout_attributes_preserved() {
        let doc = Document::from_json(sample()).unwrap();
        let out = serde_json::to_value(&doc).unwrap();
        assert_eq!(out["files"][0]["pages"][0]["fieldPositions"][0]["x"], json!(0));
    }

    #[test]
    fn test_absent_page_order_is_not_written() {
        let raw = json!({
            "_id": "doc2",
            "files": [{ "_id": "file1", "pages": [ { "_id": "p1", "fieldPositions": [] } ] }],
            "fields": [ { "_id": "n1", "type": "number", "value": 1 } ]
        });
        let doc = Document::from_json(raw.clone()).unwrap();
        let out = serde_json::to_value(&doc).unwrap();
        assert!(out["files"][0].get("pageOrder").is_none());
        assert_eq!(out["fields"][0]["value"], json!(1));
        assert_eq!(out["files"], raw["files"]);
    }

    #[test]
    fn test_integrity_detects_dangling_position() {
        let mut raw = sample();
        raw["fields"] = json!([]);
        let doc = Document::from_json(raw).unwrap();
        assert!(matches!(
            doc.check_integrity(),
            Err(ModelError::DanglingFieldPosition { .. })
        ));
    }

    #[test]
    fn test_integrity_ok() {
        let doc = Document::from_json(sample()).unwrap();
        assert!(doc.check_integrity().is_ok());
    }
}
