//! # Conditional Logic
//!
//! Pure visibility of fields, pages, table columns and nested collection
//! schemas for one active view.
//!
//! ## Resolution order
//!
//! ```text
//! hiddenViews ∋ active view ──────────────▶ hidden
//! no logic ───────────────────────────────▶ !hidden
//! logic without conditions ───────────────▶ shown
//! otherwise: combine conditions (and/or), then
//!   show + hidden        ▶ combined
//!   show + not hidden    ▶ shown
//!   hide + hidden        ▶ hidden
//!   hide + not hidden    ▶ !combined
//! ```
//!
//! Conditions whose source cannot be resolved (no `field`, unknown field,
//! missing column) are dropped before combining. Unknown target ids are
//! visible.

use crate::rows::find_row;
use formdoc_model::{
    Condition, ConditionOp, Document, Field, FieldValue, Logic, LogicAction, LogicEval, Page,
    TableColumn,
};

/// Visibility queries against a document for one active view
#[derive(Debug, Clone, Copy)]
pub struct LogicEvaluator<'a> {
    doc: &'a Document,
    active_view: &'a str,
}

impl<'a> LogicEvaluator<'a> {
    pub fn new(doc: &'a Document, active_view: &'a str) -> Self {
        Self { doc, active_view }
    }

    pub fn active_view(&self) -> &'a str {
        self.active_view
    }

    /// Pages rendered for the active view of the first file
    pub fn pages_for_view(&self) -> &'a [Page] {
        self.doc
            .first_file()
            .map(|file| file.pages_for_view(self.active_view))
            .unwrap_or(&[])
    }

    pub fn should_show_field(&self, field_id: &str) -> bool {
        let Some(field) = self.doc.field(field_id) else {
            return true;
        };
        if self.is_force_hidden(&field.hidden_views) {
            return false;
        }
        resolve(field.hidden, field.logic.as_ref(), |condition| {
            self.field_condition(condition)
        })
    }

    pub fn should_show_page(&self, page_id: &str) -> bool {
        let pages = self.pages_for_view();
        let Some(page) = pages.iter().find(|page| page.id == page_id) else {
            return true;
        };
        // page logic only matters when there is another page to fall back to
        let logic = page.logic.as_ref().filter(|_| pages.len() > 1);
        resolve(page.hidden, logic, |condition| self.field_condition(condition))
    }

    /// Visibility of a table column or collection schema column
    pub fn should_show_column(&self, field_id: &str, column_id: &str) -> bool {
        let Some(column) = self.doc.field(field_id).and_then(|f| find_column(f, column_id)) else {
            return true;
        };
        if self.is_force_hidden(&column.hidden_views) {
            return false;
        }
        resolve(column.hidden, column.logic.as_ref(), |condition| {
            self.field_condition(condition)
        })
    }

    /// Visibility of the `schema_key` child list under row `row_id` of a
    /// collection. Conditions read `(schema, column)` cells of that row.
    pub fn should_show_schema(&self, field_id: &str, row_id: &str, schema_key: &str) -> bool {
        let Some(field) = self.doc.field(field_id) else {
            return true;
        };
        let Some(schema) = field.schema().and_then(|schemas| schemas.get(schema_key)) else {
            return true;
        };
        let row = find_row(field, row_id).map(|(row, _)| row);

        resolve(schema.hidden, schema.logic.as_ref(), |condition| {
            let column = condition.column.as_deref()?;
            condition.schema.as_ref()?;
            let cell = row.and_then(|row| row.cell(column));
            Some(compare_value(cell, condition.condition, condition.value.as_ref()))
        })
    }

    fn is_force_hidden(&self, hidden_views: &[String]) -> bool {
        hidden_views.iter().any(|view| view == self.active_view)
    }

    /// `None` drops the condition: no source field, or an unknown one
    fn field_condition(&self, condition: &Condition) -> Option<bool> {
        let source = self.doc.field(condition.field.as_deref()?)?;
        Some(compare_value(
            source.value.as_ref(),
            condition.condition,
            condition.value.as_ref(),
        ))
    }
}

/// Table column, or a column of any collection schema, by id
pub fn find_column<'a>(field: &'a Field, column_id: &str) -> Option<&'a TableColumn> {
    if let Some(column) = field.table_columns().iter().find(|c| c.id == column_id) {
        return Some(column);
    }
    field
        .schema()?
        .values()
        .flat_map(|schema| schema.table_columns.iter())
        .find(|c| c.id == column_id)
}

fn resolve(
    hidden: Option<bool>,
    logic: Option<&Logic>,
    condition_result: impl Fn(&Condition) -> Option<bool>,
) -> bool {
    let hidden = hidden == Some(true);
    let Some(logic) = logic else {
        return !hidden;
    };
    if logic.conditions().is_empty() {
        return true;
    }

    let combined = || {
        let mut results = logic.conditions().iter().filter_map(&condition_result);
        match logic.eval {
            LogicEval::And => results.all(|matched| matched),
            LogicEval::Or => results.any(|matched| matched),
        }
    };

    match (logic.action, hidden) {
        (LogicAction::Show, true) => combined(),
        (LogicAction::Show, false) => true,
        (LogicAction::Hide, true) => false,
        (LogicAction::Hide, false) => !combined(),
    }
}

/// Evaluates one condition operator against a source value
pub fn compare_value(source: Option<&FieldValue>, op: ConditionOp, expected: Option<&FieldValue>) -> bool {
    let source = source.filter(|value| !value.is_null());
    let expected = expected.filter(|value| !value.is_null());

    match op {
        ConditionOp::Equals => match (source, expected) {
            (None, None) => true,
            (None, Some(_)) | (Some(_), None) => false,
            (Some(FieldValue::Strings(selected)), Some(expected)) => match expected.as_text() {
                Some(text) => selected.iter().any(|s| s == text),
                None => false,
            },
            (Some(source), Some(expected)) => values_equal(source, expected),
        },
        ConditionOp::NotEquals => match (source, expected) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(FieldValue::Strings(selected)), Some(expected)) => match expected.as_text() {
                Some(text) => !selected.iter().any(|s| s == text),
                None => true,
            },
            (Some(source), Some(expected)) => !values_equal(source, expected),
        },
        ConditionOp::Contains => {
            let (Some(source), Some(needle)) = (source, expected.and_then(FieldValue::as_text)) else {
                return false;
            };
            match source {
                FieldValue::Strings(selected) => selected.iter().any(|s| s == needle),
                other => other.as_text().is_some_and(|text| text.contains(needle)),
            }
        }
        ConditionOp::GreaterThan => numbers(source, expected).is_some_and(|(a, b)| a > b),
        ConditionOp::LessThan => numbers(source, expected).is_some_and(|(a, b)| a < b),
        ConditionOp::IsNull => is_null_like(source),
        ConditionOp::IsNotNull => !is_null_like(source),
        ConditionOp::Unknown => false,
    }
}

fn values_equal(source: &FieldValue, expected: &FieldValue) -> bool {
    if let (Some(a), Some(b)) = (source.as_number(), expected.as_number()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (source.as_text(), expected.as_text()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (source.as_bool(), expected.as_bool()) {
        return a == b;
    }
    source == expected
}

fn numbers(source: Option<&FieldValue>, expected: Option<&FieldValue>) -> Option<(f64, f64)> {
    Some((source?.as_number()?, expected?.as_number()?))
}

fn is_null_like(source: Option<&FieldValue>) -> bool {
    match source {
        None => true,
        Some(FieldValue::Number(_)) | Some(FieldValue::Bool(_)) => false,
        Some(FieldValue::Strings(items)) => items.iter().all(String::is_empty),
        Some(other) => other.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(logic: serde_json::Value, hidden: Option<bool>) -> Document {
        let mut target = json!({ "_id": "target", "type": "text", "logic": logic });
        if let Some(hidden) = hidden {
            target["hidden"] = json!(hidden);
        }
        Document::from_json(json!({
            "_id": "d1",
            "files": [{
                "_id": "file1",
                "pages": [
                    { "_id": "p1", "fieldPositions": [] },
                    { "_id": "p2", "hidden": true, "fieldPositions": [],
                      "logic": { "action": "show", "conditions": [ { "field": "source", "condition": "=", "value": "yes" } ] } }
                ]
            }],
            "fields": [
                { "_id": "source", "type": "text", "value": "yes" },
                { "_id": "num", "type": "number", "value": 10 },
                { "_id": "empty", "type": "text" },
                { "_id": "multi", "type": "multiSelect", "value": ["a", "b"] },
                target
            ]
        }))
        .unwrap()
    }

    fn show(logic: serde_json::Value, hidden: Option<bool>) -> bool {
        let doc = document(logic, hidden);
        LogicEvaluator::new(&doc, "mobile").should_show_field("target")
    }

    #[test]
    fn test_no_logic_uses_static_flag() {
        let doc = Document::from_json(json!({
            "fields": [
                { "_id": "a", "type": "text" },
                { "_id": "b", "type": "text", "hidden": true },
                { "_id": "c", "type": "text", "hidden": false, "hiddenViews": ["mobile"] }
            ]
        }))
        .unwrap();
        let logic = LogicEvaluator::new(&doc, "mobile");
        assert!(logic.should_show_field("a"));
        assert!(logic.should_show_field("a"));
        assert!(!logic.should_show_field("b"));
        assert!(!logic.should_show_field("c"));
        assert!(LogicEvaluator::new(&doc, "desktop").should_show_field("c"));
        assert!(logic.should_show_field("unknown"));
    }

    #[test]
    fn test_hide_action() {
        let hide_when = |value: &str| {
            json!({ "action": "hide", "conditions": [ { "field": "source", "condition": "=", "value": value } ] })
        };
        assert!(!show(hide_when("yes"), None));
        assert!(show(hide_when("no"), None));
        assert!(!show(hide_when("no"), Some(true)));
    }

    #[test]
    fn test_show_action_on_hidden_field() {
        let show_when = |value: &str| {
            json!({ "action": "show", "conditions": [ { "field": "source", "condition": "=", "value": value } ] })
        };
        assert!(show(show_when("yes"), Some(true)));
        assert!(!show(show_when("no"), Some(true)));
        assert!(show(show_when("no"), Some(false)));
    }

    #[test]
    fn test_empty_conditions_always_show() {
        assert!(show(json!({ "action": "hide", "conditions": [] }), Some(true)));
        assert!(show(json!({ "action": "hide" }), None));
    }

    #[test]
    fn test_unresolvable_conditions_are_dropped() {
        // the only remaining condition decides
        let logic = json!({ "action": "hide", "eval": "and", "conditions": [
            { "condition": "=", "value": "yes" },
            { "field": "ghost", "condition": "=", "value": "yes" },
            { "field": "source", "condition": "=", "value": "yes" }
        ] });
        assert!(!show(logic, None));

        // nothing left under `or` never matches
        let logic = json!({ "action": "hide", "eval": "or", "conditions": [ { "condition": "=", "value": "x" } ] });
        assert!(show(logic, None));
    }

    #[test]
    fn test_null_sources_keep_targets_visible() {
        for op in [">", "<", "!=", "?="] {
            let logic = json!({ "action": "hide", "conditions": [ { "field": "empty", "condition": op, "value": 1 } ] });
            assert!(show(logic, None), "operator {op}");
        }
    }

    #[test]
    fn test_page_logic() {
        let doc = document(json!(null), None);
        let logic = LogicEvaluator::new(&doc, "mobile");
        assert!(logic.should_show_page("p1"));
        assert!(logic.should_show_page("p2"));
        assert!(logic.should_show_page("nope"));
    }

    #[test]
    fn test_compare_operators() {
        let text = FieldValue::from("hello world");
        let num = FieldValue::from(10.0);
        let multi = FieldValue::Strings(vec!["a".into(), "b".into()]);
        let blank = FieldValue::Strings(vec![String::new()]);

        assert!(compare_value(Some(&text), ConditionOp::Contains, Some(&"world".into())));
        assert!(compare_value(Some(&num), ConditionOp::GreaterThan, Some(&5.0.into())));
        assert!(!compare_value(Some(&num), ConditionOp::LessThan, Some(&5.0.into())));
        assert!(!compare_value(Some(&num), ConditionOp::GreaterThan, None));
        assert!(compare_value(Some(&multi), ConditionOp::Equals, Some(&"b".into())));
        assert!(compare_value(Some(&multi), ConditionOp::NotEquals, Some(&"c".into())));
        assert!(compare_value(Some(&num), ConditionOp::Equals, Some(&FieldValue::Json(json!(10)))));
        assert!(compare_value(None, ConditionOp::Equals, Some(&FieldValue::Json(json!(null)))));
        assert!(!compare_value(Some(&num), ConditionOp::Unknown, Some(&num)));
    }

    #[test]
    fn test_null_operators() {
        let cases = [
            (None, true),
            (Some(FieldValue::from("")), true),
            (Some(FieldValue::Strings(vec![String::new()])), true),
            (Some(FieldValue::Json(json!(null))), true),
            (Some(FieldValue::Rows(Vec::new())), true),
            (Some(FieldValue::from(0.0)), false),
            (Some(FieldValue::from(false)), false),
            (Some(FieldValue::from("x")), false),
        ];
        for (value, null) in cases {
            assert_eq!(compare_value(value.as_ref(), ConditionOp::IsNull, None), null, "{value:?}");
            assert_eq!(compare_value(value.as_ref(), ConditionOp::IsNotNull, None), !null, "{value:?}");
        }
    }

    #[test]
    fn test_schema_logic_reads_parent_row() {
        let doc = Document::from_json(json!({
            "fields": [{
                "_id": "col",
                "type": "collection",
                "schema": {
                    "root": { "root": true, "children": ["child"], "tableColumns": [ { "_id": "t", "type": "text" } ] },
                    "child": { "tableColumns": [], "logic": { "action": "hide", "conditions": [
                        { "schema": "root", "column": "t", "condition": "=", "value": "hide" }
                    ] } }
                },
                "value": [
                    { "_id": "r1", "cells": { "t": "hide" } },
                    { "_id": "r2", "cells": { "t": "keep" } }
                ]
            }]
        }))
        .unwrap();
        let logic = LogicEvaluator::new(&doc, "mobile");
        assert!(!logic.should_show_schema("col", "r1", "child"));
        assert!(logic.should_show_schema("col", "r2", "child"));
        assert!(logic.should_show_schema("col", "r2", "missing"));
    }

    #[test]
    fn test_column_logic() {
        let doc = Document::from_json(json!({
            "fields": [
                { "_id": "x", "type": "text", "value": "on" },
                { "_id": "t1", "type": "table", "tableColumns": [
                    { "_id": "c1", "type": "text", "logic": { "action": "hide", "conditions": [ { "field": "x", "condition": "=", "value": "on" } ] } },
                    { "_id": "c2", "type": "text", "hiddenViews": ["desktop"] }
                ] }
            ]
        }))
        .unwrap();
        let logic = LogicEvaluator::new(&doc, "desktop");
        assert!(!logic.should_show_column("t1", "c1"));
        assert!(!logic.should_show_column("t1", "c2"));
        assert!(logic.should_show_column("t1", "c3"));
    }
}
