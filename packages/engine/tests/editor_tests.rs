//! Visibility, duplication, validation and formulas through the editor

use formdoc_engine::{
    evaluate_expression, DocumentEditor, EditorConfig, NavigationStatus, RowPath, ValidationStatus,
};
use formdoc_formula::Value;
use formdoc_model::{Change, Document, FieldValue};
use serde_json::json;

fn inspection() -> Document {
    Document::from_json(json!({
        "_id": "doc1",
        "identifier": "inspection",
        "files": [{
            "_id": "file1",
            "pageOrder": ["p1", "p2"],
            "pages": [
                { "_id": "p1", "fieldPositions": [
                    { "_id": "fp1", "field": "answer" },
                    { "_id": "fp2", "field": "defects" },
                    { "_id": "fp3", "field": "comment" },
                    { "_id": "fp4", "field": "count" }
                ] },
                { "_id": "p2", "fieldPositions": [ { "_id": "fp5", "field": "answer" } ] }
            ],
            "views": [ { "_id": "v1", "type": "mobile", "pageOrder": ["p1", "p2"], "pages": [
                { "_id": "p1", "fieldPositions": [
                    { "_id": "fp1", "field": "answer" },
                    { "_id": "fp2", "field": "defects" },
                    { "_id": "fp3", "field": "comment" },
                    { "_id": "fp4", "field": "count" }
                ] },
                { "_id": "p2", "fieldPositions": [ { "_id": "fp5", "field": "answer" } ] }
            ] } ]
        }],
        "fields": [
            { "_id": "answer", "identifier": "answer", "type": "text" },
            { "_id": "defects", "identifier": "defects", "type": "table",
              "tableColumns": [
                  { "_id": "desc", "type": "text", "title": "Description", "required": true, "hidden": true,
                    "logic": { "action": "show", "conditions": [
                        { "page": "p1", "field": "comment", "condition": "=", "value": "detail" }
                    ] } },
                  { "_id": "plain", "type": "text" }
              ],
              "value": [ { "_id": "r1", "cells": {} } ],
              "logic": { "action": "hide", "conditions": [
                  { "page": "p1", "field": "comment", "condition": "=", "value": "none" }
              ] } },
            { "_id": "comment", "identifier": "comment", "type": "text", "required": true, "hidden": true,
              "logic": { "action": "show", "eval": "or", "conditions": [
                  { "field": "answer", "condition": "=", "value": "no" },
                  { "field": "answer", "condition": "null=" }
              ] } },
            { "_id": "count", "identifier": "count", "type": "number",
              "formulas": [ { "formula": "fx_count" } ] }
        ],
        "formulas": [ { "_id": "fx_count", "expression": "length(defects)" } ]
    }))
    .unwrap()
}

fn editor() -> DocumentEditor {
    DocumentEditor::new(inspection(), EditorConfig::default()).unwrap()
}

#[test]
fn test_hidden_views_always_win() {
    let mut doc = inspection();
    doc.field_mut("answer").unwrap().hidden_views = vec!["mobile".to_string()];
    let mobile = DocumentEditor::new(doc.clone(), EditorConfig::default()).unwrap();
    assert!(!mobile.should_show_field("answer"));

    let desktop = DocumentEditor::new(doc, EditorConfig::default().with_active_view("desktop")).unwrap();
    assert!(desktop.should_show_field("answer"));
}

#[test]
fn test_is_null_and_or_logic() {
    let mut editor = editor();
    assert!(editor.should_show_field("comment"));

    editor.update_value("answer", Some(FieldValue::from("yes"))).unwrap();
    assert!(!editor.should_show_field("comment"));

    editor.update_value("answer", Some(FieldValue::from(""))).unwrap();
    assert!(editor.should_show_field("comment"));

    editor.update_value("answer", Some(FieldValue::from("no"))).unwrap();
    assert!(editor.should_show_field("comment"));
}

#[test]
fn test_refresh_reports_owner_once() {
    let mut editor = editor();
    let report = editor.apply_changes(&[Change::field_update("comment", Some(FieldValue::from("detail")))]);
    // the column condition flips; the table's own hide condition does not
    assert_eq!(report.refreshed, vec!["defects".to_string()]);

    let report = editor.apply_changes(&[Change::field_update("comment", Some(FieldValue::from("none")))]);
    assert_eq!(report.refreshed, vec!["defects".to_string()]);
    assert!(!editor.should_show_field("defects"));
    assert!(!editor.should_show_column("defects", "desc"));
}

#[test]
fn test_required_hidden_field_is_valid() {
    let mut editor = editor();
    editor.update_value("answer", Some(FieldValue::from("yes"))).unwrap();
    let validation = editor.validate();
    assert_eq!(validation.status, ValidationStatus::Valid);

    editor.update_value("answer", Some(FieldValue::from("no"))).unwrap();
    let validation = editor.validate();
    assert_eq!(validation.status, ValidationStatus::Invalid);
    let invalid: Vec<&str> = validation.invalid_fields().map(|v| v.field_id.as_str()).collect();
    assert_eq!(invalid, vec!["comment"]);
}

#[test]
fn test_validation_report_serializes_camel_case() {
    let editor = editor();
    let json = serde_json::to_value(editor.validate()).unwrap();
    assert_eq!(json["status"], "invalid");
    assert_eq!(json["fieldValidities"][2]["fieldId"], "comment");
    assert_eq!(json["fieldValidities"][2]["pageId"], "p1");
}

#[test]
fn test_duplicate_page_remaps_column_logic() {
    let mut editor = editor();
    let new_page = editor.duplicate_page("p1").unwrap();
    let doc = editor.document();

    let copied_positions = &doc.files[0].page(&new_page).unwrap().field_positions;
    let copied_table_id = &copied_positions[1].field;
    let copied_comment_id = &copied_positions[2].field;
    assert_ne!(copied_table_id, "defects");
    // shared with p2, so referenced rather than copied
    assert_eq!(copied_positions[0].field, "answer");

    let table = doc.field(copied_table_id).unwrap();
    let column_logic = table.table_columns()[0].logic.as_ref().unwrap();
    assert_eq!(column_logic.conditions()[0].field.as_ref(), Some(copied_comment_id));
    assert_eq!(column_logic.conditions()[0].page.as_deref(), Some(new_page.as_str()));
    assert!(table.table_columns()[1].logic.is_none());

    let original = doc.field("defects").unwrap();
    let original_logic = original.table_columns()[0].logic.as_ref().unwrap();
    assert_eq!(original_logic.conditions()[0].field.as_deref(), Some("comment"));

    let view = &doc.files[0].views[0];
    assert_eq!(view.page_order, vec!["p1".to_string(), new_page.clone(), "p2".to_string()]);
    assert_eq!(editor.goto(&new_page), NavigationStatus::Success);
}

#[test]
fn test_formulas_follow_row_changes() {
    let mut editor = editor();
    assert_eq!(editor.value_of_identifier("count").and_then(FieldValue::as_number), Some(1.0));

    let path = RowPath::root("defects");
    editor.insert_row_at_end(&path).unwrap();
    editor.insert_row_at_end(&path).unwrap();
    assert_eq!(editor.value_of_identifier("count").and_then(FieldValue::as_number), Some(3.0));

    editor.delete_rows(&path, &["r1".to_string()]).unwrap();
    assert_eq!(editor.value_of_identifier("count").and_then(FieldValue::as_number), Some(2.0));
}

#[test]
fn test_formula_edge_values() {
    let doc = inspection();
    assert_eq!(evaluate_expression(&doc, "5 / 0").unwrap(), Value::Null);
    assert_eq!(evaluate_expression(&doc, "1 == \"1\"").unwrap(), Value::Boolean(false));
    assert_eq!(evaluate_expression(&doc, "null == null").unwrap(), Value::Boolean(true));
}

#[test]
fn test_goto_row_paths() {
    let mut editor = editor();
    assert_eq!(editor.goto("p1/fp2/r1"), NavigationStatus::Success);
    assert_eq!(editor.current_target().and_then(|t| t.row_id.as_deref()), Some("r1"));

    assert_eq!(editor.goto("p1/fp2/missing"), NavigationStatus::Failure);
    assert_eq!(editor.current_target().and_then(|t| t.row_id.as_deref()), Some("r1"));
}

#[test]
fn test_delete_page_strips_conditions() {
    let mut editor = editor();
    assert!(editor.can_delete_page("p1").can_delete);
    editor.delete_page("p1").unwrap();

    let doc = editor.document();
    assert!(doc.field("defects").is_none());
    assert!(doc.field("comment").is_none());
    assert!(doc.field("answer").is_some());
    assert_eq!(doc.files[0].views[0].page_order, vec!["p2".to_string()]);

    let check = editor.can_delete_page("p2");
    assert!(!check.can_delete);
    assert!(!check.warnings.is_empty());
}
