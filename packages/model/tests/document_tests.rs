use formdoc_model::{ConditionOp, Document, FieldKind, FieldValue, LogicAction};
use serde_json::json;

fn collection_document() -> serde_json::Value {
    json!({
        "_id": "doc1",
        "identifier": "doc_collection",
        "name": "Inspection",
        "files": [{
            "_id": "file1",
            "pageOrder": ["page1"],
            "pages": [{
                "_id": "page1",
                "name": "Page 1",
                "fieldPositions": [
                    { "_id": "fp1", "field": "collection1", "type": "collection", "displayType": "original" },
                    { "_id": "fp2", "field": "status", "type": "dropdown" }
                ]
            }],
            "views": []
        }],
        "fields": [
            {
                "_id": "status",
                "identifier": "status",
                "type": "dropdown",
                "options": [ { "_id": "o1", "value": "Yes" }, { "_id": "o2", "value": "No" } ],
                "value": "o1"
            },
            {
                "_id": "collection1",
                "identifier": "collection1",
                "type": "collection",
                "required": true,
                "rowOrder": ["r1"],
                "schema": {
                    "collectionSchemaId": {
                        "title": "Main",
                        "root": true,
                        "children": ["schemaDepth2"],
                        "tableColumns": [ { "_id": "text1", "type": "text", "title": "Text" } ]
                    },
                    "schemaDepth2": {
                        "title": "Depth 2",
                        "required": true,
                        "tableColumns": [ { "_id": "num1", "type": "number", "title": "Amount" } ],
                        "logic": {
                            "action": "hide",
                            "eval": "and",
                            "conditions": [
                                { "schema": "collectionSchemaId", "column": "text1", "condition": "=", "value": "hide" }
                            ]
                        }
                    }
                },
                "value": [{
                    "_id": "r1",
                    "cells": { "text1": "hello" },
                    "children": {
                        "schemaDepth2": { "value": [ { "_id": "c1", "cells": { "num1": 3 } } ] }
                    }
                }]
            }
        ]
    })
}

#[test]
fn test_collection_document_loads() {
    let doc = Document::from_json(collection_document()).unwrap();
    doc.check_integrity().unwrap();

    let collection = doc.field("collection1").unwrap();
    assert!(matches!(collection.kind, FieldKind::Collection { .. }));
    assert!(collection.is_required());

    let schema = collection.schema().unwrap();
    let depth2 = &schema["schemaDepth2"];
    let logic = depth2.logic.as_ref().unwrap();
    assert_eq!(logic.action, LogicAction::Hide);
    assert_eq!(logic.conditions()[0].condition, ConditionOp::Equals);
    assert_eq!(logic.conditions()[0].schema.as_deref(), Some("collectionSchemaId"));

    let rows = collection.active_rows();
    assert_eq!(rows.len(), 1);
    let nested = rows[0].active_children("schemaDepth2");
    assert_eq!(nested[0].cell("num1").and_then(FieldValue::as_number), Some(3.0));
}

#[test]
fn test_document_survives_save_and_reload() {
    let doc = Document::from_json(collection_document()).unwrap();
    let saved = doc.to_json_string(true).unwrap();
    let reloaded = Document::from_json_str(&saved).unwrap();
    assert_eq!(doc, reloaded);
}

#[test]
fn test_dropdown_options() {
    let doc = Document::from_json(collection_document()).unwrap();
    let status = doc.field_by_identifier("status").unwrap();
    assert_eq!(status.options().len(), 2);
    assert_eq!(status.value.as_ref().and_then(FieldValue::as_text), Some("o1"));
}
