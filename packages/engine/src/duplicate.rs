//! # Page duplication
//!
//! Clones a page and the fields placed only on it, then rewrites the logic
//! of the copies so their conditions point at the copied fields.
//!
//! ```text
//! page p1 ─ fp ─▶ field a (only on p1)   ──copy──▶ page p1' ─ fp' ─▶ field a'
//!         └ fp ─▶ field s (shared)                          └ fp' ─▶ field s
//!
//! a'.logic / a'.tableColumns[].logic / a'.schema[].tableColumns[].logic
//!   condition.field == a  ──▶  a'
//! ```
//!
//! Shared fields are referenced, not copied, so conditions on them stay as
//! they are. Logic outside the copied subtree is left alone.

use crate::errors::{EditorError, EditorResult};
use formdoc_model::{Change, ChangeTarget, Document, Field, IDGenerator, Logic, Page};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, instrument};

/// Result of a page duplication
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicatedPage {
    pub page_id: String,
    /// Original field id → copied field id
    pub field_ids: BTreeMap<String, String>,
    pub changes: Vec<Change>,
}

/// Field ids positioned on `page_id` and on no other page or view page
pub fn exclusive_fields(doc: &Document, page_id: &str) -> Vec<String> {
    let mut on_page = Vec::new();
    let mut elsewhere = HashSet::new();

    for file in &doc.files {
        let pages = file.pages.iter().chain(file.views.iter().flat_map(|v| v.pages.iter()));
        for page in pages {
            for position in &page.field_positions {
                if page.id == page_id {
                    if !on_page.contains(&position.field) {
                        on_page.push(position.field.clone());
                    }
                } else {
                    elsewhere.insert(position.field.as_str());
                }
            }
        }
    }

    on_page.retain(|id| !elsewhere.contains(id.as_str()));
    on_page
}

#[instrument(skip(doc, ids))]
pub fn duplicate_page(doc: &mut Document, page_id: &str, ids: &mut IDGenerator) -> EditorResult<DuplicatedPage> {
    let file_index = doc
        .files
        .iter()
        .position(|file| file.page(page_id).is_some())
        .ok_or_else(|| EditorError::PageNotFound(page_id.to_string()))?;

    let new_page_id = ids.new_id();
    let field_ids: BTreeMap<String, String> = exclusive_fields(doc, page_id)
        .into_iter()
        .map(|id| (id, ids.new_id()))
        .collect();

    let mut changes = Vec::new();

    // copied fields land right after their originals
    for (old_id, new_id) in &field_ids {
        let Some(index) = doc.fields.iter().position(|f| &f.id == old_id) else {
            continue;
        };
        let mut copy = doc.fields[index].clone();
        copy.id = new_id.clone();
        remap_field_logic(&mut copy, &field_ids, page_id, &new_page_id);
        changes.push(Change::new(
            ChangeTarget::FieldCreate,
            Some(new_id.clone()),
            serde_json::to_value(&copy).unwrap_or_default(),
        ));
        doc.fields.insert(index + 1, copy);
    }

    let file = &mut doc.files[file_index];
    let copy_page = |page: &Page, ids: &mut IDGenerator| {
        let mut copy = page.clone();
        copy.id = new_page_id.clone();
        for position in &mut copy.field_positions {
            position.id = ids.new_id();
            if let Some(new_field) = field_ids.get(&position.field) {
                position.field = new_field.clone();
            }
        }
        if let Some(logic) = copy.logic.as_mut() {
            remap_logic(logic, &field_ids, page_id, &new_page_id);
        }
        copy
    };

    if let Some(at) = file.pages.iter().position(|p| p.id == page_id) {
        let copy = copy_page(&file.pages[at], ids);
        changes.push(Change::new(
            ChangeTarget::PageCreate,
            None,
            json!({ "page": &copy, "targetIndex": at + 1 }),
        ));
        file.pages.insert(at + 1, copy);
    }
    insert_after(&mut file.page_order, page_id, &new_page_id);

    for view in &mut file.views {
        if let Some(at) = view.pages.iter().position(|p| p.id == page_id) {
            let copy = copy_page(&view.pages[at], ids);
            view.pages.insert(at + 1, copy);
        }
        insert_after(&mut view.page_order, page_id, &new_page_id);
    }

    for change in &mut changes {
        change.file_id = Some(file.id.clone());
        change.page_id = Some(new_page_id.clone());
    }

    info!(page_id, new_page_id = %new_page_id, fields = field_ids.len(), "Duplicated page");
    Ok(DuplicatedPage {
        page_id: new_page_id,
        field_ids,
        changes,
    })
}

fn insert_after(order: &mut Vec<String>, anchor: &str, id: &str) {
    if let Some(at) = order.iter().position(|p| p == anchor) {
        order.insert(at + 1, id.to_string());
    }
}

/// Rewrites conditions in a field's own logic, its table columns and every
/// collection schema and schema column
pub fn remap_field_logic(field: &mut Field, field_ids: &BTreeMap<String, String>, old_page: &str, new_page: &str) {
    if let Some(logic) = field.logic.as_mut() {
        remap_logic(logic, field_ids, old_page, new_page);
    }
    if let Some(columns) = field.table_columns_mut() {
        for logic in columns.iter_mut().filter_map(|c| c.logic.as_mut()) {
            remap_logic(logic, field_ids, old_page, new_page);
        }
    }
    if let Some(schemas) = field.schema_mut() {
        for schema in schemas.values_mut() {
            if let Some(logic) = schema.logic.as_mut() {
                remap_logic(logic, field_ids, old_page, new_page);
            }
            for logic in schema.table_columns.iter_mut().filter_map(|c| c.logic.as_mut()) {
                remap_logic(logic, field_ids, old_page, new_page);
            }
        }
    }
}

fn remap_logic(logic: &mut Logic, field_ids: &BTreeMap<String, String>, old_page: &str, new_page: &str) {
    let Some(conditions) = logic.conditions_mut() else {
        return;
    };
    for condition in conditions {
        if let Some(new_field) = condition.field.as_ref().and_then(|f| field_ids.get(f)) {
            condition.field = Some(new_field.clone());
            if condition.page.as_deref() == Some(old_page) {
                condition.page = Some(new_page.to_string());
            }
        }
    }
}
