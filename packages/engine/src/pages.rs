//! Page deletion.
//!
//! Deleting a page removes it from its file and from every view, drops the
//! fields placed only on it, and strips conditions that pointed at the page
//! or at the dropped fields.

use crate::duplicate::exclusive_fields;
use crate::errors::{EditorError, EditorResult};
use formdoc_model::{Change, ChangeTarget, Document, Logic};
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Outcome of a deletion guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDeletionCheck {
    pub can_delete: bool,
    pub warnings: Vec<String>,
}

pub fn can_delete_page(doc: &Document, page_id: &str) -> PageDeletionCheck {
    let mut warnings = Vec::new();

    match doc.files.iter().find(|file| file.page(page_id).is_some()) {
        None => warnings.push(format!("Page {page_id} not found")),
        Some(file) if file.pages.len() <= 1 => {
            warnings.push("Cannot delete the last remaining page".to_string());
        }
        Some(_) => {}
    }

    PageDeletionCheck {
        can_delete: warnings.is_empty(),
        warnings,
    }
}

/// Removes the page and returns the `page.delete` change describing it
#[instrument(skip(doc))]
pub fn delete_page(doc: &mut Document, page_id: &str) -> EditorResult<Change> {
    let check = can_delete_page(doc, page_id);
    if !check.can_delete {
        for warning in &check.warnings {
            warn!(page_id, "{}", warning);
        }
        return Err(EditorError::PageNotDeletable {
            page_id: page_id.to_string(),
            reason: check.warnings.join("; "),
        });
    }

    let removed: HashSet<String> = exclusive_fields(doc, page_id).into_iter().collect();
    let mut file_id = None;

    for file in &mut doc.files {
        if file.page(page_id).is_none() {
            continue;
        }
        file_id = Some(file.id.clone());
        file.pages.retain(|p| p.id != page_id);
        file.page_order.retain(|p| p != page_id);
        for view in &mut file.views {
            view.pages.retain(|p| p.id != page_id);
            view.page_order.retain(|p| p != page_id);
        }
    }

    doc.fields.retain(|field| !removed.contains(&field.id));

    let strip = |logic: &mut Logic| {
        if let Some(conditions) = logic.conditions_mut() {
            conditions.retain(|c| {
                c.page.as_deref() != Some(page_id)
                    && !c.field.as_ref().is_some_and(|f| removed.contains(f))
            });
        }
    };
    for file in &mut doc.files {
        let pages = file
            .pages
            .iter_mut()
            .chain(file.views.iter_mut().flat_map(|v| v.pages.iter_mut()));
        for logic in pages.filter_map(|p| p.logic.as_mut()) {
            strip(logic);
        }
    }
    for field in &mut doc.fields {
        if let Some(logic) = field.logic.as_mut() {
            strip(logic);
        }
        if let Some(columns) = field.table_columns_mut() {
            columns.iter_mut().filter_map(|c| c.logic.as_mut()).for_each(strip);
        }
        if let Some(schemas) = field.schema_mut() {
            for schema in schemas.values_mut() {
                if let Some(logic) = schema.logic.as_mut() {
                    strip(logic);
                }
                schema.table_columns.iter_mut().filter_map(|c| c.logic.as_mut()).for_each(strip);
            }
        }
    }

    info!(page_id, removed_fields = removed.len(), "Deleted page");

    let mut change = Change::new(ChangeTarget::PageDelete, None, json!({ "pageId": page_id }));
    change.file_id = file_id;
    change.page_id = Some(page_id.to_string());
    Ok(change)
}
