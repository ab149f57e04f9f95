//! # Document Editor
//!
//! One edit session over one document. The editor owns the store, the
//! visibility cache and the post-effect engine, and is the only way callers
//! reach a mutable document.
//!
//! ```text
//! incoming Change ──TryFrom──▶ Mutation ──┐
//! editor row op ─────────────▶ Mutation ──┤
//!                                         ▼
//!                    store.apply_with_effects (formula cascade)
//!                                         │
//!                    visibility cache refresh per touched field
//!                                         │
//!                    outbox (editor ops only) ──▶ take_changes()
//! ```

use crate::config::EditorConfig;
use crate::dependency::{VisibilityCache, VisibilityTarget};
use crate::duplicate;
use crate::errors::{EditorError, EditorResult, MutationError};
use crate::formulas::FormulaGraph;
use crate::logic::LogicEvaluator;
use crate::mutations::Mutation;
use crate::navigation::{self, GotoConfig, NavigationStatus, NavigationTarget};
use crate::pages::{self, PageDeletionCheck};
use crate::post_effects::PostEffectEngine;
use crate::rows::{active_rows_at, RowPath};
use crate::store::DocumentStore;
use crate::validation::{Validation, Validator};
use formdoc_formula::Evaluator;
use formdoc_model::{Change, Document, Field, FieldValue, Page, ValueElement};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// A change of a batch that was not applied
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedChange {
    pub index: usize,
    pub target: String,
    pub reason: String,
}

/// Outcome of [`DocumentEditor::apply_changes`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub applied: usize,
    pub skipped: Vec<SkippedChange>,
    /// Field and page ids whose visibility flipped, each once
    pub refreshed: Vec<String>,
}

pub struct DocumentEditor {
    store: DocumentStore,
    config: EditorConfig,
    effects: PostEffectEngine,
    visibility: VisibilityCache,
    outbox: Vec<Change>,
    current_page_id: Option<String>,
    current_target: Option<NavigationTarget>,
}

impl DocumentEditor {
    pub fn new(document: Document, config: EditorConfig) -> EditorResult<Self> {
        let mut store = DocumentStore::new(document)?;

        if config.recalculate_on_load {
            let graph = FormulaGraph::build(store.document());
            let mutations = graph.recalculate_all(store.document(), &Evaluator::new());
            for mutation in &mutations {
                if let Err(err) = store.apply(mutation) {
                    warn!(field_id = %mutation.field_id(), error = %err, "Formula result not written");
                }
            }
            debug!(count = mutations.len(), "Recalculated formulas on load");
        }

        let visibility = VisibilityCache::build(store.document(), &config.active_view);
        let current_page_id = LogicEvaluator::new(store.document(), &config.active_view)
            .pages_for_view()
            .first()
            .map(|page| page.id.clone());

        info!(document = %store.document().id, view = %config.active_view, "Opened document");
        Ok(Self {
            store,
            config,
            effects: PostEffectEngine::new(),
            visibility,
            outbox: Vec::new(),
            current_page_id,
            current_target: None,
        })
    }

    pub fn from_json_str(source: &str, config: EditorConfig) -> EditorResult<Self> {
        Self::new(Document::from_json_str(source)?, config)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        self.store.document()
    }

    pub fn into_document(self) -> Document {
        self.store.into_document()
    }

    pub fn to_json_string(&self, pretty: bool) -> EditorResult<String> {
        self.store.to_json_string(pretty)
    }

    pub fn version(&self) -> u64 {
        self.store.version
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.store.field(field_id)
    }

    pub fn value_of_identifier(&self, identifier: &str) -> Option<&FieldValue> {
        self.store.field_by_identifier(identifier)?.value.as_ref()
    }

    fn logic(&self) -> LogicEvaluator<'_> {
        LogicEvaluator::new(self.store.document(), &self.config.active_view)
    }

    // ------------------------------------------------------------------
    // Change application
    // ------------------------------------------------------------------

    /// Applies incoming changes in order. A change that cannot be decoded or
    /// applied is logged and skipped; the rest of the batch still runs.
    #[instrument(skip(self, changes), fields(count = changes.len()))]
    pub fn apply_changes(&mut self, changes: &[Change]) -> BatchReport {
        let mut report = BatchReport::default();
        let mut refreshed = BTreeSet::new();

        for (index, change) in changes.iter().enumerate() {
            let result = Mutation::try_from(change)
                .map_err(EditorError::from)
                .and_then(|mutation| Ok(self.store.apply_with_effects(&self.effects, mutation)?));

            match result {
                Ok(applied) => {
                    report.applied += 1;
                    for id in self.refresh_visibility(&applied) {
                        if refreshed.insert(id.clone()) {
                            report.refreshed.push(id);
                        }
                    }
                }
                Err(err) => {
                    warn!(index, target = %change.target, error = %err, "Skipping change");
                    report.skipped.push(SkippedChange {
                        index,
                        target: change.target.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            applied = report.applied,
            skipped = report.skipped.len(),
            refreshed = report.refreshed.len(),
            "Applied change batch"
        );
        report
    }

    /// Visibility targets re-evaluated once per touched field
    fn refresh_visibility(&mut self, applied: &[Mutation]) -> Vec<String> {
        let touched: BTreeSet<&str> = applied.iter().map(Mutation::field_id).collect();
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for field_id in touched {
            for id in self.visibility.fields_needs_to_be_refreshed(self.store.document(), field_id) {
                if seen.insert(id.clone()) {
                    out.push(id);
                }
            }
        }
        out
    }

    fn commit(&mut self, mutation: Mutation) -> EditorResult<()> {
        let applied = self.store.apply_with_effects(&self.effects, mutation)?;
        let refreshed = self.refresh_visibility(&applied);
        if !refreshed.is_empty() {
            debug!(?refreshed, "Visibility changed");
        }

        let file_id = self.store.file().map(|file| file.id.clone());
        for mutation in &applied {
            for change in mutation.to_changes(self.store.document()) {
                self.record(change, file_id.clone());
            }
        }
        Ok(())
    }

    fn record(&mut self, mut change: Change, file_id: Option<String>) {
        change.sdk = Some(self.config.sdk.clone());
        change.view_type = Some(self.config.active_view.clone());
        if change.file_id.is_none() {
            change.file_id = file_id;
        }
        self.outbox.push(change);
    }

    /// Drains the change records produced by editor operations
    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.outbox)
    }

    // ------------------------------------------------------------------
    // Row operations
    // ------------------------------------------------------------------

    fn active_ids(&self, path: &RowPath) -> EditorResult<Vec<String>> {
        let field = self
            .store
            .field(&path.field_id)
            .ok_or_else(|| MutationError::FieldNotFound(path.field_id.clone()))?;
        if !field.is_row_container() {
            return Err(MutationError::NotRowContainer(path.field_id.clone()).into());
        }
        let rows = active_rows_at(field, &path.hops).ok_or_else(|| match path.hops.last() {
            Some(hop) => MutationError::parent_not_found(&path.field_id, &hop.row_id),
            None => MutationError::ValueAbsent(path.field_id.clone()),
        })?;
        Ok(rows.into_iter().map(|row| row.id.clone()).collect())
    }

    pub fn update_value(&mut self, field_id: &str, value: Option<FieldValue>) -> EditorResult<()> {
        self.commit(Mutation::ReplaceValue {
            field_id: field_id.to_string(),
            value,
        })
    }

    pub fn update_cell(&mut self, path: &RowPath, row_id: &str, column_id: &str, value: FieldValue) -> EditorResult<()> {
        let mut cells = BTreeMap::new();
        cells.insert(column_id.to_string(), value);
        self.commit(Mutation::UpdateRow {
            path: path.clone(),
            row_id: row_id.to_string(),
            cells,
        })
    }

    pub fn delete_rows(&mut self, path: &RowPath, row_ids: &[String]) -> EditorResult<()> {
        self.commit(Mutation::DeleteRows {
            path: path.clone(),
            row_ids: row_ids.to_vec(),
        })
    }

    /// Copies each matching row below itself. Returns the new row ids.
    pub fn duplicate_rows(&mut self, path: &RowPath, row_ids: &[String]) -> EditorResult<Vec<String>> {
        let active = self.active_ids(path)?;
        let sources: Vec<&String> = row_ids.iter().filter(|id| active.contains(id)).collect();
        if sources.is_empty() {
            warn!(%path, "No matching rows to duplicate");
            return Ok(Vec::new());
        }

        let copies: Vec<(String, String)> = sources
            .into_iter()
            .map(|id| (id.clone(), self.store.new_id()))
            .collect();
        let new_ids = copies.iter().map(|(_, new_id)| new_id.clone()).collect();
        self.commit(Mutation::DuplicateRows {
            path: path.clone(),
            copies,
        })?;
        Ok(new_ids)
    }

    pub fn move_row_up(&mut self, path: &RowPath, row_id: &str) -> EditorResult<()> {
        let index = self.row_index(path, row_id)?;
        if index == 0 {
            warn!(%path, row_id, "Row is already first");
            return Ok(());
        }
        self.commit(Mutation::MoveRow {
            path: path.clone(),
            row_id: row_id.to_string(),
            index: index - 1,
        })
    }

    pub fn move_row_down(&mut self, path: &RowPath, row_id: &str) -> EditorResult<()> {
        let len = self.active_ids(path)?.len();
        let index = self.row_index(path, row_id)?;
        if index + 1 >= len {
            warn!(%path, row_id, "Row is already last");
            return Ok(());
        }
        self.commit(Mutation::MoveRow {
            path: path.clone(),
            row_id: row_id.to_string(),
            index: index + 1,
        })
    }

    fn row_index(&self, path: &RowPath, row_id: &str) -> EditorResult<usize> {
        self.active_ids(path)?
            .iter()
            .position(|id| id == row_id)
            .ok_or_else(|| MutationError::row_not_found(&path.field_id, row_id).into())
    }

    fn new_row(&mut self, cells: BTreeMap<String, FieldValue>) -> ValueElement {
        ValueElement {
            cells,
            ..ValueElement::new(self.store.new_id())
        }
    }

    /// Appends an empty row. Returns its id.
    pub fn insert_row_at_end(&mut self, path: &RowPath) -> EditorResult<String> {
        let row = self.new_row(BTreeMap::new());
        let row_id = row.id.clone();
        self.commit(Mutation::CreateRow {
            path: path.clone(),
            row,
            index: None,
        })?;
        Ok(row_id)
    }

    /// Inserts a row directly below `anchor`, or at the end when the anchor
    /// does not match an active row.
    pub fn insert_below(&mut self, path: &RowPath, anchor: &str, cells: BTreeMap<String, FieldValue>) -> EditorResult<String> {
        let row = self.new_row(cells);
        let row_id = row.id.clone();
        self.commit(Mutation::InsertBelow {
            path: path.clone(),
            anchor: Some(anchor.to_string()),
            row,
        })?;
        Ok(row_id)
    }

    /// Appends a row pre-filled with the active filter values so it stays
    /// visible under the filter. Empty filter values are not copied.
    pub fn insert_row_with_filter(&mut self, path: &RowPath, filters: &BTreeMap<String, FieldValue>) -> EditorResult<String> {
        let cells = filters
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();
        let row = self.new_row(cells);
        let row_id = row.id.clone();
        self.commit(Mutation::InsertBelow {
            path: path.clone(),
            anchor: None,
            row,
        })?;
        Ok(row_id)
    }

    pub fn bulk_edit(&mut self, path: &RowPath, row_ids: &[String], cells: BTreeMap<String, FieldValue>) -> EditorResult<()> {
        let active = self.active_ids(path)?;
        let row_ids: Vec<String> = row_ids.iter().filter(|id| active.contains(id)).cloned().collect();
        if row_ids.is_empty() {
            warn!(%path, "No matching rows to edit");
            return Ok(());
        }
        self.commit(Mutation::BulkEdit {
            path: path.clone(),
            row_ids,
            cells,
        })
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    pub fn should_show_field(&self, field_id: &str) -> bool {
        self.visibility
            .is_visible(self.store.document(), &VisibilityTarget::Field(field_id.to_string()))
    }

    pub fn should_show_page(&self, page_id: &str) -> bool {
        self.visibility
            .is_visible(self.store.document(), &VisibilityTarget::Page(page_id.to_string()))
    }

    pub fn should_show_column(&self, field_id: &str, column_id: &str) -> bool {
        let target = VisibilityTarget::Column {
            field_id: field_id.to_string(),
            column_id: column_id.to_string(),
        };
        self.visibility.is_visible(self.store.document(), &target)
    }

    pub fn should_show_schema(&self, field_id: &str, row_id: &str, schema_key: &str) -> bool {
        let target = VisibilityTarget::Schema {
            field_id: field_id.to_string(),
            row_id: row_id.to_string(),
            schema_key: schema_key.to_string(),
        };
        self.visibility.is_visible(self.store.document(), &target)
    }

    pub fn fields_needs_to_be_refreshed(&mut self, changed: &str) -> Vec<String> {
        self.visibility.fields_needs_to_be_refreshed(self.store.document(), changed)
    }

    // ------------------------------------------------------------------
    // Validation and navigation
    // ------------------------------------------------------------------

    pub fn validate(&self) -> Validation {
        Validator::new(self.store.document(), self.logic()).validate()
    }

    pub fn goto(&mut self, path: &str) -> NavigationStatus {
        self.goto_with(path, &GotoConfig::default())
    }

    /// Moves to a page, field position or row. Nothing changes on failure.
    pub fn goto_with(&mut self, path: &str, config: &GotoConfig) -> NavigationStatus {
        let target = navigation::resolve(&self.logic(), self.store.document(), path, config);
        match target {
            Some(target) => {
                debug!(path, page_id = %target.page_id, "Navigated");
                self.current_page_id = Some(target.page_id.clone());
                self.current_target = Some(target);
                NavigationStatus::Success
            }
            None => NavigationStatus::Failure,
        }
    }

    pub fn current_page(&self) -> Option<&Page> {
        let page_id = self.current_page_id.as_deref()?;
        self.logic().pages_for_view().iter().find(|page| page.id == page_id)
    }

    pub fn current_target(&self) -> Option<&NavigationTarget> {
        self.current_target.as_ref()
    }

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    /// Clones a page and its exclusive fields. Returns the new page id.
    pub fn duplicate_page(&mut self, page_id: &str) -> EditorResult<String> {
        let (doc, ids) = self.store.parts_mut();
        let duplicated = duplicate::duplicate_page(doc, page_id, ids)?;
        for change in duplicated.changes {
            self.record(change, None);
        }
        self.visibility.rebuild(self.store.document());
        Ok(duplicated.page_id)
    }

    pub fn can_delete_page(&self, page_id: &str) -> PageDeletionCheck {
        pages::can_delete_page(self.store.document(), page_id)
    }

    pub fn delete_page(&mut self, page_id: &str) -> EditorResult<()> {
        let check = self.can_delete_page(page_id);
        if !check.can_delete {
            warn!(page_id, warnings = ?check.warnings, "Page deletion refused");
            return Err(EditorError::PageNotDeletable {
                page_id: page_id.to_string(),
                reason: check.warnings.join("; "),
            });
        }
        let change = pages::delete_page(self.store.document_mut(), page_id)?;
        self.record(change, None);
        self.visibility.rebuild(self.store.document());

        if self.current_page_id.as_deref() == Some(page_id) {
            self.current_page_id = self.logic().pages_for_view().first().map(|page| page.id.clone());
            self.current_target = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formdoc_model::ChangeTarget;
    use serde_json::json;

    fn document() -> Document {
        Document::from_json(json!({
            "_id": "doc1",
            "files": [{
                "_id": "file1",
                "pageOrder": ["p1", "p2"],
                "pages": [
                    { "_id": "p1", "fieldPositions": [
                        { "_id": "fp1", "field": "status" },
                        { "_id": "fp2", "field": "items" }
                    ] },
                    { "_id": "p2", "hidden": true, "fieldPositions": [ { "_id": "fp3", "field": "notes" } ],
                      "logic": { "action": "show", "conditions": [
                          { "page": "p1", "field": "status", "condition": "=", "value": "open" }
                      ] } }
                ]
            }],
            "fields": [
                { "_id": "status", "identifier": "status", "type": "text", "value": "closed" },
                { "_id": "items", "identifier": "items", "type": "table",
                  "rowOrder": ["r1", "r2", "r3"],
                  "tableColumns": [ { "_id": "qty", "type": "number", "title": "Qty" } ],
                  "value": [
                      { "_id": "r1", "cells": { "qty": 1 } },
                      { "_id": "r2", "cells": { "qty": 2 } },
                      { "_id": "r3", "cells": { "qty": 3 } }
                  ] },
                { "_id": "notes", "type": "text", "required": true },
                { "_id": "total", "identifier": "total", "type": "number",
                  "formulas": [ { "formula": "fx1" } ] }
            ],
            "formulas": [ { "_id": "fx1", "expression": "sum(items.qty)" } ]
        }))
        .unwrap()
    }

    fn editor() -> DocumentEditor {
        DocumentEditor::new(document(), EditorConfig::default()).unwrap()
    }

    fn row_ids(editor: &DocumentEditor) -> Vec<String> {
        editor.active_ids(&RowPath::root("items")).unwrap()
    }

    #[test]
    fn test_formulas_recalculate_on_load() {
        let editor = editor();
        assert_eq!(editor.value_of_identifier("total").and_then(FieldValue::as_number), Some(6.0));
        assert_eq!(editor.version(), 1);
    }

    #[test]
    fn test_batch_continues_past_bad_changes() {
        let mut editor = editor();
        let changes = vec![
            Change::row_delete("ghost", "r1", Vec::new()),
            Change::field_update("status", Some(FieldValue::from("open"))),
            Change::row_update("items", "nope", BTreeMap::new(), Vec::new()),
        ];
        let report = editor.apply_changes(&changes);

        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(report.refreshed, vec!["p2".to_string()]);
        assert!(editor.should_show_page("p2"));
        assert!(editor.take_changes().is_empty());
    }

    #[test]
    fn test_row_operations_record_changes() {
        let mut editor = editor();
        let path = RowPath::root("items");

        let copies = editor.duplicate_rows(&path, &["r1".to_string(), "zz".to_string()]).unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(row_ids(&editor)[1], copies[0]);
        assert_eq!(editor.value_of_identifier("total").and_then(FieldValue::as_number), Some(7.0));

        let changes = editor.take_changes();
        assert_eq!(changes[0].target, ChangeTarget::RowCreate);
        assert_eq!(changes[1].target, ChangeTarget::FieldUpdate);
        assert!(changes.iter().all(|c| c.sdk.as_deref() == Some("rust")));
        assert_eq!(changes[0].file_id.as_deref(), Some("file1"));
    }

    #[test]
    fn test_move_at_edges_is_a_no_op() {
        let mut editor = editor();
        let path = RowPath::root("items");
        let version = editor.version();

        editor.move_row_up(&path, "r1").unwrap();
        editor.move_row_down(&path, "r3").unwrap();
        assert_eq!(editor.version(), version);

        editor.move_row_down(&path, "r1").unwrap();
        assert_eq!(row_ids(&editor), vec!["r2", "r1", "r3"]);
        assert!(editor.move_row_up(&path, "ghost").is_err());
    }

    #[test]
    fn test_insert_operations() {
        let mut editor = editor();
        let path = RowPath::root("items");

        let below = editor.insert_below(&path, "r1", BTreeMap::new()).unwrap();
        let end = editor.insert_row_at_end(&path).unwrap();
        let mut filters = BTreeMap::new();
        filters.insert("qty".to_string(), FieldValue::from(4.0));
        let filtered = editor.insert_row_with_filter(&path, &filters).unwrap();

        let ids = row_ids(&editor);
        assert_eq!(ids[1], below);
        assert_eq!(ids[4], end);
        assert_eq!(ids[5], filtered);
        assert_eq!(editor.value_of_identifier("total").and_then(FieldValue::as_number), Some(10.0));
    }

    #[test]
    fn test_bulk_edit_ignores_unknown_rows() {
        let mut editor = editor();
        let path = RowPath::root("items");
        let mut cells = BTreeMap::new();
        cells.insert("qty".to_string(), FieldValue::from(9.0));

        editor.bulk_edit(&path, &["nope".to_string()], cells.clone()).unwrap();
        assert_eq!(editor.value_of_identifier("total").and_then(FieldValue::as_number), Some(6.0));

        editor.bulk_edit(&path, &["r1".to_string(), "r2".to_string()], cells).unwrap();
        assert_eq!(editor.value_of_identifier("total").and_then(FieldValue::as_number), Some(21.0));
    }

    #[test]
    fn test_goto_keeps_state_on_failure() {
        let mut editor = editor();
        assert_eq!(editor.current_page().map(|p| p.id.as_str()), Some("p1"));
        assert_eq!(editor.goto("p2"), NavigationStatus::Failure);
        assert_eq!(editor.current_page().map(|p| p.id.as_str()), Some("p1"));

        editor.update_value("status", Some(FieldValue::from("open"))).unwrap();
        assert_eq!(editor.goto("p2/fp3"), NavigationStatus::Success);
        assert_eq!(editor.current_page().map(|p| p.id.as_str()), Some("p2"));
        assert_eq!(editor.current_target().and_then(|t| t.field_id.as_deref()), Some("notes"));
    }

    #[test]
    fn test_validation_follows_page_visibility() {
        let mut editor = editor();
        assert!(editor.validate().is_valid());
        editor.update_value("status", Some(FieldValue::from("open"))).unwrap();
        assert!(!editor.validate().is_valid());
    }

    #[test]
    fn test_page_duplicate_and_delete() {
        let mut editor = editor();
        let new_page = editor.duplicate_page("p2").unwrap();
        let order = &editor.document().files[0].page_order;
        assert_eq!(order.len(), 3);
        assert_eq!(order[2], new_page);

        let changes = editor.take_changes();
        assert!(changes.iter().any(|c| c.target == ChangeTarget::PageCreate));

        assert_eq!(editor.goto("p1"), NavigationStatus::Success);
        editor.delete_page("p1").unwrap();
        assert_eq!(editor.current_page().map(|p| p.id.as_str()), Some("p2"));
        assert!(editor.field("items").is_none());
        assert_eq!(editor.take_changes()[0].target, ChangeTarget::PageDelete);

        editor.delete_page(&new_page).unwrap();
        let version = editor.version();
        assert!(matches!(
            editor.delete_page("p2"),
            Err(EditorError::PageNotDeletable { .. })
        ));
        assert_eq!(editor.version(), version);
    }
}
