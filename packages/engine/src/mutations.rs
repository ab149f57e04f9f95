//! # Row and value mutations
//!
//! Semantic operations on the value of a field. Every incoming change record
//! and every editor row operation is expressed as one [`Mutation`].
//!
//! ## Mutation Semantics
//!
//! ### CreateRow
//! - Lands at `index` among active rows, appends when missing or out of range
//! - A row id that already exists is refused, so replays never duplicate
//!
//! ### UpdateRow / BulkEdit
//! - Cells merge by column id, last write wins
//! - Unknown or tombstoned rows are untouched
//!
//! ### DeleteRows
//! - Soft delete: the row keeps its id and its slot in `rowOrder`
//!
//! ### MoveRow
//! - Target index is clamped to the list bounds
//!
//! All row variants address nested lists through a [`RowPath`]. A field
//! whose value is absent short-circuits every row mutation.

use crate::errors::{ChangeError, MutationError, MutationResult};
use crate::rows::{active_rows_at, RowList, RowPath};
use formdoc_model::{
    Change, ChangeTarget, Document, FieldUpdatePayload, FieldValue, RowCreatePayload,
    RowDeletePayload, RowMovePayload, RowUpdatePayload, ValueElement,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Replace a field's whole value (`field.update`)
    ReplaceValue {
        field_id: String,
        value: Option<FieldValue>,
    },

    CreateRow {
        path: RowPath,
        row: ValueElement,
        index: Option<usize>,
    },

    UpdateRow {
        path: RowPath,
        row_id: String,
        cells: BTreeMap<String, FieldValue>,
    },

    DeleteRows {
        path: RowPath,
        row_ids: Vec<String>,
    },

    MoveRow {
        path: RowPath,
        row_id: String,
        index: usize,
    },

    /// Copy each `(source, new_id)` pair directly below its source
    DuplicateRows {
        path: RowPath,
        copies: Vec<(String, String)>,
    },

    /// Insert after `anchor`, or at the end when there is no matching anchor
    InsertBelow {
        path: RowPath,
        anchor: Option<String>,
        row: ValueElement,
    },

    BulkEdit {
        path: RowPath,
        row_ids: Vec<String>,
        cells: BTreeMap<String, FieldValue>,
    },
}

impl Mutation {
    pub fn field_id(&self) -> &str {
        match self {
            Mutation::ReplaceValue { field_id, .. } => field_id,
            Mutation::CreateRow { path, .. }
            | Mutation::UpdateRow { path, .. }
            | Mutation::DeleteRows { path, .. }
            | Mutation::MoveRow { path, .. }
            | Mutation::DuplicateRows { path, .. }
            | Mutation::InsertBelow { path, .. }
            | Mutation::BulkEdit { path, .. } => &path.field_id,
        }
    }

    /// Apply mutation to the document with validation
    pub fn apply(&self, doc: &mut Document) -> MutationResult<()> {
        let field_id = self.field_id();
        let field = doc
            .field_mut(field_id)
            .ok_or_else(|| MutationError::FieldNotFound(field_id.to_string()))?;

        if let Mutation::ReplaceValue { value, .. } = self {
            field.value = value.clone();
            return Ok(());
        }

        if !field.is_row_container() {
            return Err(MutationError::NotRowContainer(field.id.clone()));
        }

        match self {
            Mutation::ReplaceValue { .. } => Ok(()),

            Mutation::CreateRow { path, row, index } => {
                let mut list = RowList::resolve(field, &path.hops)?;
                Self::apply_create(&mut list, row, *index)
            }

            Mutation::UpdateRow { path, row_id, cells } => {
                let mut list = RowList::resolve(field, &path.hops)?;
                list.merge_cells(row_id, cells)
            }

            Mutation::DeleteRows { path, row_ids } => {
                let mut list = RowList::resolve(field, &path.hops)?;
                Self::apply_delete(&mut list, row_ids)
            }

            Mutation::MoveRow { path, row_id, index } => {
                let mut list = RowList::resolve(field, &path.hops)?;
                list.move_to(row_id, *index).map(|_| ())
            }

            Mutation::DuplicateRows { path, copies } => {
                let mut list = RowList::resolve(field, &path.hops)?;
                Self::apply_duplicate(&mut list, copies);
                Ok(())
            }

            Mutation::InsertBelow { path, anchor, row } => {
                let mut list = RowList::resolve(field, &path.hops)?;
                let index = anchor
                    .as_deref()
                    .and_then(|a| list.position(a))
                    .map(|p| p + 1);
                Self::apply_create(&mut list, row, index)
            }

            Mutation::BulkEdit { path, row_ids, cells } => {
                let mut list = RowList::resolve(field, &path.hops)?;
                let active = list.active_ids();
                for row_id in row_ids.iter().filter(|id| active.contains(id)) {
                    list.merge_cells(row_id, cells)?;
                }
                Ok(())
            }
        }
    }

    fn apply_create(list: &mut RowList<'_>, row: &ValueElement, index: Option<usize>) -> MutationResult<()> {
        if list.contains(&row.id) {
            return Err(MutationError::row_exists(list.field_id(), &row.id));
        }
        list.insert(row.clone(), index);
        Ok(())
    }

    fn apply_delete(list: &mut RowList<'_>, row_ids: &[String]) -> MutationResult<()> {
        let mut deleted = 0;
        for row_id in row_ids {
            if list.delete(row_id).is_ok() {
                deleted += 1;
            }
        }

        match row_ids.first() {
            Some(first) if deleted == 0 => Err(MutationError::row_not_found(list.field_id(), first)),
            _ => Ok(()),
        }
    }

    fn apply_duplicate(list: &mut RowList<'_>, copies: &[(String, String)]) {
        for (source_id, new_id) in copies {
            if list.contains(new_id) {
                continue;
            }
            let (Some(source), Some(position)) = (list.row(source_id), list.position(source_id)) else {
                continue;
            };

            let mut copy = source.clone();
            copy.id = new_id.clone();
            copy.deleted = None;
            list.insert(copy, Some(position + 1));
        }
    }

    /// Outgoing change records describing this mutation, read from the
    /// document after it was applied.
    pub fn to_changes(&self, doc: &Document) -> Vec<Change> {
        let rows_of = |path: &RowPath| {
            doc.field(&path.field_id)
                .and_then(|field| active_rows_at(field, &path.hops))
                .unwrap_or_default()
        };
        let created = |path: &RowPath, row_id: &str| -> Option<Change> {
            let rows = rows_of(path);
            let index = rows.iter().position(|row| row.id == row_id)?;
            Some(Change::row_create(
                &path.field_id,
                rows[index].clone(),
                Some(index),
                path.hops.clone(),
            ))
        };

        match self {
            Mutation::ReplaceValue { field_id, value } => {
                vec![Change::field_update(field_id, value.clone())]
            }
            Mutation::CreateRow { path, row, .. } | Mutation::InsertBelow { path, row, .. } => {
                created(path, &row.id).into_iter().collect()
            }
            Mutation::UpdateRow { path, row_id, cells } => {
                vec![Change::row_update(&path.field_id, row_id, cells.clone(), path.hops.clone())]
            }
            Mutation::DeleteRows { path, row_ids } => row_ids
                .iter()
                .map(|row_id| Change::row_delete(&path.field_id, row_id, path.hops.clone()))
                .collect(),
            Mutation::MoveRow { path, row_id, .. } => rows_of(path)
                .iter()
                .position(|row| &row.id == row_id)
                .map(|index| Change::row_move(&path.field_id, row_id, index, path.hops.clone()))
                .into_iter()
                .collect(),
            Mutation::DuplicateRows { path, copies } => copies
                .iter()
                .filter_map(|(_, new_id)| created(path, new_id))
                .collect(),
            Mutation::BulkEdit { path, row_ids, cells } => row_ids
                .iter()
                .map(|row_id| Change::row_update(&path.field_id, row_id, cells.clone(), path.hops.clone()))
                .collect(),
        }
    }
}

impl TryFrom<&Change> for Mutation {
    type Error = ChangeError;

    fn try_from(change: &Change) -> Result<Self, Self::Error> {
        let target = change.target;
        let field_id = change
            .field_id
            .clone()
            .ok_or(ChangeError::MissingFieldId { target })?;
        let malformed = |err: serde_json::Error| ChangeError::malformed(target, err);

        match target {
            ChangeTarget::FieldUpdate => {
                let payload: FieldUpdatePayload = change.payload().map_err(malformed)?;
                Ok(Mutation::ReplaceValue {
                    field_id,
                    value: payload.value,
                })
            }
            ChangeTarget::RowCreate => {
                let payload: RowCreatePayload = change.payload().map_err(malformed)?;
                Ok(Mutation::CreateRow {
                    path: RowPath { field_id, hops: payload.parent_path },
                    row: payload.row,
                    index: payload.target_row_index,
                })
            }
            ChangeTarget::RowUpdate => {
                let payload: RowUpdatePayload = change.payload().map_err(malformed)?;
                Ok(Mutation::UpdateRow {
                    path: RowPath { field_id, hops: payload.parent_path },
                    row_id: payload.row_id,
                    cells: payload.row.cells,
                })
            }
            ChangeTarget::RowDelete => {
                let payload: RowDeletePayload = change.payload().map_err(malformed)?;
                Ok(Mutation::DeleteRows {
                    path: RowPath { field_id, hops: payload.parent_path },
                    row_ids: vec![payload.row_id],
                })
            }
            ChangeTarget::RowMove => {
                let payload: RowMovePayload = change.payload().map_err(malformed)?;
                Ok(Mutation::MoveRow {
                    path: RowPath { field_id, hops: payload.parent_path },
                    row_id: payload.row_id,
                    index: payload.target_row_index,
                })
            }
            other => Err(ChangeError::UnsupportedTarget(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Document {
        Document::from_json(json!({
            "_id": "doc1",
            "fields": [
                {
                    "_id": "t1",
                    "type": "table",
                    "rowOrder": ["r1", "r2"],
                    "tableColumns": [ { "_id": "c1", "type": "text", "title": "Name" } ],
                    "value": [
                        { "_id": "r1", "cells": { "c1": "one" } },
                        { "_id": "r2", "cells": { "c1": "two" } }
                    ]
                },
                { "_id": "empty", "type": "table", "tableColumns": [] },
                { "_id": "text1", "type": "text", "value": "hello" }
            ]
        }))
        .unwrap()
    }

    fn names(doc: &Document) -> Vec<String> {
        doc.field("t1")
            .unwrap()
            .active_rows()
            .iter()
            .map(|row| row.id.clone())
            .collect()
    }

    #[test]
    fn test_create_is_idempotent_by_id() {
        let mut doc = document();
        let create = Mutation::CreateRow {
            path: RowPath::root("t1"),
            row: ValueElement::new("r3"),
            index: Some(0),
        };
        create.apply(&mut doc).unwrap();
        assert_eq!(names(&doc), vec!["r3", "r1", "r2"]);

        assert!(matches!(create.apply(&mut doc), Err(MutationError::RowExists { .. })));
        assert_eq!(names(&doc), vec!["r3", "r1", "r2"]);
    }

    #[test]
    fn test_create_on_absent_value_is_refused() {
        let mut doc = document();
        let create = Mutation::CreateRow {
            path: RowPath::root("empty"),
            row: ValueElement::new("r1"),
            index: None,
        };
        assert!(matches!(create.apply(&mut doc), Err(MutationError::ValueAbsent(_))));
        let field = doc.field("empty").unwrap();
        assert!(field.value.is_none());
        assert!(field.row_order().is_none());
    }

    #[test]
    fn test_update_unknown_row_leaves_document_unchanged() {
        let mut doc = document();
        let before = doc.clone();
        let update = Mutation::UpdateRow {
            path: RowPath::root("t1"),
            row_id: "nope".into(),
            cells: BTreeMap::from([("c1".to_string(), FieldValue::from("x"))]),
        };
        assert!(update.apply(&mut doc).is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_row_mutation_on_scalar_field() {
        let mut doc = document();
        let delete = Mutation::DeleteRows {
            path: RowPath::root("text1"),
            row_ids: vec!["r1".into()],
        };
        assert!(matches!(delete.apply(&mut doc), Err(MutationError::NotRowContainer(_))));
    }

    #[test]
    fn test_duplicate_lands_below_source() {
        let mut doc = document();
        Mutation::DuplicateRows {
            path: RowPath::root("t1"),
            copies: vec![("r1".into(), "r1copy".into()), ("ghost".into(), "g2".into())],
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(names(&doc), vec!["r1", "r1copy", "r2"]);

        let rows = doc.field("t1").unwrap().active_rows();
        assert_eq!(rows[1].cell("c1"), Some(&FieldValue::from("one")));
    }

    #[test]
    fn test_change_decoding() {
        let change = Change::row_move("t1", "r2", 0, Vec::new());
        let mutation = Mutation::try_from(&change).unwrap();
        assert_eq!(
            mutation,
            Mutation::MoveRow {
                path: RowPath::root("t1"),
                row_id: "r2".into(),
                index: 0
            }
        );

        let mut bad = Change::new(ChangeTarget::RowUpdate, Some("t1".into()), json!({ "row": 3 }));
        assert!(matches!(
            Mutation::try_from(&bad),
            Err(ChangeError::MalformedPayload { .. })
        ));

        bad.target = ChangeTarget::PageCreate;
        assert!(matches!(
            Mutation::try_from(&bad),
            Err(ChangeError::UnsupportedTarget(ChangeTarget::PageCreate))
        ));
    }

    #[test]
    fn test_outgoing_changes_carry_final_index() {
        let mut doc = document();
        let insert = Mutation::InsertBelow {
            path: RowPath::root("t1"),
            anchor: Some("r1".into()),
            row: ValueElement::new("r9").with_cell("c1", "nine"),
        };
        insert.apply(&mut doc).unwrap();

        let changes = insert.to_changes(&doc);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].target, ChangeTarget::RowCreate);
        let payload: RowCreatePayload = changes[0].payload().unwrap();
        assert_eq!(payload.target_row_index, Some(1));
        assert_eq!(payload.row.id, "r9");
    }
}
