//! Addressing and editing one ordered row list of a table or collection.
//!
//! ```text
//! field.value ─┬─ row r1 ── children["schemaA"] ─┬─ row c1
//!              │                                  └─ row c2 ── children["schemaB"] ─ ...
//!              └─ row r2
//! ```
//!
//! Top-level rows are ordered by the field's `rowOrder`; nested lists are
//! ordered by their stored sequence. Deleted rows stay in place as
//! tombstones and are skipped by every index computed here.

use crate::errors::{MutationError, MutationResult};
use formdoc_model::{Field, FieldKind, FieldValue, PathHop, ValueElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root field plus the `(rowId, schemaId)` hops down to a nested row list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowPath {
    pub field_id: String,
    pub hops: Vec<PathHop>,
}

impl RowPath {
    pub fn root(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            hops: Vec::new(),
        }
    }

    pub fn nested(mut self, row_id: impl Into<String>, schema_id: impl Into<String>) -> Self {
        self.hops.push(PathHop::new(row_id, schema_id));
        self
    }

    pub fn is_root(&self) -> bool {
        self.hops.is_empty()
    }
}

impl std::fmt::Display for RowPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_id)?;
        for hop in &self.hops {
            write!(f, "/{}:{}", hop.row_id, hop.schema_id)?;
        }
        Ok(())
    }
}

/// Active rows of the list addressed by `hops`, in display order
pub fn active_rows_at<'a>(field: &'a Field, hops: &[PathHop]) -> Option<Vec<&'a ValueElement>> {
    field.value.as_ref()?.rows()?;
    let mut current = field.active_rows();
    for hop in hops {
        let parent = current.into_iter().find(|row| row.id == hop.row_id)?;
        current = parent.active_children(&hop.schema_id);
    }
    Some(current)
}

/// Active row `row_id` anywhere in a collection tree, with the key of the
/// schema its list belongs to (`None` for top-level rows)
pub fn find_row<'a>(field: &'a Field, row_id: &str) -> Option<(&'a ValueElement, Option<&'a str>)> {
    fn walk<'a>(
        rows: Vec<&'a ValueElement>,
        schema_key: Option<&'a str>,
        row_id: &str,
    ) -> Option<(&'a ValueElement, Option<&'a str>)> {
        for row in rows {
            if row.id == row_id {
                return Some((row, schema_key));
            }
            for key in row.children.keys() {
                if let Some(found) = walk(row.active_children(key), Some(key.as_str()), row_id) {
                    return Some(found);
                }
            }
        }
        None
    }

    walk(field.active_rows(), None, row_id)
}

/// Mutable view over one row list and, at the root, the field's `rowOrder`.
///
/// Resolving never writes to the document. A nested list that does not exist
/// yet is only created by [`RowList::insert`].
pub struct RowList<'a> {
    field_id: String,
    slot: Slot<'a>,
}

enum Slot<'a> {
    Root {
        rows: &'a mut Vec<ValueElement>,
        order: Option<&'a mut Vec<String>>,
    },
    Nested {
        parent: &'a mut ValueElement,
        schema_id: String,
    },
}

fn find_active<'r>(rows: &'r mut [ValueElement], row_id: &str) -> Option<&'r mut ValueElement> {
    rows.iter_mut().find(|row| row.id == row_id && row.is_active())
}

impl<'a> RowList<'a> {
    /// Resolves `hops` below `field`. A missing value short-circuits with
    /// [`MutationError::ValueAbsent`]; an unknown or tombstoned parent with
    /// [`MutationError::ParentRowNotFound`].
    pub fn resolve(field: &'a mut Field, hops: &[PathHop]) -> MutationResult<Self> {
        let Field { id, kind, value, .. } = field;
        let field_id = id.clone();

        let row_order = match kind {
            FieldKind::Table { row_order, .. } | FieldKind::Collection { row_order, .. } => row_order,
            _ => return Err(MutationError::NotRowContainer(field_id)),
        };
        let rows = value
            .as_mut()
            .ok_or_else(|| MutationError::ValueAbsent(field_id.clone()))?
            .rows_mut()
            .ok_or_else(|| MutationError::NotRowContainer(field_id.clone()))?;

        let Some((last, ancestors)) = hops.split_last() else {
            return Ok(Self {
                field_id,
                slot: Slot::Root {
                    rows,
                    order: row_order.as_mut(),
                },
            });
        };

        let mut current = rows;
        for (index, hop) in ancestors.iter().enumerate() {
            let list = current;
            let next_row = &hops[index + 1].row_id;
            let parent = find_active(list, &hop.row_id)
                .ok_or_else(|| MutationError::parent_not_found(&field_id, &hop.row_id))?;
            current = match parent.children.get_mut(hop.schema_id.as_str()) {
                Some(children) => &mut children.value,
                None => return Err(MutationError::parent_not_found(&field_id, next_row)),
            };
        }

        let parent = find_active(current, &last.row_id)
            .ok_or_else(|| MutationError::parent_not_found(&field_id, &last.row_id))?;
        Ok(Self {
            field_id,
            slot: Slot::Nested {
                parent,
                schema_id: last.schema_id.clone(),
            },
        })
    }

    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    fn rows(&self) -> &[ValueElement] {
        match &self.slot {
            Slot::Root { rows, .. } => rows.as_slice(),
            Slot::Nested { parent, schema_id } => parent
                .children
                .get(schema_id.as_str())
                .map(|children| children.value.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Stored rows, without creating a missing nested list
    fn existing_rows_mut(&mut self) -> Option<&mut Vec<ValueElement>> {
        match &mut self.slot {
            Slot::Root { rows, .. } => Some(&mut **rows),
            Slot::Nested { parent, schema_id } => parent
                .children
                .get_mut(schema_id.as_str())
                .map(|children| &mut children.value),
        }
    }

    fn order(&self) -> Option<&Vec<String>> {
        match &self.slot {
            Slot::Root { order, .. } => order.as_deref(),
            Slot::Nested { .. } => None,
        }
    }

    /// Whether any row, active or tombstoned, carries `row_id`
    pub fn contains(&self, row_id: &str) -> bool {
        self.rows().iter().any(|row| row.id == row_id)
    }

    /// Ids of the active rows in display order
    pub fn active_ids(&self) -> Vec<String> {
        let rows = self.rows();
        match self.order() {
            Some(order) => {
                let is_active = |id: &str| rows.iter().any(|row| row.id == id && row.is_active());
                let mut ids: Vec<String> = order.iter().filter(|id| is_active(id)).cloned().collect();
                for row in rows {
                    if row.is_active() && !order.contains(&row.id) {
                        ids.push(row.id.clone());
                    }
                }
                ids
            }
            None => rows
                .iter()
                .filter(|row| row.is_active())
                .map(|row| row.id.clone())
                .collect(),
        }
    }

    pub fn active_len(&self) -> usize {
        self.active_ids().len()
    }

    /// Display index of an active row
    pub fn position(&self, row_id: &str) -> Option<usize> {
        self.active_ids().iter().position(|id| id == row_id)
    }

    pub fn row(&self, row_id: &str) -> Option<&ValueElement> {
        self.rows().iter().find(|row| row.id == row_id && row.is_active())
    }

    pub fn row_mut(&mut self, row_id: &str) -> Option<&mut ValueElement> {
        find_active(self.existing_rows_mut()?, row_id)
    }

    /// Inserts `row` so that it lands at display `index`; a missing or
    /// out-of-range index appends. Returns the final display index.
    pub fn insert(&mut self, row: ValueElement, index: Option<usize>) -> usize {
        let active = self.active_ids();
        let index = index.filter(|i| *i < active.len());
        let anchor = index.map(|i| active[i].as_str());

        match &mut self.slot {
            Slot::Root { rows, order: Some(order) } => {
                let at = anchor
                    .and_then(|a| order.iter().position(|id| id == a))
                    .unwrap_or(order.len());
                order.insert(at, row.id.clone());
                rows.push(row);
            }
            Slot::Root { rows, order: None } => insert_at_anchor(rows, anchor, row),
            Slot::Nested { parent, schema_id } => {
                let rows = &mut parent.children.entry(schema_id.clone()).or_default().value;
                insert_at_anchor(rows, anchor, row);
            }
        }

        index.unwrap_or(active.len())
    }

    /// Moves an active row to display `index`, clamped to the list bounds
    pub fn move_to(&mut self, row_id: &str, index: usize) -> MutationResult<usize> {
        if self.position(row_id).is_none() {
            return Err(MutationError::row_not_found(&self.field_id, row_id));
        }

        let row = if let Slot::Root { order: Some(order), .. } = &mut self.slot {
            order.retain(|id| id != row_id);
            None
        } else {
            self.existing_rows_mut().and_then(|rows| {
                let at = rows.iter().position(|r| r.id == row_id)?;
                Some(rows.remove(at))
            })
        };

        let remaining = self.active_ids();
        let index = index.min(remaining.len());
        let anchor = remaining.get(index).map(String::as_str);

        if let Slot::Root { order: Some(order), .. } = &mut self.slot {
            let at = anchor
                .and_then(|a| order.iter().position(|id| id == a))
                .unwrap_or(order.len());
            order.insert(at, row_id.to_string());
        } else if let (Some(row), Some(rows)) = (row, self.existing_rows_mut()) {
            insert_at_anchor(rows, anchor, row);
        }

        Ok(index)
    }

    /// Tombstones an active row; it keeps its id and its slot in the order
    pub fn delete(&mut self, row_id: &str) -> MutationResult<()> {
        let field_id = self.field_id.clone();
        let row = self
            .row_mut(row_id)
            .ok_or_else(|| MutationError::row_not_found(&field_id, row_id))?;
        row.deleted = Some(true);
        Ok(())
    }

    /// Merges `cells` into an active row, overwriting on conflict
    pub fn merge_cells(&mut self, row_id: &str, cells: &BTreeMap<String, FieldValue>) -> MutationResult<()> {
        let field_id = self.field_id.clone();
        let row = self
            .row_mut(row_id)
            .ok_or_else(|| MutationError::row_not_found(&field_id, row_id))?;
        for (column, value) in cells {
            row.cells.insert(column.clone(), value.clone());
        }
        Ok(())
    }
}

/// Stored-sequence insert before `anchor`, or at the end
fn insert_at_anchor(rows: &mut Vec<ValueElement>, anchor: Option<&str>, row: ValueElement) {
    let at = anchor
        .and_then(|a| rows.iter().position(|r| r.id == a))
        .unwrap_or(rows.len());
    rows.insert(at, row);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(ids: &[&str]) -> Field {
        let rows: Vec<ValueElement> = ids.iter().map(|id| ValueElement::new(*id)).collect();
        Field::new(
            "t1",
            FieldKind::Table {
                table_columns: Vec::new(),
                row_order: Some(ids.iter().map(|id| id.to_string()).collect()),
            },
        )
        .with_value(rows)
    }

    #[test]
    fn test_insert_at_index_and_append() {
        let mut field = table(&["a", "b", "c"]);
        let mut list = RowList::resolve(&mut field, &[]).unwrap();
        assert_eq!(list.insert(ValueElement::new("x"), Some(1)), 1);
        assert_eq!(list.insert(ValueElement::new("y"), Some(99)), 4);
        assert_eq!(list.insert(ValueElement::new("z"), None), 5);
        assert_eq!(list.active_ids(), vec!["a", "x", "b", "c", "y", "z"]);
    }

    #[test]
    fn test_tombstones_are_skipped_but_kept() {
        let mut field = table(&["a", "b", "c"]);
        {
            let mut list = RowList::resolve(&mut field, &[]).unwrap();
            list.delete("b").unwrap();
            assert_eq!(list.active_ids(), vec!["a", "c"]);
            assert!(list.contains("b"));
            assert!(list.delete("b").is_err());
            list.insert(ValueElement::new("x"), Some(1));
            assert_eq!(list.active_ids(), vec!["a", "x", "c"]);
        }
        assert_eq!(field.row_order().map(Vec::len), Some(4));
    }

    #[test]
    fn test_move_clamps() {
        let mut field = table(&["a", "b", "c"]);
        let mut list = RowList::resolve(&mut field, &[]).unwrap();
        assert_eq!(list.move_to("a", 10).unwrap(), 2);
        assert_eq!(list.active_ids(), vec!["b", "c", "a"]);
        list.move_to("a", 0).unwrap();
        assert_eq!(list.active_ids(), vec!["a", "b", "c"]);
        assert!(list.move_to("missing", 0).is_err());
    }

    #[test]
    fn test_absent_value_short_circuits() {
        let mut field = Field::new(
            "t1",
            FieldKind::Table {
                table_columns: Vec::new(),
                row_order: None,
            },
        );
        assert!(matches!(
            RowList::resolve(&mut field, &[]),
            Err(MutationError::ValueAbsent(_))
        ));
        assert_eq!(field.row_order(), None);
    }

    #[test]
    fn test_find_row_descends_into_children() {
        let mut parent = ValueElement::new("r1");
        let mut gone = ValueElement::new("c2");
        gone.deleted = Some(true);
        parent.children.entry("schemaA".into()).or_default().value = vec![ValueElement::new("c1"), gone];
        let field = Field::new(
            "col",
            FieldKind::Collection {
                schema: BTreeMap::new(),
                row_order: None,
            },
        )
        .with_value(vec![parent]);

        assert_eq!(find_row(&field, "r1").map(|(_, key)| key), Some(None));
        assert_eq!(find_row(&field, "c1").map(|(_, key)| key), Some(Some("schemaA")));
        assert!(find_row(&field, "c2").is_none());
    }

    #[test]
    fn test_nested_resolution() {
        let mut parent = ValueElement::new("r1");
        parent.children.entry("schemaA".into()).or_default().value = vec![ValueElement::new("c1")];
        let mut field = Field::new(
            "col",
            FieldKind::Collection {
                schema: BTreeMap::new(),
                row_order: None,
            },
        )
        .with_value(vec![parent]);

        let path = RowPath::root("col").nested("r1", "schemaA");
        let mut list = RowList::resolve(&mut field, &path.hops).unwrap();
        list.insert(ValueElement::new("c0"), Some(0));
        assert_eq!(list.active_ids(), vec!["c0", "c1"]);

        let missing = RowPath::root("col").nested("nope", "schemaA");
        assert!(matches!(
            RowList::resolve(&mut field, &missing.hops),
            Err(MutationError::ParentRowNotFound { .. })
        ));
        assert_eq!(path.to_string(), "col/r1:schemaA");
    }

    #[test]
    fn test_failed_operations_leave_field_untouched() {
        let mut field = Field::new(
            "col",
            FieldKind::Collection {
                schema: BTreeMap::new(),
                row_order: None,
            },
        )
        .with_value(vec![ValueElement::new("r1")]);
        let before = field.clone();
        let cells = BTreeMap::from([("a".to_string(), FieldValue::from(1.0))]);

        let mut root = RowList::resolve(&mut field, &[]).unwrap();
        assert!(root.merge_cells("ghost", &cells).is_err());
        assert!(root.move_to("ghost", 0).is_err());

        let nested = RowPath::root("col").nested("r1", "sub");
        let mut list = RowList::resolve(&mut field, &nested.hops).unwrap();
        assert!(list.active_ids().is_empty());
        assert!(list.delete("ghost").is_err());
        assert_eq!(field, before);

        let mut list = RowList::resolve(&mut field, &nested.hops).unwrap();
        list.insert(ValueElement::new("c1"), None);
        let rows = field.active_rows();
        assert_eq!(rows[0].active_children("sub").len(), 1);
        assert_eq!(field.row_order(), None);
    }
}
