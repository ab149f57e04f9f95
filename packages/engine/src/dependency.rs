//! # Visibility dependency index
//!
//! Caches the visibility of every logic-bearing target and maps each source
//! field to the targets whose conditions read it.
//!
//! ```text
//! source field ──▶ { Field(f), Page(p), Column(t, c), Schema(col, row, key) }
//! ```
//!
//! Schema targets depend on the collection field that owns the rows, since
//! their conditions read that collection's cells.

use crate::logic::LogicEvaluator;
use formdoc_model::{Document, Field, Logic, ValueElement};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VisibilityTarget {
    Field(String),
    Page(String),
    Column { field_id: String, column_id: String },
    Schema { field_id: String, row_id: String, schema_key: String },
}

impl VisibilityTarget {
    /// Id reported to callers: the page id, or the owning field id
    pub fn owner_id(&self) -> &str {
        match self {
            VisibilityTarget::Field(id) | VisibilityTarget::Page(id) => id,
            VisibilityTarget::Column { field_id, .. } | VisibilityTarget::Schema { field_id, .. } => field_id,
        }
    }

    fn evaluate(&self, logic: &LogicEvaluator<'_>) -> bool {
        match self {
            VisibilityTarget::Field(id) => logic.should_show_field(id),
            VisibilityTarget::Page(id) => logic.should_show_page(id),
            VisibilityTarget::Column { field_id, column_id } => logic.should_show_column(field_id, column_id),
            VisibilityTarget::Schema { field_id, row_id, schema_key } => {
                logic.should_show_schema(field_id, row_id, schema_key)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct VisibilityCache {
    active_view: String,
    visible: HashMap<VisibilityTarget, bool>,
    dependents: HashMap<String, BTreeSet<VisibilityTarget>>,
}

impl VisibilityCache {
    pub fn build(doc: &Document, active_view: &str) -> Self {
        let mut cache = Self {
            active_view: active_view.to_string(),
            ..Self::default()
        };
        cache.rebuild(doc);
        cache
    }

    /// Re-index every target and recompute its visibility
    pub fn rebuild(&mut self, doc: &Document) {
        self.visible.clear();
        self.dependents.clear();

        for (source, target) in index_targets(doc) {
            self.dependents.entry(source).or_default().insert(target);
        }

        let logic = LogicEvaluator::new(doc, &self.active_view);
        for target in self.dependents.values().flatten() {
            self.visible.insert(target.clone(), target.evaluate(&logic));
        }
        debug!(targets = self.visible.len(), "Built visibility cache");
    }

    /// Cached visibility, evaluated on the fly for unindexed targets
    pub fn is_visible(&self, doc: &Document, target: &VisibilityTarget) -> bool {
        match self.visible.get(target) {
            Some(visible) => *visible,
            None => target.evaluate(&LogicEvaluator::new(doc, &self.active_view)),
        }
    }

    /// Targets whose conditions read `field_id`
    pub fn dependents_of(&self, field_id: &str) -> impl Iterator<Item = &VisibilityTarget> {
        self.dependents.get(field_id).into_iter().flatten()
    }

    /// Re-evaluates the dependents of `changed` and returns the targets
    /// whose visibility flipped.
    pub fn refresh(&mut self, doc: &Document, changed: &str) -> Vec<VisibilityTarget> {
        // rows may have been created under a collection; pick up new schema targets
        if doc.field(changed).is_some_and(|f| f.schema().is_some()) {
            let fresh: Vec<VisibilityTarget> = index_targets(doc)
                .into_iter()
                .filter(|(source, _)| source == changed)
                .map(|(_, target)| target)
                .collect();
            let entry = self.dependents.entry(changed.to_string()).or_default();
            entry.extend(fresh);
        }

        let Some(targets) = self.dependents.get(changed) else {
            return Vec::new();
        };

        let logic = LogicEvaluator::new(doc, &self.active_view);
        let mut flipped = Vec::new();
        for target in targets {
            let now = target.evaluate(&logic);
            let before = self.visible.insert(target.clone(), now).unwrap_or(true);
            if before != now {
                flipped.push(target.clone());
            }
        }
        flipped
    }

    /// Ids (pages, or owning fields) whose visibility flipped because
    /// `changed` changed. Each id appears once.
    pub fn fields_needs_to_be_refreshed(&mut self, doc: &Document, changed: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.refresh(doc, changed)
            .into_iter()
            .filter_map(|target| {
                let id = target.owner_id().to_string();
                seen.insert(id.clone()).then_some(id)
            })
            .collect()
    }
}

fn index_targets(doc: &Document) -> Vec<(String, VisibilityTarget)> {
    let mut out = Vec::new();
    let mut add = |logic: Option<&Logic>, target: &VisibilityTarget| {
        for source in logic.into_iter().flat_map(|l| l.source_fields()) {
            out.push((source.to_string(), target.clone()));
        }
    };

    for file in &doc.files {
        let pages = file.pages.iter().chain(file.views.iter().flat_map(|v| v.pages.iter()));
        for page in pages {
            add(page.logic.as_ref(), &VisibilityTarget::Page(page.id.clone()));
        }
    }

    for field in &doc.fields {
        add(field.logic.as_ref(), &VisibilityTarget::Field(field.id.clone()));

        let columns = field
            .table_columns()
            .iter()
            .chain(field.schema().into_iter().flat_map(|s| s.values()).flat_map(|s| s.table_columns.iter()));
        for column in columns {
            add(
                column.logic.as_ref(),
                &VisibilityTarget::Column {
                    field_id: field.id.clone(),
                    column_id: column.id.clone(),
                },
            );
        }
    }

    for field in doc.fields.iter().filter(|f| f.schema().is_some()) {
        let root = field.root_schema().map(|(key, _)| key);
        collect_schema_targets(field, field.active_rows(), root, &mut out);
    }

    out
}

/// One target per `(row, child schema with logic)` pair, at every depth
fn collect_schema_targets(
    field: &Field,
    rows: Vec<&ValueElement>,
    schema_key: Option<&str>,
    out: &mut Vec<(String, VisibilityTarget)>,
) {
    let Some(schemas) = field.schema() else {
        return;
    };
    let children = schema_key
        .and_then(|key| schemas.get(key))
        .map(|schema| schema.children.clone())
        .unwrap_or_default();

    for row in rows {
        for child_key in &children {
            let has_logic = schemas
                .get(child_key)
                .is_some_and(|schema| !schema.logic.as_ref().map_or(true, |l| l.conditions().is_empty()));
            if has_logic {
                out.push((
                    field.id.clone(),
                    VisibilityTarget::Schema {
                        field_id: field.id.clone(),
                        row_id: row.id.clone(),
                        schema_key: child_key.clone(),
                    },
                ));
            }
            collect_schema_targets(field, row.active_children(child_key), Some(child_key), out);
        }
    }
}
