//! # Formula bindings
//!
//! Evaluates the document formulas bound to fields and orders their
//! recalculation.
//!
//! ```text
//! field.formulas[i].formula ──▶ document.formulas[id].expression
//!                                         │ parse + root_references
//!                                         ▼
//!                         dependency graph over field ids
//! ```
//!
//! Names resolve to fields by identifier first, then by id. Table and
//! collection values are exposed as arrays of active row objects.

use crate::mutations::Mutation;
use formdoc_formula::{parse, root_references, EvaluationContext, Evaluator, Expression, Value};
use formdoc_model::{Document, Field, FieldValue, ValueElement};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Resolves formula names against a document, with pending results layered
/// on top so a cascade sees values computed earlier in the same pass.
pub struct DocumentContext<'a> {
    doc: &'a Document,
    current: Option<&'a str>,
    overrides: &'a HashMap<String, Option<FieldValue>>,
}

impl<'a> DocumentContext<'a> {
    pub fn new(
        doc: &'a Document,
        current: Option<&'a str>,
        overrides: &'a HashMap<String, Option<FieldValue>>,
    ) -> Self {
        Self { doc, current, overrides }
    }

    fn field_value(&self, field: &Field) -> Value {
        let value = match self.overrides.get(&field.id) {
            Some(value) => value.as_ref(),
            None => field.value.as_ref(),
        };
        field_to_value(field, value)
    }
}

impl EvaluationContext for DocumentContext<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        let field = match name {
            "current" | "self" => self.doc.field(self.current?),
            _ => self
                .doc
                .field_by_identifier(name)
                .or_else(|| self.doc.field(name)),
        }?;
        Some(self.field_value(field))
    }
}

/// Formula view of a field value
pub fn field_to_value(field: &Field, value: Option<&FieldValue>) -> Value {
    let Some(value) = value else {
        return Value::Null;
    };
    if !field.is_row_container() {
        return Value::from_json(&value.to_json());
    }

    let Some(rows) = value.rows() else {
        return Value::Null;
    };
    let active: Vec<&ValueElement> = match field.row_order() {
        Some(order) => {
            let mut ordered: Vec<&ValueElement> = order
                .iter()
                .filter_map(|id| rows.iter().find(|row| &row.id == id))
                .filter(|row| row.is_active())
                .collect();
            ordered.extend(rows.iter().filter(|row| row.is_active() && !order.contains(&row.id)));
            ordered
        }
        None => rows.iter().filter(|row| row.is_active()).collect(),
    };
    Value::Array(active.into_iter().map(|row| row_to_value(field, row)).collect())
}

fn row_to_value(field: &Field, row: &ValueElement) -> Value {
    let mut object = BTreeMap::new();
    object.insert("_id".to_string(), Value::String(row.id.clone()));

    for (column_id, cell) in &row.cells {
        let value = Value::from_json(&cell.to_json());
        if let Some(title) = crate::logic::find_column(field, column_id).and_then(|c| c.title.as_deref()) {
            object.insert(title.to_lowercase(), value.clone());
        }
        object.insert(column_id.clone(), value);
    }

    if let Some(schemas) = field.schema() {
        let mut children = BTreeMap::new();
        for (key, _) in schemas.iter().filter(|(_, schema)| !schema.root) {
            let rows = row
                .active_children(key)
                .into_iter()
                .map(|child| row_to_value(field, child))
                .collect();
            children.insert(key.clone(), Value::Array(rows));
        }
        object.insert("children".to_string(), Value::Object(children));
    }

    Value::Object(object)
}

/// Formula result written back into a field; null clears the value
pub fn value_to_field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null | Value::Lambda { .. } => None,
        other => Some(FieldValue::from_json(other.to_json())),
    }
}

/// One `(field, formula)` binding
#[derive(Debug, Clone)]
pub struct FormulaBinding {
    pub field_id: String,
    pub formula_id: String,
    expression: Option<Expression>,
    depends_on: BTreeSet<String>,
}

/// Dependency graph over formula-bound fields
#[derive(Debug, Default)]
pub struct FormulaGraph {
    bindings: Vec<FormulaBinding>,
    order: Vec<usize>,
    cyclic: HashSet<String>,
}

impl FormulaGraph {
    pub fn build(doc: &Document) -> Self {
        let mut bindings = Vec::new();
        for field in &doc.fields {
            for applied in field.formulas.iter().filter(|f| f.key == "value") {
                let parsed = doc.formula(&applied.formula).map(|f| parse(&f.expression));
                let expression = match parsed {
                    Some(Ok(expr)) => Some(expr),
                    Some(Err(err)) => {
                        warn!(field_id = %field.id, formula = %applied.formula, error = %err, "Formula does not parse");
                        None
                    }
                    None => {
                        warn!(field_id = %field.id, formula = %applied.formula, "Unknown formula");
                        None
                    }
                };
                let depends_on = expression
                    .as_ref()
                    .map(|expr| {
                        root_references(expr)
                            .into_iter()
                            .filter_map(|name| resolve_field_id(doc, &name))
                            .filter(|id| id != &field.id)
                            .collect()
                    })
                    .unwrap_or_default();

                bindings.push(FormulaBinding {
                    field_id: field.id.clone(),
                    formula_id: applied.formula.clone(),
                    expression,
                    depends_on,
                });
            }
        }

        let mut graph = Self {
            bindings,
            ..Self::default()
        };
        graph.sort();
        graph
    }

    pub fn bindings(&self) -> &[FormulaBinding] {
        &self.bindings
    }

    pub fn is_cyclic(&self, field_id: &str) -> bool {
        self.cyclic.contains(field_id)
    }

    /// Kahn's algorithm; whatever cannot be ordered sits on a cycle
    fn sort(&mut self) {
        let produced: HashSet<&str> = self.bindings.iter().map(|b| b.field_id.as_str()).collect();
        let mut indegree: Vec<usize> = self
            .bindings
            .iter()
            .map(|b| b.depends_on.iter().filter(|d| produced.contains(d.as_str())).count())
            .collect();

        let mut queue: VecDeque<usize> = (0..self.bindings.len()).filter(|i| indegree[*i] == 0).collect();
        let mut order = Vec::new();
        while let Some(i) = queue.pop_front() {
            order.push(i);
            let produced_id = &self.bindings[i].field_id;
            for (j, other) in self.bindings.iter().enumerate() {
                if other.depends_on.contains(produced_id) && indegree[j] > 0 {
                    indegree[j] -= 1;
                    if indegree[j] == 0 {
                        queue.push_back(j);
                    }
                }
            }
        }

        let ordered: HashSet<usize> = order.iter().copied().collect();
        let cyclic: HashSet<String> = (0..self.bindings.len())
            .filter(|i| !ordered.contains(i))
            .map(|i| self.bindings[i].field_id.clone())
            .collect();
        for field_id in &cyclic {
            warn!(field_id = %field_id, "Formula takes part in a cycle");
        }

        self.order = order;
        self.cyclic = cyclic;
    }

    /// Bindings reading `field_id` directly or transitively, in evaluation order
    pub fn dependents_of(&self, field_id: &str) -> Vec<&FormulaBinding> {
        let mut affected: HashSet<&str> = HashSet::from([field_id]);
        let mut out = Vec::new();
        for &i in &self.order {
            let binding = &self.bindings[i];
            if binding.depends_on.iter().any(|d| affected.contains(d.as_str())) {
                affected.insert(&binding.field_id);
                out.push(binding);
            }
        }
        out
    }

    /// Recomputes `bindings` in order and returns value replacements for
    /// those whose result differs from the stored value.
    pub fn recalculate<'b>(
        &self,
        doc: &Document,
        evaluator: &Evaluator,
        bindings: impl IntoIterator<Item = &'b FormulaBinding>,
    ) -> Vec<Mutation> {
        let mut overrides: HashMap<String, Option<FieldValue>> = HashMap::new();
        let mut mutations = Vec::new();

        for binding in bindings {
            let value = if self.is_cyclic(&binding.field_id) {
                None
            } else {
                evaluate_binding(doc, evaluator, binding, &overrides)
            };
            let stored = doc.field(&binding.field_id).and_then(|f| f.value.clone());
            if value != stored {
                mutations.push(Mutation::ReplaceValue {
                    field_id: binding.field_id.clone(),
                    value: value.clone(),
                });
            }
            overrides.insert(binding.field_id.clone(), value);
        }

        mutations
    }

    /// Every binding in dependency order, cycles last (they resolve to null)
    pub fn recalculate_all(&self, doc: &Document, evaluator: &Evaluator) -> Vec<Mutation> {
        let ordered = self.order.iter().map(|&i| &self.bindings[i]);
        let cyclic = self.bindings.iter().filter(|b| self.is_cyclic(&b.field_id));
        self.recalculate(doc, evaluator, ordered.chain(cyclic))
    }
}

fn resolve_field_id(doc: &Document, name: &str) -> Option<String> {
    doc.field_by_identifier(name)
        .or_else(|| doc.field(name))
        .map(|field| field.id.clone())
}

fn evaluate_binding(
    doc: &Document,
    evaluator: &Evaluator,
    binding: &FormulaBinding,
    overrides: &HashMap<String, Option<FieldValue>>,
) -> Option<FieldValue> {
    let expression = binding.expression.as_ref()?;
    let ctx = DocumentContext::new(doc, Some(&binding.field_id), overrides);
    match evaluator.evaluate(expression, &ctx) {
        Ok(value) => {
            debug!(field_id = %binding.field_id, result = %value, "Evaluated formula");
            value_to_field_value(&value)
        }
        Err(err) => {
            warn!(field_id = %binding.field_id, formula = %binding.formula_id, error = %err, "Formula evaluation failed");
            None
        }
    }
}

/// Evaluates a standalone expression against a document
pub fn evaluate_expression(doc: &Document, source: &str) -> formdoc_formula::EvalResult<Value> {
    let overrides = HashMap::new();
    let ctx = DocumentContext::new(doc, None, &overrides);
    Evaluator::new().evaluate_str(source, &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Document {
        Document::from_json(json!({
            "fields": [
                { "_id": "f1", "identifier": "price", "type": "number", "value": 4 },
                { "_id": "f2", "identifier": "qty", "type": "number", "value": 3 },
                { "_id": "f3", "identifier": "total", "type": "number", "formulas": [ { "formula": "fx_total" } ] },
                { "_id": "f4", "identifier": "taxed", "type": "number", "formulas": [ { "formula": "fx_taxed" } ] },
                { "_id": "a", "identifier": "a", "type": "number", "formulas": [ { "formula": "fx_a" } ] },
                { "_id": "b", "identifier": "b", "type": "number", "formulas": [ { "formula": "fx_b" } ] },
                { "_id": "items", "identifier": "items", "type": "table",
                  "tableColumns": [ { "_id": "c1", "type": "number", "title": "Amount" } ],
                  "rowOrder": ["r2", "r1"],
                  "value": [
                      { "_id": "r1", "cells": { "c1": 5 } },
                      { "_id": "r2", "cells": { "c1": 7 } },
                      { "_id": "r3", "cells": { "c1": 100 }, "deleted": true }
                  ] }
            ],
            "formulas": [
                { "_id": "fx_total", "expression": "price * qty" },
                { "_id": "fx_taxed", "expression": "total * 2" },
                { "_id": "fx_a", "expression": "b + 1" },
                { "_id": "fx_b", "expression": "a + 1" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_recalculate_all_orders_dependencies() {
        let doc = document();
        let graph = FormulaGraph::build(&doc);
        let mutations = graph.recalculate_all(&doc, &Evaluator::new());

        let values: HashMap<&str, Option<FieldValue>> = mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::ReplaceValue { field_id, value } => Some((field_id.as_str(), value.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(values["f3"].as_ref().and_then(FieldValue::as_number), Some(12.0));
        assert_eq!(values["f4"].as_ref().and_then(FieldValue::as_number), Some(24.0));
        // cycle members stay absent
        assert!(!values.contains_key("a"));
        assert!(graph.is_cyclic("a") && graph.is_cyclic("b"));
    }

    #[test]
    fn test_dependents_are_transitive() {
        let doc = document();
        let graph = FormulaGraph::build(&doc);
        let ids: Vec<&str> = graph.dependents_of("f1").iter().map(|b| b.field_id.as_str()).collect();
        assert_eq!(ids, vec!["f3", "f4"]);
        assert!(graph.dependents_of("items").is_empty());
    }

    #[test]
    fn test_table_rows_are_exposed_in_order() {
        let doc = document();
        assert_eq!(
            evaluate_expression(&doc, "map(items, (row) -> row.amount)").unwrap(),
            Value::Array(vec![Value::Number(7.0), Value::Number(5.0)])
        );
        assert_eq!(evaluate_expression(&doc, "sum(items.c1)").unwrap(), Value::Number(12.0));
        assert_eq!(evaluate_expression(&doc, "items.0._id").unwrap(), Value::String("r2".into()));
    }

    #[test]
    fn test_current_refers_to_written_field() {
        let doc = document();
        let overrides = HashMap::new();
        let ctx = DocumentContext::new(&doc, Some("f1"), &overrides);
        assert_eq!(ctx.lookup("current"), Some(Value::Number(4.0)));
        assert_eq!(ctx.lookup("f2"), Some(Value::Number(3.0)));
        assert_eq!(ctx.lookup("missing"), None);
    }

    #[test]
    fn test_null_results_clear_the_value() {
        assert_eq!(value_to_field_value(&Value::Null), None);
        assert_eq!(
            value_to_field_value(&Value::String("x".into())),
            Some(FieldValue::from("x"))
        );
    }
}
