//! # Post-Effect System
//!
//! Mutations trigger cascading effects to keep derived values consistent.
//!
//! ## Design
//!
//! When a mutation changes a field, other fields may need new values:
//! - Editing a number → recompute formulas reading it
//! - Editing a table row → recompute aggregates over that table
//! - A recomputed formula → recompute formulas reading the result
//!
//! An effect returns the whole cascade for its trigger at once, each target
//! at most once and in dependency order. Secondary mutations are applied but
//! not analysed again, so cyclic dependencies cannot loop.

use crate::errors::MutationResult;
use crate::formulas::FormulaGraph;
use crate::mutations::Mutation;
use formdoc_formula::Evaluator;
use formdoc_model::Document;
use tracing::{debug, instrument};

/// Post-effect that can be triggered by a mutation
pub trait PostEffect: std::fmt::Debug {
    /// Analyze the mutation and generate secondary mutations if needed
    fn analyze(&self, mutation: &Mutation, doc: &Document) -> Vec<Mutation>;
}

/// Recompute formulas depending on the mutated field
#[derive(Debug, Default)]
pub struct FormulaRecalculation {
    evaluator: Evaluator,
}

impl PostEffect for FormulaRecalculation {
    #[instrument(skip(self, mutation, doc), fields(field_id = %mutation.field_id()))]
    fn analyze(&self, mutation: &Mutation, doc: &Document) -> Vec<Mutation> {
        let graph = FormulaGraph::build(doc);
        let dependents = graph.dependents_of(mutation.field_id());
        if dependents.is_empty() {
            return Vec::new();
        }
        debug!(count = dependents.len(), "Recalculating dependent formulas");
        graph.recalculate(doc, &self.evaluator, dependents)
    }
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(FormulaRecalculation::default())],
        }
    }

    pub fn with_effects(effects: Vec<Box<dyn PostEffect>>) -> Self {
        Self { effects }
    }

    /// Analyze a mutation and generate all secondary mutations
    pub fn analyze(&self, mutation: &Mutation, doc: &Document) -> Vec<Mutation> {
        let mut secondary_mutations = Vec::new();

        for effect in &self.effects {
            let mut effect_mutations = effect.analyze(mutation, doc);
            secondary_mutations.append(&mut effect_mutations);
        }

        secondary_mutations
    }

    /// Apply a mutation with all its post-effects. Returns every mutation
    /// applied, the primary one first.
    pub fn apply_with_effects(&self, mutation: Mutation, doc: &mut Document) -> MutationResult<Vec<Mutation>> {
        mutation.apply(doc)?;

        let secondary = self.analyze(&mutation, doc);
        let mut applied_mutations = vec![mutation];
        for secondary_mutation in secondary {
            secondary_mutation.apply(doc)?;
            applied_mutations.push(secondary_mutation);
        }

        Ok(applied_mutations)
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}
