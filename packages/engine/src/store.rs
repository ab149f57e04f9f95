//! # Document Store
//!
//! Owns the in-memory document of one edit session.
//!
//! ```text
//! load → check integrity → apply mutations (version += 1 each) → save
//! ```
//!
//! The store has no logic of its own beyond lookups and structural
//! integrity; visibility, formulas and validation read from it.

use crate::errors::{EditorResult, MutationResult};
use crate::mutations::Mutation;
use crate::post_effects::PostEffectEngine;
use formdoc_model::{Document, Field, File, IDGenerator, Page};
use tracing::debug;

#[derive(Debug)]
pub struct DocumentStore {
    document: Document,

    /// Current version number (increments on each applied mutation)
    pub version: u64,

    ids: IDGenerator,
}

impl DocumentStore {
    /// Wrap a document after checking that every field position resolves
    pub fn new(document: Document) -> EditorResult<Self> {
        document.check_integrity()?;
        let scope = document.identifier.clone().unwrap_or_else(|| document.id.clone());
        Ok(Self {
            ids: IDGenerator::new(&scope),
            document,
            version: 0,
        })
    }

    pub fn from_json_str(source: &str) -> EditorResult<Self> {
        Self::new(Document::from_json_str(source)?)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for structural edits (page duplication and deletion)
    pub(crate) fn document_mut(&mut self) -> &mut Document {
        self.version += 1;
        &mut self.document
    }

    /// Document and id generator borrowed together, for edits that mint ids
    pub(crate) fn parts_mut(&mut self) -> (&mut Document, &mut IDGenerator) {
        self.version += 1;
        (&mut self.document, &mut self.ids)
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_string(&self, pretty: bool) -> EditorResult<String> {
        Ok(self.document.to_json_string(pretty)?)
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.document.field(field_id)
    }

    pub fn field_by_identifier(&self, identifier: &str) -> Option<&Field> {
        self.document.field_by_identifier(identifier)
    }

    pub fn file(&self) -> Option<&File> {
        self.document.first_file()
    }

    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.document.files.iter().find_map(|file| file.page(page_id))
    }

    /// Fresh object id scoped to this document
    pub fn new_id(&mut self) -> String {
        self.ids.new_id()
    }

    pub fn apply(&mut self, mutation: &Mutation) -> MutationResult<()> {
        mutation.apply(&mut self.document)?;
        self.version += 1;
        debug!(field_id = %mutation.field_id(), version = self.version, "Applied mutation");
        Ok(())
    }

    /// Apply a mutation and its cascade. Every applied mutation counts as a
    /// version.
    pub fn apply_with_effects(&mut self, effects: &PostEffectEngine, mutation: Mutation) -> MutationResult<Vec<Mutation>> {
        let applied = effects.apply_with_effects(mutation, &mut self.document)?;
        self.version += applied.len() as u64;
        debug!(applied = applied.len(), version = self.version, "Applied mutation with effects");
        Ok(applied)
    }
}
