//! Model definitions.
//!
//! A `ModelDef` is the static description of one table-backed model: its
//! name, table, primary key, and relations. Definitions are created once
//! by factory functions and shared via `Arc`; relations are registered in
//! a single one-shot call after all participating models exist.

use std::fmt;
use std::sync::{Arc, OnceLock};

use cerulean_core::{Error, Result};

use crate::relation::Relation;

/// Static description of a table-backed model.
pub struct ModelDef {
    name: String,
    table: String,
    primary_key: String,
    relations: OnceLock<Vec<Arc<dyn Relation>>>,
}

impl ModelDef {
    /// Create a new shared model definition.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            table: table.into(),
            primary_key: primary_key.into(),
            relations: OnceLock::new(),
        })
    }

    /// The model name, e.g. `"Post"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing table name, e.g. `"posts"`.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The primary key column.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Register this model's relations. One-shot: a second call is a
    /// programmer error.
    pub fn define_relations(&self, relations: Vec<Arc<dyn Relation>>) -> Result<()> {
        self.relations.set(relations).map_err(|_| {
            Error::Custom(format!(
                "relations for model '{}' are already defined",
                self.name
            ))
        })
    }

    /// All registered relations, empty before `define_relations`.
    pub fn relations(&self) -> &[Arc<dyn Relation>] {
        self.relations.get().map_or(&[], Vec::as_slice)
    }

    /// Look up a relation by name.
    pub fn relation(&self, name: &str) -> Option<Arc<dyn Relation>> {
        self.relations()
            .iter()
            .find(|relation| relation.name() == name)
            .cloned()
    }

    /// The relation managing `attribute` as its foreign key, if any.
    ///
    /// Guarded attributes cannot be written directly; they change through
    /// `associate` / `disassociate`.
    pub fn guarding(&self, attribute: &str) -> Option<&str> {
        self.relations()
            .iter()
            .find(|relation| relation.owner_foreign_key() == Some(attribute))
            .map(|relation| relation.name())
    }
}

impl fmt::Debug for ModelDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Relations reference other models; printing them would cycle.
        f.debug_struct("ModelDef")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("relations", &self.relations().len())
            .finish()
    }
}
