//! The relation contract.
//!
//! A relation connects an owner model to a related model and knows how to
//! join them, batch-load them, and wire loaded entities together. The
//! trait is object-safe: model definitions hold `Arc<dyn Relation>` and
//! eager loading drives prefetch through boxed futures.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use asupersync::{Cx, Outcome};
use cerulean_core::inflect::{pluralize, singularize};
use cerulean_core::{Adapter, Error, ExecutionResult, Result, Value};
use cerulean_dialect::{Condition, Grammar};

use crate::entity::{Entity, EntityRef};
use crate::model::ModelDef;

/// Boxed future returned by [`Relation::prefetch`].
pub type RelationFuture<'a> =
    Pin<Box<dyn Future<Output = Outcome<PrefetchResult, Error>> + Send + 'a>>;

/// Options controlling in-memory association wiring.
#[derive(Debug, Clone, Copy)]
pub struct AssociateOptions {
    /// Also wire the inverse side of loaded related entities
    pub follow: bool,
    /// Write the managed foreign key attribute (marks it dirty)
    pub attrs: bool,
}

impl Default for AssociateOptions {
    fn default() -> Self {
        Self {
            follow: true,
            attrs: true,
        }
    }
}

impl AssociateOptions {
    /// Wiring used by eager-load hydration: caches only, nothing dirtied.
    pub const fn hydration() -> Self {
        Self {
            follow: false,
            attrs: false,
        }
    }
}

/// Precomputed accessor member names for a relation, derived once from the
/// relation name at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationAccessors {
    /// e.g. `fetch_author`
    pub fetch: String,
    /// e.g. `set_author`
    pub set: String,
    /// e.g. `create_author`
    pub create: String,
    /// Pluralized collection name, e.g. `authors`
    pub collection: String,
}

impl RelationAccessors {
    /// Derive accessor names from a relation name.
    pub fn derive(name: &str, is_singular: bool) -> Self {
        let singular = if is_singular {
            name.to_string()
        } else {
            singularize(name)
        };
        Self {
            fetch: format!("fetch_{singular}"),
            set: format!("set_{singular}"),
            create: format!("create_{singular}"),
            collection: pluralize(&singular),
        }
    }
}

/// Batched prefetch output: related entities grouped by their join-key
/// value, keyed by the canonical [`Value::group_key`] string. Transient;
/// consumed by [`Relation::associate_prefetch_results`].
#[derive(Debug, Default)]
pub struct PrefetchResult {
    groups: HashMap<String, Vec<EntityRef>>,
}

impl PrefetchResult {
    /// An empty result, used when no owner carries a key.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Group related entities fetched in `result` by `column`.
    pub fn group_by_column(
        model: &Arc<ModelDef>,
        result: &ExecutionResult,
        column: &str,
    ) -> Self {
        let mut groups: HashMap<String, Vec<EntityRef>> = HashMap::new();
        for row in &result.rows {
            let Some(key) = row.get_by_name(column) else {
                continue;
            };
            let entity = Entity::from_row(Arc::clone(model), row).into_ref();
            groups.entry(key.group_key()).or_default().push(entity);
        }
        Self { groups }
    }

    /// Build a result from already-grouped entities.
    pub fn from_groups(groups: HashMap<String, Vec<EntityRef>>) -> Self {
        Self { groups }
    }

    /// The group for one key value.
    pub fn get(&self, key: &Value) -> Option<&[EntityRef]> {
        self.groups.get(&key.group_key()).map(Vec::as_slice)
    }

    /// All fetched entities across groups.
    pub fn entities(&self) -> impl Iterator<Item = &EntityRef> {
        self.groups.values().flatten()
    }

    /// Iterate groups as `(canonical key, entities)` pairs.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[EntityRef])> {
        self.groups
            .iter()
            .map(|(key, entities)| (key.as_str(), entities.as_slice()))
    }

    /// Number of distinct key groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether nothing was fetched.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Distinct non-null key values for `column` across `owners`, in
/// first-seen order. Batched IN lists are built from this, keeping
/// rendered statements deterministic.
pub fn collect_keys(owners: &[EntityRef], column: &str) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut keys = Vec::new();
    for owner in owners {
        let guard = owner.read().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = guard.attribute(column) {
            if !value.is_null() && seen.insert(value.group_key()) {
                keys.push(value.clone());
            }
        }
    }
    keys
}

/// A named connection from an owner model to a related model.
pub trait Relation: Send + Sync {
    /// The relation name on the owner, e.g. `"author"`.
    fn name(&self) -> &str;

    /// The owning model.
    fn owner(&self) -> &Arc<ModelDef>;

    /// The related model.
    fn related(&self) -> &Arc<ModelDef>;

    /// The foreign key column, derived on first access and fixed after.
    fn foreign_key(&self) -> &str;

    /// The primary key column the foreign key references.
    fn primary_key(&self) -> &str;

    /// The inverse relation name on the related model.
    fn inverse(&self) -> &str;

    /// The owner-side column used to match related entities.
    fn join_key(&self) -> &str;

    /// The related-side column used to match related entities.
    fn inverse_key(&self) -> &str;

    /// Whether the relation resolves to at most one entity.
    fn singular(&self) -> bool;

    /// Precomputed accessor names.
    fn accessors(&self) -> &RelationAccessors;

    /// Owner-table attribute this relation manages, if any.
    ///
    /// Attributes returned here are guarded against direct writes.
    fn owner_foreign_key(&self) -> Option<&str> {
        None
    }

    /// The ON condition joining the owner (as `base`) to the related
    /// table (as `related_alias`).
    ///
    /// Composed relations cannot express their path as a single ON
    /// condition and report an error; join their [`Relation::expand`]
    /// hops instead.
    fn join_condition(&self, base: &str, related_alias: &str) -> Result<Condition>;

    /// Constituent hops for composed relations, source hop last.
    ///
    /// Direct relations return an empty vec, meaning the relation itself
    /// is the only hop. Composed relations surface resolution errors here.
    fn expand(&self) -> Result<Vec<Arc<dyn Relation>>> {
        Ok(Vec::new())
    }

    /// Wire owners to related entities in memory.
    fn associate(
        &self,
        owners: &[EntityRef],
        related: &[EntityRef],
        options: AssociateOptions,
    ) -> Result<()>;

    /// Undo in-memory wiring between owners and related entities.
    fn disassociate(&self, owners: &[EntityRef], related: &[EntityRef]) -> Result<()>;

    /// Batch-load related entities for a set of owners.
    ///
    /// Issues at most one statement per direct hop, batching all owner
    /// keys into a single IN list.
    fn prefetch<'a>(
        &'a self,
        cx: &'a Cx,
        adapter: &'a dyn Adapter,
        grammar: &'a dyn Grammar,
        owners: &'a [EntityRef],
    ) -> RelationFuture<'a>;

    /// Wire a prefetch result onto its owners. Hydration wiring: caches
    /// only, never dirties.
    fn associate_prefetch_results(
        &self,
        owners: &[EntityRef],
        result: &PrefetchResult,
    ) -> Result<()>;
}
