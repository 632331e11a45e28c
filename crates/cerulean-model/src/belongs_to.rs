//! Many-to-one relations.

use std::sync::{Arc, OnceLock};

use asupersync::Outcome;
use cerulean_core::error::LookupError;
use cerulean_core::inflect::{pluralize, snake_case};
use cerulean_core::{Adapter, Error, Result, Value};
use cerulean_dialect::{ColumnRef, Condition, Grammar, SelectState};
use tracing::debug;

use crate::entity::EntityRef;
use crate::model::ModelDef;
use crate::relation::{
    AssociateOptions, PrefetchResult, Relation, RelationAccessors, RelationFuture, collect_keys,
};

/// The owner carries a foreign key referencing one related entity.
///
/// Derived settings follow convention: the foreign key is the snake_cased
/// relation name plus `_id`, the referenced key is the related model's
/// primary key, and the inverse is the pluralized owner name. Each is
/// computed on first access and fixed for the relation's lifetime.
pub struct BelongsTo {
    name: String,
    owner: Arc<ModelDef>,
    related: Arc<ModelDef>,
    foreign_key_override: Option<String>,
    primary_key_override: Option<String>,
    inverse_override: Option<String>,
    foreign_key: OnceLock<String>,
    primary_key: OnceLock<String>,
    inverse: OnceLock<String>,
    accessors: RelationAccessors,
}

impl BelongsTo {
    /// Create a belongs-to relation from `owner` to `related`.
    pub fn new(name: impl Into<String>, owner: &Arc<ModelDef>, related: &Arc<ModelDef>) -> Self {
        let name = name.into();
        let accessors = RelationAccessors::derive(&name, true);
        Self {
            name,
            owner: Arc::clone(owner),
            related: Arc::clone(related),
            foreign_key_override: None,
            primary_key_override: None,
            inverse_override: None,
            foreign_key: OnceLock::new(),
            primary_key: OnceLock::new(),
            inverse: OnceLock::new(),
            accessors,
        }
    }

    /// Override the owner-side foreign key column.
    #[must_use]
    pub fn with_foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key_override = Some(column.into());
        self
    }

    /// Override the referenced column on the related table.
    #[must_use]
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key_override = Some(column.into());
        self
    }

    /// Override the inverse relation name on the related model.
    #[must_use]
    pub fn with_inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse_override = Some(name.into());
        self
    }

    fn related_primary_key(&self, entity: &EntityRef) -> Result<Value> {
        let guard = entity.read().unwrap_or_else(|e| e.into_inner());
        guard
            .attribute(self.primary_key())
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(|| {
                Error::Custom(format!(
                    "cannot associate '{}': related '{}' has no '{}' value",
                    self.name,
                    self.related.name(),
                    self.primary_key()
                ))
            })
    }

    /// Pair each owner with its related entity.
    ///
    /// A single related entity is wired to every owner; with several, each
    /// owner is matched by its foreign key against related primary keys.
    fn pair(
        &self,
        owners: &[EntityRef],
        related: &[EntityRef],
    ) -> Result<Vec<(EntityRef, EntityRef)>> {
        if let [single] = related {
            return Ok(owners
                .iter()
                .map(|owner| (Arc::clone(owner), Arc::clone(single)))
                .collect());
        }
        let mut by_key = std::collections::HashMap::new();
        for entity in related {
            let key = self.related_primary_key(entity)?;
            by_key.insert(key.group_key(), Arc::clone(entity));
        }
        let mut pairs = Vec::new();
        for owner in owners {
            let fk = {
                let guard = owner.read().unwrap_or_else(|e| e.into_inner());
                guard.attribute(self.foreign_key()).cloned()
            };
            if let Some(fk) = fk {
                if let Some(entity) = by_key.get(&fk.group_key()) {
                    pairs.push((Arc::clone(owner), Arc::clone(entity)));
                }
            }
        }
        Ok(pairs)
    }
}

impl Relation for BelongsTo {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> &Arc<ModelDef> {
        &self.owner
    }

    fn related(&self) -> &Arc<ModelDef> {
        &self.related
    }

    fn foreign_key(&self) -> &str {
        self.foreign_key.get_or_init(|| {
            self.foreign_key_override
                .clone()
                .unwrap_or_else(|| format!("{}_id", snake_case(&self.name)))
        })
    }

    fn primary_key(&self) -> &str {
        self.primary_key.get_or_init(|| {
            self.primary_key_override
                .clone()
                .unwrap_or_else(|| self.related.primary_key().to_string())
        })
    }

    fn inverse(&self) -> &str {
        self.inverse.get_or_init(|| {
            self.inverse_override
                .clone()
                .unwrap_or_else(|| pluralize(&snake_case(self.owner.name())))
        })
    }

    fn join_key(&self) -> &str {
        self.foreign_key()
    }

    fn inverse_key(&self) -> &str {
        self.primary_key()
    }

    fn singular(&self) -> bool {
        true
    }

    fn accessors(&self) -> &RelationAccessors {
        &self.accessors
    }

    fn owner_foreign_key(&self) -> Option<&str> {
        Some(self.foreign_key())
    }

    fn join_condition(&self, base: &str, related_alias: &str) -> Result<Condition> {
        Ok(Condition::column_eq(
            ColumnRef::qualified(base, self.foreign_key()),
            ColumnRef::qualified(related_alias, self.primary_key()),
        ))
    }

    fn associate(
        &self,
        owners: &[EntityRef],
        related: &[EntityRef],
        options: AssociateOptions,
    ) -> Result<()> {
        for (owner, entity) in self.pair(owners, related)? {
            if options.attrs {
                let key = self.related_primary_key(&entity)?;
                let mut guard = owner.write().unwrap_or_else(|e| e.into_inner());
                guard.write_attribute(self.foreign_key(), key, true);
            }
            {
                let mut guard = owner.write().unwrap_or_else(|e| e.into_inner());
                guard.set_one(&self.name, Some(Arc::clone(&entity)));
            }
            if options.follow {
                let mut guard = entity.write().unwrap_or_else(|e| e.into_inner());
                guard.push_many(self.inverse(), Arc::clone(&owner));
            }
        }
        Ok(())
    }

    fn disassociate(&self, owners: &[EntityRef], related: &[EntityRef]) -> Result<()> {
        for owner in owners {
            let current = {
                let guard = owner.read().unwrap_or_else(|e| e.into_inner());
                guard
                    .is_loaded(&self.name)
                    .then(|| guard.one(&self.name))
                    .transpose()?
                    .flatten()
            };
            // An empty related list means "whatever is currently wired".
            let clears = match &current {
                Some(entity) => {
                    related.is_empty() || related.iter().any(|r| Arc::ptr_eq(entity, r))
                }
                None => related.is_empty(),
            };
            if clears {
                let mut guard = owner.write().unwrap_or_else(|e| e.into_inner());
                guard.write_attribute(self.foreign_key(), Value::Null, true);
                guard.set_one(&self.name, None);
                drop(guard);
                if let Some(entity) = current {
                    let mut guard = entity.write().unwrap_or_else(|e| e.into_inner());
                    guard.remove_many(self.inverse(), std::slice::from_ref(owner));
                }
            }
        }
        Ok(())
    }

    fn prefetch<'a>(
        &'a self,
        cx: &'a asupersync::Cx,
        adapter: &'a dyn Adapter,
        grammar: &'a dyn Grammar,
        owners: &'a [EntityRef],
    ) -> RelationFuture<'a> {
        Box::pin(async move {
            let keys = collect_keys(owners, self.foreign_key());
            if keys.is_empty() {
                return Outcome::Ok(PrefetchResult::empty());
            }
            let mut state = SelectState::from_table(self.related.table());
            state.add_filter(Condition::in_values(
                ColumnRef::qualified(self.related.table(), self.primary_key()),
                keys,
            ));
            let statement = match grammar.select(&state) {
                Ok(statement) => statement,
                Err(err) => return Outcome::Err(err),
            };
            debug!(relation = %self.name, sql = %statement.sql, "prefetching belongs-to");
            let result = match adapter.execute(cx, &statement).await {
                Outcome::Ok(result) => result,
                Outcome::Err(err) => return Outcome::Err(err),
                Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
                Outcome::Panicked(payload) => return Outcome::Panicked(payload),
            };
            Outcome::Ok(PrefetchResult::group_by_column(
                &self.related,
                &result,
                self.primary_key(),
            ))
        })
    }

    fn associate_prefetch_results(
        &self,
        owners: &[EntityRef],
        result: &PrefetchResult,
    ) -> Result<()> {
        for owner in owners {
            let fk = {
                let guard = owner.read().unwrap_or_else(|e| e.into_inner());
                guard
                    .attribute(self.foreign_key())
                    .filter(|value| !value.is_null())
                    .cloned()
            };
            let cached = match fk {
                None => None,
                Some(key) => {
                    let group = result.get(&key).ok_or_else(|| {
                        Error::Lookup(LookupError {
                            related: self.related.name().to_string(),
                            column: self.foreign_key().to_string(),
                            key: key.clone(),
                        })
                    })?;
                    group.first().cloned()
                }
            };
            let mut guard = owner.write().unwrap_or_else(|e| e.into_inner());
            guard.set_one(&self.name, cached);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use cerulean_core::Row;

    fn schema() -> (Arc<ModelDef>, Arc<ModelDef>, Arc<BelongsTo>) {
        let author = ModelDef::new("Author", "authors", "id");
        let post = ModelDef::new("Post", "posts", "id");
        let relation = Arc::new(BelongsTo::new("author", &post, &author));
        post.define_relations(vec![relation.clone()]).unwrap();
        (author, post, relation)
    }

    fn author_entity(model: &Arc<ModelDef>, id: i64) -> EntityRef {
        let row = Row::new(vec!["id".to_string()], vec![Value::BigInt(id)]);
        Entity::from_row(Arc::clone(model), &row).into_ref()
    }

    fn post_entity(model: &Arc<ModelDef>, id: i64, author_id: i64) -> EntityRef {
        let row = Row::new(
            vec!["id".to_string(), "author_id".to_string()],
            vec![Value::BigInt(id), Value::BigInt(author_id)],
        );
        Entity::from_row(Arc::clone(model), &row).into_ref()
    }

    #[test]
    fn test_derived_settings_follow_convention() {
        let (_, _, relation) = schema();
        assert_eq!(relation.foreign_key(), "author_id");
        assert_eq!(relation.primary_key(), "id");
        assert_eq!(relation.inverse(), "posts");
        assert_eq!(relation.join_key(), "author_id");
        assert_eq!(relation.inverse_key(), "id");
        assert!(relation.singular());
        assert_eq!(relation.owner_foreign_key(), Some("author_id"));
    }

    #[test]
    fn test_join_condition_shape() {
        let (_, _, relation) = schema();
        let condition = relation.join_condition("posts", "authors_j1").unwrap();
        assert_eq!(
            condition,
            Condition::column_eq(
                ColumnRef::qualified("posts", "author_id"),
                ColumnRef::qualified("authors_j1", "id"),
            )
        );
    }

    #[test]
    fn test_associate_without_attrs_stays_clean() {
        let (author_model, post_model, relation) = schema();
        let author = author_entity(&author_model, 1);
        let post = post_entity(&post_model, 10, 1);
        relation
            .associate(
                std::slice::from_ref(&post),
                std::slice::from_ref(&author),
                AssociateOptions::hydration(),
            )
            .unwrap();
        let guard = post.read().unwrap();
        assert!(!guard.is_dirty());
        assert!(guard.one("author").unwrap().is_some());
    }

    #[test]
    fn test_associate_with_attrs_writes_foreign_key() {
        let (author_model, post_model, relation) = schema();
        let author = author_entity(&author_model, 2);
        let post = post_entity(&post_model, 10, 1);
        relation
            .associate(
                std::slice::from_ref(&post),
                std::slice::from_ref(&author),
                AssociateOptions::default(),
            )
            .unwrap();
        let guard = post.read().unwrap();
        assert_eq!(guard.attribute("author_id"), Some(&Value::BigInt(2)));
        assert!(guard.is_dirty());
    }

    #[test]
    fn test_associate_follow_wires_loaded_inverse() {
        let (author_model, post_model, relation) = schema();
        let author = author_entity(&author_model, 1);
        author.write().unwrap().set_many("posts", Vec::new());
        let post = post_entity(&post_model, 10, 1);
        relation
            .associate(
                std::slice::from_ref(&post),
                std::slice::from_ref(&author),
                AssociateOptions::default(),
            )
            .unwrap();
        assert_eq!(author.read().unwrap().many("posts").unwrap().len(), 1);
    }

    #[test]
    fn test_disassociate_clears_key_and_cache() {
        let (author_model, post_model, relation) = schema();
        let author = author_entity(&author_model, 1);
        let post = post_entity(&post_model, 10, 1);
        relation
            .associate(
                std::slice::from_ref(&post),
                std::slice::from_ref(&author),
                AssociateOptions::default(),
            )
            .unwrap();
        relation
            .disassociate(std::slice::from_ref(&post), &[])
            .unwrap();
        let guard = post.read().unwrap();
        assert_eq!(guard.attribute("author_id"), Some(&Value::Null));
        assert!(guard.one("author").unwrap().is_none());
    }

    #[test]
    fn test_hydration_missing_key_is_lookup_error() {
        let (_, post_model, relation) = schema();
        let post = post_entity(&post_model, 10, 42);
        let err = relation
            .associate_prefetch_results(std::slice::from_ref(&post), &PrefetchResult::empty())
            .unwrap_err();
        match err {
            Error::Lookup(e) => {
                assert_eq!(e.related, "Author");
                assert_eq!(e.column, "author_id");
                assert_eq!(e.key, Value::BigInt(42));
            }
            other => panic!("expected Lookup, got {other:?}"),
        }
    }

    #[test]
    fn test_hydration_null_key_loads_nothing() {
        let (_, post_model, relation) = schema();
        let post = {
            let mut entity = Entity::new(Arc::clone(&post_model));
            entity.write_attribute("author_id", Value::Null, false);
            entity.into_ref()
        };
        relation
            .associate_prefetch_results(std::slice::from_ref(&post), &PrefetchResult::empty())
            .unwrap();
        assert!(post.read().unwrap().one("author").unwrap().is_none());
    }

    #[test]
    fn test_associate_recovers_a_poisoned_owner_lock() {
        let (author_model, post_model, relation) = schema();
        let author = author_entity(&author_model, 2);
        let post = post_entity(&post_model, 10, 1);
        let poisoner = Arc::clone(&post);
        std::thread::spawn(move || {
            let _guard = poisoner.write().unwrap();
            panic!("poison the lock");
        })
        .join()
        .unwrap_err();
        relation
            .associate(
                std::slice::from_ref(&post),
                std::slice::from_ref(&author),
                AssociateOptions::default(),
            )
            .unwrap();
        let guard = post.read().unwrap_or_else(|e| e.into_inner());
        assert_eq!(guard.attribute("author_id"), Some(&Value::BigInt(2)));
    }
}
