//! One-to-many relations.

use std::sync::{Arc, OnceLock};

use asupersync::Outcome;
use cerulean_core::inflect::snake_case;
use cerulean_core::{Adapter, Error, Result, Value};
use cerulean_dialect::{ColumnRef, Condition, Grammar, SelectState};
use tracing::debug;

use crate::entity::EntityRef;
use crate::model::ModelDef;
use crate::relation::{
    AssociateOptions, PrefetchResult, Relation, RelationAccessors, RelationFuture, collect_keys,
};

/// The related table carries a foreign key referencing the owner.
///
/// Mirror image of belongs-to: the foreign key defaults to the snake_cased
/// owner name plus `_id`, lives on the related table, and references the
/// owner's primary key. The inverse is the singular belongs-to name on the
/// related model.
pub struct HasMany {
    name: String,
    owner: Arc<ModelDef>,
    related: Arc<ModelDef>,
    foreign_key_override: Option<String>,
    inverse_override: Option<String>,
    foreign_key: OnceLock<String>,
    inverse: OnceLock<String>,
    accessors: RelationAccessors,
}

impl HasMany {
    /// Create a has-many relation from `owner` to `related`.
    pub fn new(name: impl Into<String>, owner: &Arc<ModelDef>, related: &Arc<ModelDef>) -> Self {
        let name = name.into();
        let accessors = RelationAccessors::derive(&name, false);
        Self {
            name,
            owner: Arc::clone(owner),
            related: Arc::clone(related),
            foreign_key_override: None,
            inverse_override: None,
            foreign_key: OnceLock::new(),
            inverse: OnceLock::new(),
            accessors,
        }
    }

    /// Override the foreign key column on the related table.
    #[must_use]
    pub fn with_foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key_override = Some(column.into());
        self
    }

    /// Override the inverse relation name on the related model.
    #[must_use]
    pub fn with_inverse(mut self, name: impl Into<String>) -> Self {
        self.inverse_override = Some(name.into());
        self
    }

    fn owner_key(&self, owner: &EntityRef) -> Result<Value> {
        let guard = owner.read().unwrap_or_else(|e| e.into_inner());
        guard
            .attribute(self.primary_key())
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(|| {
                Error::Custom(format!(
                    "cannot associate '{}': owner '{}' has no '{}' value",
                    self.name,
                    self.owner.name(),
                    self.primary_key()
                ))
            })
    }

    /// Match related entities to their owners.
    ///
    /// A single owner claims every related entity; with several owners,
    /// related entities are matched by their foreign key value.
    fn matches_per_owner(
        &self,
        owners: &[EntityRef],
        related: &[EntityRef],
    ) -> Result<Vec<(EntityRef, Vec<EntityRef>)>> {
        if let [single] = owners {
            return Ok(vec![(Arc::clone(single), related.to_vec())]);
        }
        let mut out: Vec<(EntityRef, Vec<EntityRef>)> = Vec::with_capacity(owners.len());
        for owner in owners {
            let key = self.owner_key(owner)?;
            let mut matched = Vec::new();
            for entity in related {
                let fk = {
                    let guard = entity.read().unwrap_or_else(|e| e.into_inner());
                    guard.attribute(self.foreign_key()).cloned()
                };
                if fk.is_some_and(|fk| fk.group_key() == key.group_key()) {
                    matched.push(Arc::clone(entity));
                }
            }
            out.push((Arc::clone(owner), matched));
        }
        Ok(out)
    }
}

impl Relation for HasMany {
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
                .unwrap_or_else(|| format!("{}_id", snake_case(self.owner.name())))
        })
    }

    fn primary_key(&self) -> &str {
        self.owner.primary_key()
    }

    fn inverse(&self) -> &str {
        self.inverse.get_or_init(|| {
            self.inverse_override
                .clone()
                .unwrap_or_else(|| snake_case(self.owner.name()))
        })
    }

    fn join_key(&self) -> &str {
        self.primary_key()
    }

    fn inverse_key(&self) -> &str {
        self.foreign_key()
    }

    fn singular(&self) -> bool {
        false
    }

    fn accessors(&self) -> &RelationAccessors {
        &self.accessors
    }

    fn join_condition(&self, base: &str, related_alias: &str) -> Result<Condition> {
        Ok(Condition::column_eq(
            ColumnRef::qualified(base, self.primary_key()),
            ColumnRef::qualified(related_alias, self.foreign_key()),
        ))
    }

    fn associate(
        &self,
        owners: &[EntityRef],
        related: &[EntityRef],
        options: AssociateOptions,
    ) -> Result<()> {
        for (owner, matched) in self.matches_per_owner(owners, related)? {
            if options.attrs {
                let key = self.owner_key(&owner)?;
                for entity in &matched {
                    let mut guard = entity.write().unwrap_or_else(|e| e.into_inner());
                    guard.write_attribute(self.foreign_key(), key.clone(), true);
                }
            }
            {
                let mut guard = owner.write().unwrap_or_else(|e| e.into_inner());
                if guard.is_loaded(&self.name) {
                    for entity in &matched {
                        let already = guard
                            .many(&self.name)?
                            .iter()
                            .any(|existing| Arc::ptr_eq(existing, entity));
                        if !already {
                            guard.push_many(&self.name, Arc::clone(entity));
                        }
                    }
                } else {
                    guard.set_many(&self.name, matched.clone());
                }
            }
            if options.follow {
                for entity in &matched {
                    let mut guard = entity.write().unwrap_or_else(|e| e.into_inner());
                    guard.set_one(self.inverse(), Some(Arc::clone(&owner)));
                }
            }
        }
        Ok(())
    }

    fn disassociate(&self, owners: &[EntityRef], related: &[EntityRef]) -> Result<()> {
        for owner in owners {
            let removed: Vec<EntityRef> = {
                let guard = owner.read().unwrap_or_else(|e| e.into_inner());
                if !guard.is_loaded(&self.name) {
                    related.to_vec()
                } else if related.is_empty() {
                    guard.many(&self.name)?
                } else {
                    related.to_vec()
                }
            };
            {
                let mut guard = owner.write().unwrap_or_else(|e| e.into_inner());
                guard.remove_many(&self.name, &removed);
            }
            for entity in &removed {
                let mut guard = entity.write().unwrap_or_else(|e| e.into_inner());
                guard.write_attribute(self.foreign_key(), Value::Null, true);
                if guard.is_loaded(self.inverse()) {
                    guard.set_one(self.inverse(), None);
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
            let keys = collect_keys(owners, self.primary_key());
            if keys.is_empty() {
                return Outcome::Ok(PrefetchResult::empty());
            }
            let mut state = SelectState::from_table(self.related.table());
            state.add_filter(Condition::in_values(
                ColumnRef::qualified(self.related.table(), self.foreign_key()),
                keys,
            ));
            let statement = match grammar.select(&state) {
                Ok(statement) => statement,
                Err(err) => return Outcome::Err(err),
            };
            debug!(relation = %self.name, sql = %statement.sql, "prefetching has-many");
            let result = match adapter.execute(cx, &statement).await {
                Outcome::Ok(result) => result,
                Outcome::Err(err) => return Outcome::Err(err),
                Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
                Outcome::Panicked(payload) => return Outcome::Panicked(payload),
            };
            Outcome::Ok(PrefetchResult::group_by_column(
                &self.related,
                &result,
                self.foreign_key(),
            ))
        })
    }

    fn associate_prefetch_results(
        &self,
        owners: &[EntityRef],
        result: &PrefetchResult,
    ) -> Result<()> {
        for owner in owners {
            let key = {
                let guard = owner.read().unwrap_or_else(|e| e.into_inner());
                guard
                    .attribute(self.primary_key())
                    .filter(|value| !value.is_null())
                    .cloned()
            };
            let matched = key
                .and_then(|key| result.get(&key).map(<[EntityRef]>::to_vec))
                .unwrap_or_default();
            let mut guard = owner.write().unwrap_or_else(|e| e.into_inner());
            guard.set_many(&self.name, matched);
        }
        Ok(())
    }
}
