//! Relations composed through an intermediate model.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use asupersync::Outcome;
use cerulean_core::{Adapter, Error, Result};
use cerulean_dialect::{Condition, Grammar};
use tracing::debug;

use crate::entity::EntityRef;
use crate::model::ModelDef;
use crate::relation::{
    AssociateOptions, PrefetchResult, Relation, RelationAccessors, RelationFuture,
};

/// A relation reached through another relation: `through` names a relation
/// on the owner, `source` names a relation on that intermediate model.
///
/// Hops are resolved by name on first use, because the through relation is
/// registered in the same `define_relations` call as its first hop.
/// Resolution errors surface from `expand`, `join_condition`, and
/// `prefetch`; the composition owns no foreign key, so
/// `associate`/`disassociate` on it are programmer errors.
pub struct Through {
    name: String,
    owner: Arc<ModelDef>,
    through: String,
    source: String,
    hops: OnceLock<(Arc<dyn Relation>, Arc<dyn Relation>)>,
    accessors: RelationAccessors,
}

impl Through {
    /// Create a through relation on `owner`.
    pub fn new(
        name: impl Into<String>,
        owner: &Arc<ModelDef>,
        through: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let accessors = RelationAccessors::derive(&name, false);
        Self {
            name,
            owner: Arc::clone(owner),
            through: through.into(),
            source: source.into(),
            hops: OnceLock::new(),
            accessors,
        }
    }

    fn resolve(&self) -> Result<&(Arc<dyn Relation>, Arc<dyn Relation>)> {
        if let Some(hops) = self.hops.get() {
            return Ok(hops);
        }
        let first = self.owner.relation(&self.through).ok_or_else(|| {
            Error::Custom(format!(
                "through relation '{}': '{}' has no relation '{}'",
                self.name,
                self.owner.name(),
                self.through
            ))
        })?;
        let second = first.related().relation(&self.source).ok_or_else(|| {
            Error::Custom(format!(
                "through relation '{}': '{}' has no relation '{}'",
                self.name,
                first.related().name(),
                self.source
            ))
        })?;
        // A concurrent resolver may have won; either value is identical.
        let _ = self.hops.set((first, second));
        self.hops.get().ok_or_else(|| {
            Error::Custom(format!("through relation '{}' failed to resolve", self.name))
        })
    }
}

impl Relation for Through {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> &Arc<ModelDef> {
        &self.owner
    }

    // Scalar accessors resolve hops lazily on first use. When a hop name
    // does not exist, every fallible operation on the relation reports
    // the error; the owner-side values below only keep these infallible
    // accessors total on such a schema.

    fn related(&self) -> &Arc<ModelDef> {
        self.resolve()
            .ok()
            .map_or(&self.owner, |(_, source)| source.related())
    }

    fn foreign_key(&self) -> &str {
        self.resolve()
            .ok()
            .map_or_else(|| self.owner.primary_key(), |(first, _)| first.foreign_key())
    }

    fn primary_key(&self) -> &str {
        self.resolve()
            .ok()
            .map_or_else(|| self.owner.primary_key(), |(_, source)| source.primary_key())
    }

    fn inverse(&self) -> &str {
        self.resolve()
            .ok()
            .map_or_else(|| self.name.as_str(), |(_, source)| source.inverse())
    }

    fn join_key(&self) -> &str {
        self.resolve()
            .ok()
            .map_or_else(|| self.owner.primary_key(), |(first, _)| first.join_key())
    }

    fn inverse_key(&self) -> &str {
        self.resolve()
            .ok()
            .map_or_else(|| self.owner.primary_key(), |(_, source)| source.inverse_key())
    }

    fn singular(&self) -> bool {
        self.resolve()
            .ok()
            .is_some_and(|(first, source)| first.singular() && source.singular())
    }

    fn accessors(&self) -> &RelationAccessors {
        &self.accessors
    }

    fn join_condition(&self, _base: &str, _related_alias: &str) -> Result<Condition> {
        self.resolve()?;
        Err(Error::Custom(format!(
            "relation '{}' spans '{}' and '{}'; join each hop from expand()",
            self.name, self.through, self.source
        )))
    }

    fn expand(&self) -> Result<Vec<Arc<dyn Relation>>> {
        let (first, source) = self.resolve()?;
        Ok(vec![Arc::clone(first), Arc::clone(source)])
    }

    fn associate(
        &self,
        _owners: &[EntityRef],
        _related: &[EntityRef],
        _options: AssociateOptions,
    ) -> Result<()> {
        Err(Error::Custom(format!(
            "relation '{}' is a through composition and owns no foreign key; \
             associate through '{}' and '{}' instead",
            self.name, self.through, self.source
        )))
    }

    fn disassociate(&self, _owners: &[EntityRef], _related: &[EntityRef]) -> Result<()> {
        Err(Error::Custom(format!(
            "relation '{}' is a through composition and owns no foreign key; \
             disassociate through '{}' and '{}' instead",
            self.name, self.through, self.source
        )))
    }

    fn prefetch<'a>(
        &'a self,
        cx: &'a asupersync::Cx,
        adapter: &'a dyn Adapter,
        grammar: &'a dyn Grammar,
        owners: &'a [EntityRef],
    ) -> RelationFuture<'a> {
        Box::pin(async move {
            let (first, source) = match self.resolve() {
                Ok(hops) => hops,
                Err(err) => return Outcome::Err(err),
            };
            debug!(relation = %self.name, "prefetching through relation");
            let intermediate_result = match first.prefetch(cx, adapter, grammar, owners).await {
                Outcome::Ok(result) => result,
                Outcome::Err(err) => return Outcome::Err(err),
                Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
                Outcome::Panicked(payload) => return Outcome::Panicked(payload),
            };
            let intermediates: Vec<EntityRef> =
                intermediate_result.entities().cloned().collect();
            let final_result = match source.prefetch(cx, adapter, grammar, &intermediates).await {
                Outcome::Ok(result) => result,
                Outcome::Err(err) => return Outcome::Err(err),
                Outcome::Cancelled(reason) => return Outcome::Cancelled(reason),
                Outcome::Panicked(payload) => return Outcome::Panicked(payload),
            };

            // Re-key the final groups by the owners' join key, walking
            // owner -> intermediate -> final and deduping shared targets.
            let mut groups: HashMap<String, Vec<EntityRef>> = HashMap::new();
            for (owner_key, intermediate_group) in intermediate_result.groups() {
                let mut seen = std::collections::HashSet::new();
                let mut finals = Vec::new();
                for intermediate in intermediate_group {
                    let key = {
                        let guard = intermediate.read().unwrap_or_else(|e| e.into_inner());
                        guard.attribute(source.join_key()).cloned()
                    };
                    let Some(key) = key else { continue };
                    if let Some(group) = final_result.get(&key) {
                        for entity in group {
                            if seen.insert(Arc::as_ptr(entity)) {
                                finals.push(Arc::clone(entity));
                            }
                        }
                    }
                }
                groups.insert(owner_key.to_string(), finals);
            }
            Outcome::Ok(PrefetchResult::from_groups(groups))
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
                    .attribute(self.join_key())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belongs_to::BelongsTo;
    use crate::entity::Entity;
    use crate::has_many::HasMany;
    use cerulean_core::{Row, Value};

    fn blog() -> (Arc<ModelDef>, Arc<ModelDef>, Arc<ModelDef>, Arc<Through>) {
        let author = ModelDef::new("Author", "authors", "id");
        let post = ModelDef::new("Post", "posts", "id");
        let comment = ModelDef::new("Comment", "comments", "id");
        let through = Arc::new(Through::new("comments", &author, "posts", "comments"));
        author
            .define_relations(vec![
                Arc::new(HasMany::new("posts", &author, &post)),
                through.clone(),
            ])
            .unwrap();
        post.define_relations(vec![
            Arc::new(BelongsTo::new("author", &post, &author)),
            Arc::new(HasMany::new("comments", &post, &comment)),
        ])
        .unwrap();
        (author, post, comment, through)
    }

    fn entity(model: &Arc<ModelDef>, columns: &[(&str, i64)]) -> EntityRef {
        let names = columns.iter().map(|(n, _)| (*n).to_string()).collect();
        let values = columns.iter().map(|(_, v)| Value::BigInt(*v)).collect();
        Entity::from_row(Arc::clone(model), &Row::new(names, values)).into_ref()
    }

    #[test]
    fn test_accessors_resolve_hops_lazily() {
        let (_, _, _, relation) = blog();
        // No expand() first; the accessors resolve on their own.
        assert_eq!(relation.related().name(), "Comment");
        assert_eq!(relation.foreign_key(), "author_id");
        assert_eq!(relation.primary_key(), "id");
        assert_eq!(relation.join_key(), "id");
        assert_eq!(relation.inverse(), "post");
        assert_eq!(relation.inverse_key(), "post_id");
        assert!(!relation.singular());
    }

    #[test]
    fn test_expand_orders_hops_first_then_source() {
        let (_, _, _, relation) = blog();
        let hops = relation.expand().unwrap();
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0].name(), "posts");
        assert_eq!(hops[1].name(), "comments");
    }

    #[test]
    fn test_unknown_first_hop_is_an_error() {
        let author = ModelDef::new("Author", "authors", "id");
        author.define_relations(Vec::new()).unwrap();
        let relation = Through::new("comments", &author, "bogus", "comments");
        let err = relation.expand().map(drop).unwrap_err();
        match err {
            Error::Custom(message) => {
                assert!(message.contains("has no relation 'bogus'"), "{message}");
            }
            other => panic!("expected Custom, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_source_hop_is_an_error() {
        let (author, _, _, _) = blog();
        let relation = Through::new("replies", &author, "posts", "bogus");
        let err = relation.expand().map(drop).unwrap_err();
        match err {
            Error::Custom(message) => {
                assert!(message.contains("has no relation 'bogus'"), "{message}");
            }
            other => panic!("expected Custom, got {other:?}"),
        }
    }

    #[test]
    fn test_writes_through_composition_are_rejected() {
        let (author_model, _, comment_model, relation) = blog();
        let author = entity(&author_model, &[("id", 1)]);
        let comment = entity(&comment_model, &[("id", 5)]);
        assert!(matches!(
            relation.associate(
                std::slice::from_ref(&author),
                std::slice::from_ref(&comment),
                AssociateOptions::default(),
            ),
            Err(Error::Custom(_))
        ));
        assert!(matches!(
            relation.disassociate(std::slice::from_ref(&author), std::slice::from_ref(&comment)),
            Err(Error::Custom(_))
        ));
    }

    #[test]
    fn test_join_condition_points_at_hop_joins() {
        let (_, _, _, relation) = blog();
        match relation.join_condition("authors", "comments") {
            Err(Error::Custom(message)) => {
                assert!(message.contains("expand()"), "{message}");
            }
            other => panic!("expected Custom, got {other:?}"),
        }
    }

    #[test]
    fn test_hydration_groups_by_owner_key() {
        let (author_model, _, comment_model, relation) = blog();
        let author = entity(&author_model, &[("id", 1)]);
        let comment = entity(&comment_model, &[("id", 5), ("post_id", 10)]);
        let mut groups = HashMap::new();
        groups.insert(Value::BigInt(1).group_key(), vec![comment]);
        relation
            .associate_prefetch_results(
                std::slice::from_ref(&author),
                &PrefetchResult::from_groups(groups),
            )
            .unwrap();
        let guard = author.read().unwrap();
        assert_eq!(guard.many("comments").unwrap().len(), 1);
        assert!(!guard.is_dirty());
    }
}
