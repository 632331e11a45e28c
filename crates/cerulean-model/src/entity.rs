//! Entity instances.
//!
//! An `Entity` is one row's worth of attributes bound to a `ModelDef`,
//! with dirty tracking and per-relation caches. Entities are shared as
//! `EntityRef` handles so association can wire both sides of a relation
//! in memory.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use cerulean_core::{Error, Result, Row, Value};

use crate::model::ModelDef;

/// Shared handle to an entity.
pub type EntityRef = Arc<RwLock<Entity>>;

/// Cached state of one relation on one entity.
#[derive(Debug, Clone)]
pub enum RelationCache {
    /// Singular relation: loaded, possibly to nothing
    One(Option<EntityRef>),
    /// Collection relation: loaded, possibly empty
    Many(Vec<EntityRef>),
}

/// One instance of a model.
#[derive(Debug)]
pub struct Entity {
    model: Arc<ModelDef>,
    attributes: HashMap<String, Value>,
    dirty: HashSet<String>,
    relations: HashMap<String, RelationCache>,
}

impl Entity {
    /// Create a new empty entity.
    pub fn new(model: Arc<ModelDef>) -> Self {
        Self {
            model,
            attributes: HashMap::new(),
            dirty: HashSet::new(),
            relations: HashMap::new(),
        }
    }

    /// Hydrate an entity from a fetched row. All attributes start clean.
    pub fn from_row(model: Arc<ModelDef>, row: &Row) -> Self {
        let attributes = row
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        Self {
            model,
            attributes,
            dirty: HashSet::new(),
            relations: HashMap::new(),
        }
    }

    /// Wrap this entity in a shared handle.
    pub fn into_ref(self) -> EntityRef {
        Arc::new(RwLock::new(self))
    }

    /// The model this entity belongs to.
    pub fn model(&self) -> &Arc<ModelDef> {
        &self.model
    }

    /// Read an attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// This entity's primary key value, if set.
    pub fn primary_key_value(&self) -> Option<&Value> {
        self.attribute(self.model.primary_key())
    }

    /// Write an attribute and mark it dirty.
    ///
    /// Foreign keys managed by a relation are guarded: writing them
    /// directly is a programmer error, use `associate` instead.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if let Some(relation) = self.model.guarding(name) {
            return Err(Error::cannot_set(name, relation));
        }
        self.write_attribute(name, value.into(), true);
        Ok(())
    }

    /// Unguarded attribute write, used by the relation system.
    pub(crate) fn write_attribute(&mut self, name: &str, value: Value, mark_dirty: bool) {
        self.attributes.insert(name.to_string(), value);
        if mark_dirty {
            self.dirty.insert(name.to_string());
        }
    }

    /// Whether any attribute has been written since hydration.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Names of attributes written since hydration.
    pub fn dirty_attributes(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Clear dirty tracking, e.g. after a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Whether a relation has been loaded on this entity.
    pub fn is_loaded(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }

    /// Read a singular relation.
    ///
    /// Returns `Error::NotLoaded` when the relation has not been fetched;
    /// there is no implicit fetching.
    pub fn one(&self, relation: &str) -> Result<Option<EntityRef>> {
        match self.relations.get(relation) {
            Some(RelationCache::One(cached)) => Ok(cached.clone()),
            Some(RelationCache::Many(_)) => Err(Error::Custom(format!(
                "relation '{relation}' on '{}' is a collection",
                self.model.name()
            ))),
            None => Err(Error::not_loaded(relation, self.model.name())),
        }
    }

    /// Read a collection relation.
    ///
    /// Same loading rule as [`Entity::one`]: unloaded access is an error.
    pub fn many(&self, relation: &str) -> Result<Vec<EntityRef>> {
        match self.relations.get(relation) {
            Some(RelationCache::Many(cached)) => Ok(cached.clone()),
            Some(RelationCache::One(_)) => Err(Error::Custom(format!(
                "relation '{relation}' on '{}' is singular",
                self.model.name()
            ))),
            None => Err(Error::not_loaded(relation, self.model.name())),
        }
    }

    /// Set a singular relation cache. Marks the relation loaded.
    pub fn set_one(&mut self, relation: impl Into<String>, value: Option<EntityRef>) {
        self.relations
            .insert(relation.into(), RelationCache::One(value));
    }

    /// Set a collection relation cache. Marks the relation loaded.
    pub fn set_many(&mut self, relation: impl Into<String>, values: Vec<EntityRef>) {
        self.relations
            .insert(relation.into(), RelationCache::Many(values));
    }

    /// Append to a loaded collection cache; no-op when unloaded.
    pub(crate) fn push_many(&mut self, relation: &str, value: EntityRef) {
        if let Some(RelationCache::Many(cached)) = self.relations.get_mut(relation) {
            cached.push(value);
        }
    }

    /// Remove entities from a loaded collection cache by pointer identity.
    pub(crate) fn remove_many(&mut self, relation: &str, remove: &[EntityRef]) {
        if let Some(RelationCache::Many(cached)) = self.relations.get_mut(relation) {
            cached.retain(|existing| !remove.iter().any(|r| Arc::ptr_eq(existing, r)));
        }
    }

    /// Drop a relation cache, returning it to the unloaded state.
    pub fn unload(&mut self, relation: &str) {
        self.relations.remove(relation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belongs_to::BelongsTo;

    fn post_model() -> Arc<ModelDef> {
        let author = ModelDef::new("Author", "authors", "id");
        let post = ModelDef::new("Post", "posts", "id");
        post.define_relations(vec![Arc::new(BelongsTo::new("author", &post, &author))])
            .unwrap();
        post
    }

    #[test]
    fn test_from_row_is_clean() {
        let row = Row::new(
            vec!["id".to_string(), "title".to_string()],
            vec![Value::BigInt(1), Value::Text("hello".to_string())],
        );
        let entity = Entity::from_row(post_model(), &row);
        assert!(!entity.is_dirty());
        assert_eq!(entity.attribute("title"), Some(&Value::Text("hello".to_string())));
        assert_eq!(entity.primary_key_value(), Some(&Value::BigInt(1)));
    }

    #[test]
    fn test_set_attribute_marks_dirty() {
        let mut entity = Entity::new(post_model());
        entity.set_attribute("title", "hello").unwrap();
        assert!(entity.is_dirty());
        assert_eq!(entity.dirty_attributes().collect::<Vec<_>>(), vec!["title"]);
        entity.mark_clean();
        assert!(!entity.is_dirty());
    }

    #[test]
    fn test_guarded_foreign_key_write_fails() {
        let mut entity = Entity::new(post_model());
        let err = entity.set_attribute("author_id", 7_i64).unwrap_err();
        match err {
            Error::CannotSet(e) => {
                assert_eq!(e.attribute, "author_id");
                assert_eq!(e.relation, "author");
            }
            other => panic!("expected CannotSet, got {other:?}"),
        }
        assert!(!entity.is_dirty());
    }

    #[test]
    fn test_unloaded_relation_access_errors() {
        let entity = Entity::new(post_model());
        assert!(matches!(entity.one("author"), Err(Error::NotLoaded(_))));
        assert!(matches!(entity.many("comments"), Err(Error::NotLoaded(_))));
    }

    #[test]
    fn test_loaded_relation_roundtrip() {
        let mut entity = Entity::new(post_model());
        entity.set_one("author", None);
        assert!(entity.is_loaded("author"));
        assert!(entity.one("author").unwrap().is_none());
        entity.unload("author");
        assert!(matches!(entity.one("author"), Err(Error::NotLoaded(_))));
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        let mut entity = Entity::new(post_model());
        entity.set_many("author", Vec::new());
        assert!(entity.one("author").is_err());
    }
}
