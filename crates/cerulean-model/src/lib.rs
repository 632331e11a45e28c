//! Model definitions, entities, and the relation system for Cerulean.
//!
//! Models are static `ModelDef` descriptions shared via `Arc`; entities
//! are row instances with dirty tracking and per-relation caches. The
//! relation system (belongs-to, has-many, through) wires entities
//! together in memory and batch-loads them with one statement per hop.

pub mod belongs_to;
pub mod entity;
pub mod has_many;
pub mod model;
pub mod relation;
pub mod through;

pub use belongs_to::BelongsTo;
pub use entity::{Entity, EntityRef, RelationCache};
pub use has_many::HasMany;
pub use model::ModelDef;
pub use relation::{
    AssociateOptions, PrefetchResult, Relation, RelationAccessors, RelationFuture, collect_keys,
};
pub use through::Through;
