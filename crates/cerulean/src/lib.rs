//! Cerulean - relational query building and association resolution.
//!
//! Cerulean turns model definitions and association paths into batched,
//! dialect-aware SQL:
//!
//! - Immutable, chainable queries with execute-once result caching
//! - A relation system (belongs-to, has-many, through) that joins and
//!   eager-loads across the model graph with one statement per hop
//! - A dialect layer (translator, phrasing, grammar) that renders the
//!   same structural intent for PostgreSQL, SQLite, and MySQL
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use cerulean::prelude::*;
//!
//! let author = ModelDef::new("Author", "authors", "id");
//! let post = ModelDef::new("Post", "posts", "id");
//! author.define_relations(vec![Arc::new(HasMany::new("posts", &author, &post))])?;
//! post.define_relations(vec![Arc::new(BelongsTo::new("author", &post, &author))])?;
//!
//! async fn recent(cx: &Cx, adapter: &impl Adapter, post: &Arc<ModelDef>) {
//!     let grammar: Arc<dyn Grammar> = Arc::new(PostgresGrammar::default());
//!     let posts = ModelQuery::new(post, grammar)
//!         .filter(Condition::compare(
//!             ColumnRef::qualified("posts", "title"),
//!             "contains",
//!             "rust",
//!         ))
//!         .with("author")
//!         .all(cx, adapter)
//!         .await;
//! }
//! ```

// Re-export asupersync primitives for structured concurrency
pub use cerulean_core::{Budget, Cx, Outcome};

pub use cerulean_core::{
    Adapter, AdapterFuture, CannotSetError, ColumnInfo, Error, ExecutionError, ExecutionResult,
    LookupError, NotLoadedError, Result, Row, Statement, TranslateError, TranslateErrorKind,
    TypeError, Value, quote_ident, quote_ident_mysql,
};
pub use cerulean_core::inflect;

pub use cerulean_dialect::{
    AnsiPhrasing, ColumnRef, Condition, Grammar, InsertState, JoinClause, JoinKind, MysqlGrammar,
    MysqlPhrasing, MysqlTranslator, OrderBy, OrderDirection, PSEUDO_RETURN_MARKER, Phrasing,
    PostgresGrammar, PostgresTranslator, Predicate, ReturningClause, SelectState, SqliteGrammar,
    SqliteTranslator, Translator, pseudo_return_column, wants_pseudo_return,
};

pub use cerulean_model::{
    AssociateOptions, BelongsTo, Entity, EntityRef, HasMany, ModelDef, PrefetchResult, Relation,
    RelationAccessors, RelationCache, Through, collect_keys,
};

pub use cerulean_query::{Insert, ModelQuery, Query, returned_id};

/// Common imports for working with Cerulean.
pub mod prelude {
    pub use crate::{
        Adapter, BelongsTo, ColumnRef, Condition, Cx, Entity, EntityRef, Error, Grammar, HasMany,
        Insert, JoinKind, ModelDef, ModelQuery, MysqlGrammar, OrderBy, Outcome, PostgresGrammar,
        Query, Result, Row, SqliteGrammar, Statement, Through, Value,
    };
}
