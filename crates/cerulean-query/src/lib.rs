//! Query building and execution for Cerulean.
//!
//! `Query` is the dialect-agnostic core: immutable chaining over a
//! structural state, rendered by a bound grammar, with an execute-once
//! result slot. `ModelQuery` layers the relation graph on top, turning
//! association paths into joins and eager loads. `Insert` handles row
//! creation and generated-key recovery across dialects.

pub mod insert;
pub mod model_query;
pub mod query;

pub use insert::{Insert, returned_id};
pub use model_query::ModelQuery;
pub use query::Query;
