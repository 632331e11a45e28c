//! Core types and the adapter contract for Cerulean.
//!
//! This crate provides the foundations the rest of the workspace builds on:
//!
//! - `Value` and `Row` for data crossing the adapter boundary
//! - `Statement` and `ExecutionResult` as the execution currency
//! - `Adapter` trait for backend drivers
//! - the `Error` taxonomy shared by every layer
//! - `Outcome` re-export from asupersync for cancel-correct operations

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome};

pub mod adapter;
pub mod error;
pub mod identifiers;
pub mod inflect;
pub mod row;
pub mod statement;
pub mod value;

pub use adapter::{Adapter, AdapterFuture};
pub use error::{
    CannotSetError, Error, ExecutionError, LookupError, NotLoadedError, Result, TranslateError,
    TranslateErrorKind, TypeError,
};
pub use identifiers::{quote_ident, quote_ident_mysql};
pub use row::{ColumnInfo, Row};
pub use statement::{ExecutionResult, Statement};
pub use value::Value;
