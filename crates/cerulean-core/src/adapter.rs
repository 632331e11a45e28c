//! The adapter contract.
//!
//! An adapter owns the wire protocol for one backend. Cerulean hands it a
//! rendered [`Statement`] and gets back an [`ExecutionResult`]; everything
//! above this boundary is backend-agnostic.

use std::future::Future;
use std::pin::Pin;

use asupersync::{Cx, Outcome};

use crate::error::Error;
use crate::statement::{ExecutionResult, Statement};

/// A boxed future returned across the adapter boundary.
pub type AdapterFuture<'a> =
    Pin<Box<dyn Future<Output = Outcome<ExecutionResult, Error>> + Send + 'a>>;

/// Executes statements against one backend.
///
/// The trait is object-safe: queries and relations hold `&dyn Adapter` and
/// never know which backend they talk to. Implementations box their futures,
/// mirroring the usual trait-object pattern for async traits.
pub trait Adapter: Send + Sync {
    /// Execute one statement and return its full result.
    ///
    /// Errors are propagated unchanged; Cerulean never retries.
    fn execute<'a>(&'a self, cx: &'a Cx, statement: &'a Statement) -> AdapterFuture<'a>;
}

impl<A: Adapter + ?Sized> Adapter for &A {
    fn execute<'a>(&'a self, cx: &'a Cx, statement: &'a Statement) -> AdapterFuture<'a> {
        (**self).execute(cx, statement)
    }
}

impl<A: Adapter + ?Sized> Adapter for std::sync::Arc<A> {
    fn execute<'a>(&'a self, cx: &'a Cx, statement: &'a Statement) -> AdapterFuture<'a> {
        (**self).execute(cx, statement)
    }
}
