//! The query core.
//!
//! A `Query` is an immutable snapshot of structural intent plus an
//! execute-once result slot. Chaining methods take `&self` and return a
//! fresh query; the parent is never touched and cached results never
//! carry over into derived queries.

use std::sync::Arc;

use asupersync::sync::OnceCell;
use asupersync::{CancelReason, Cx, Outcome, PanicPayload};
use cerulean_core::{Adapter, Error, ExecutionResult, Result, Statement};
use cerulean_dialect::{ColumnRef, Condition, Grammar, JoinClause, OrderBy, SelectState};
use tracing::debug;

type ExecuteHook = Arc<dyn Fn(&Statement) + Send + Sync>;
type ResultHook = Arc<dyn Fn(&ExecutionResult) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// Lifecycle hooks fired around execution.
#[derive(Clone, Default)]
struct Hooks {
    on_execute: Vec<ExecuteHook>,
    on_result: Vec<ResultHook>,
    on_error: Vec<ErrorHook>,
}

/// Adapter interruptions that leave the result slot unsettled.
enum Unsettled {
    Cancelled(CancelReason),
    Panicked(PanicPayload),
}

/// An immutable, chainable query with execute-once caching.
pub struct Query {
    grammar: Option<Arc<dyn Grammar>>,
    state: SelectState,
    hooks: Hooks,
    slot: OnceCell<Result<ExecutionResult>>,
}

impl Query {
    /// A query over a table, with no grammar bound yet.
    pub fn from_table(table: impl Into<String>) -> Self {
        Self::with_state(SelectState::from_table(table))
    }

    /// A query from prebuilt structural state.
    pub fn with_state(state: SelectState) -> Self {
        Self {
            grammar: None,
            state,
            hooks: Hooks::default(),
            slot: OnceCell::new(),
        }
    }

    /// New query with the parent's definition and a fresh result slot.
    fn derive(&self) -> Self {
        Self {
            grammar: self.grammar.clone(),
            state: self.state.clone(),
            hooks: self.hooks.clone(),
            slot: OnceCell::new(),
        }
    }

    /// Explicit clone-with-reset: same definition, nothing settled.
    pub fn duplicate(&self) -> Self {
        self.derive()
    }

    /// Bind the grammar that renders this query.
    #[must_use]
    pub fn grammar(&self, grammar: Arc<dyn Grammar>) -> Self {
        let mut next = self.derive();
        next.grammar = Some(grammar);
        next
    }

    /// The bound grammar, if any.
    pub fn bound_grammar(&self) -> Option<&Arc<dyn Grammar>> {
        self.grammar.as_ref()
    }

    /// The structural state this query renders from.
    pub fn state(&self) -> &SelectState {
        &self.state
    }

    /// Add a filter condition, merged under AND.
    #[must_use]
    pub fn filter(&self, condition: Condition) -> Self {
        let mut next = self.derive();
        next.state.add_filter(condition);
        next
    }

    /// Add a join clause.
    #[must_use]
    pub fn join_clause(&self, join: JoinClause) -> Self {
        let mut next = self.derive();
        next.state.joins.push(join);
        next
    }

    /// Append an ORDER BY term.
    #[must_use]
    pub fn order_by(&self, order: OrderBy) -> Self {
        let mut next = self.derive();
        next.state.order_by.push(order);
        next
    }

    /// Project specific columns instead of `*`.
    #[must_use]
    pub fn columns(&self, columns: Vec<ColumnRef>) -> Self {
        let mut next = self.derive();
        next.state.columns = columns;
        next
    }

    /// Cap the number of rows.
    #[must_use]
    pub fn limit(&self, limit: u64) -> Self {
        let mut next = self.derive();
        next.state.limit = Some(limit);
        next
    }

    /// Skip leading rows.
    #[must_use]
    pub fn offset(&self, offset: u64) -> Self {
        let mut next = self.derive();
        next.state.offset = Some(offset);
        next
    }

    /// Register a hook fired with the rendered statement before execution.
    #[must_use]
    pub fn on_execute(&self, hook: impl Fn(&Statement) + Send + Sync + 'static) -> Self {
        let mut next = self.derive();
        next.hooks.on_execute.push(Arc::new(hook));
        next
    }

    /// Register a hook fired with a successful result.
    #[must_use]
    pub fn on_result(&self, hook: impl Fn(&ExecutionResult) + Send + Sync + 'static) -> Self {
        let mut next = self.derive();
        next.hooks.on_result.push(Arc::new(hook));
        next
    }

    /// Register a hook fired with an execution error.
    #[must_use]
    pub fn on_error(&self, hook: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        let mut next = self.derive();
        next.hooks.on_error.push(Arc::new(hook));
        next
    }

    /// Render this query into a statement.
    ///
    /// Rendering without a bound grammar is a programmer error.
    pub fn statement(&self) -> Result<Statement> {
        let grammar = self.grammar.as_deref().ok_or(Error::Unrenderable)?;
        grammar.select(&self.state)
    }

    /// Execute this query, settling its result slot exactly once.
    ///
    /// The first call renders and runs the statement, firing hooks along
    /// the way; repeated calls return the cached result or error without
    /// re-contacting the adapter. Concurrent executes of one instance
    /// share a single in-flight run: late callers wait for it and observe
    /// the same settled outcome. Cancellations are not cached, so a
    /// cancelled execute may be retried. Failures propagate unchanged and
    /// are never retried here.
    #[tracing::instrument(skip_all, fields(table = %self.state.table))]
    pub async fn execute(&self, cx: &Cx, adapter: &dyn Adapter) -> Outcome<ExecutionResult, Error> {
        match self.slot.get_or_try_init(|| self.settle(cx, adapter)).await {
            Ok(Ok(result)) => Outcome::Ok(result.clone()),
            Ok(Err(err)) => Outcome::Err(err.clone()),
            Err(Unsettled::Cancelled(reason)) => Outcome::Cancelled(reason),
            Err(Unsettled::Panicked(payload)) => Outcome::Panicked(payload),
        }
    }

    /// Render, run, and fire hooks. The returned `Ok` value, success or
    /// failure, is what the slot caches; interruptions leave it empty.
    async fn settle(
        &self,
        cx: &Cx,
        adapter: &dyn Adapter,
    ) -> std::result::Result<Result<ExecutionResult>, Unsettled> {
        let statement = match self.statement() {
            Ok(statement) => statement,
            Err(err) => {
                for hook in &self.hooks.on_error {
                    hook(&err);
                }
                return Ok(Err(err));
            }
        };
        for hook in &self.hooks.on_execute {
            hook(&statement);
        }
        debug!(sql = %statement.sql, args = statement.args.len(), "executing query");

        match adapter.execute(cx, &statement).await {
            Outcome::Ok(result) => {
                for hook in &self.hooks.on_result {
                    hook(&result);
                }
                Ok(Ok(result))
            }
            Outcome::Err(err) => {
                for hook in &self.hooks.on_error {
                    hook(&err);
                }
                Ok(Err(err))
            }
            Outcome::Cancelled(reason) => Err(Unsettled::Cancelled(reason)),
            Outcome::Panicked(payload) => Err(Unsettled::Panicked(payload)),
        }
    }
}
