//! The insert builder and generated-key recovery.

use std::sync::Arc;

use asupersync::{Cx, Outcome};
use cerulean_core::{Adapter, Error, ExecutionResult, Result, Statement, Value};
use cerulean_dialect::{Grammar, InsertState, wants_pseudo_return};
use cerulean_model::{Entity, ModelDef};
use tracing::debug;

/// An INSERT over one table.
///
/// When built for a model, the primary key is requested back by default,
/// either through native RETURNING or through the pseudo-return sentinel
/// on dialects without it.
pub struct Insert {
    grammar: Arc<dyn Grammar>,
    state: InsertState,
}

impl Insert {
    /// An insert into a bare table, returning nothing.
    pub fn into_table(table: impl Into<String>, grammar: Arc<dyn Grammar>) -> Self {
        Self {
            grammar,
            state: InsertState::new(table),
        }
    }

    /// An insert for a model row, returning its primary key.
    pub fn for_model(model: &Arc<ModelDef>, grammar: Arc<dyn Grammar>) -> Self {
        let mut state = InsertState::new(model.table());
        state.returning = Some(model.primary_key().to_string());
        Self { grammar, state }
    }

    /// An insert carrying an entity's dirty attributes.
    ///
    /// Columns are sorted so the rendered statement is deterministic.
    pub fn for_entity(entity: &Entity, grammar: Arc<dyn Grammar>) -> Self {
        let mut insert = Self::for_model(entity.model(), grammar);
        let mut columns: Vec<&str> = entity.dirty_attributes().collect();
        columns.sort_unstable();
        for column in columns {
            if let Some(value) = entity.attribute(column) {
                insert.state.set(column, value.clone());
            }
        }
        insert
    }

    /// Bind one column value.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.set(column, value);
        self
    }

    /// Request a generated column back, overriding the default.
    #[must_use]
    pub fn returning(mut self, column: impl Into<String>) -> Self {
        self.state.returning = Some(column.into());
        self
    }

    /// Render this insert into a statement.
    pub fn statement(&self) -> Result<Statement> {
        self.grammar.insert(&self.state)
    }

    /// Render and execute this insert.
    pub async fn execute(&self, cx: &Cx, adapter: &dyn Adapter) -> Outcome<ExecutionResult, Error> {
        let statement = match self.statement() {
            Ok(statement) => statement,
            Err(err) => return Outcome::Err(err),
        };
        debug!(sql = %statement.sql, args = statement.args.len(), "executing insert");
        adapter.execute(cx, &statement).await
    }
}

/// Recover the generated key an insert asked back for.
///
/// Statements carrying the pseudo-return sentinel read the adapter's
/// last insert id; native RETURNING statements read the requested column
/// from the first returned row.
pub fn returned_id(statement: &Statement, result: &ExecutionResult) -> Result<Value> {
    if wants_pseudo_return(&statement.sql) {
        return match result.last_insert_id {
            Some(id) => Ok(Value::BigInt(id)),
            None => Err(Error::execution(
                "adapter reported no generated key",
                Some(statement.sql.clone()),
            )),
        };
    }
    let row = result.first().ok_or_else(|| {
        Error::execution("statement returned no rows", Some(statement.sql.clone()))
    })?;
    // RETURNING renders exactly one column.
    row.get(0).cloned().ok_or_else(|| {
        Error::execution(
            "statement returned an empty row",
            Some(statement.sql.clone()),
        )
    })
}
