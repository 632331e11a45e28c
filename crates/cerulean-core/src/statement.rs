//! Executable statements and their results.

use serde::{Deserialize, Serialize};

use crate::row::Row;
use crate::value::Value;

/// A rendered SQL statement with its bound arguments.
///
/// Statements are plain values: two statements with the same text and the
/// same arguments compare equal, regardless of which query produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// The SQL text with dialect placeholders already in place
    pub sql: String,
    /// Bound arguments in placeholder order
    pub args: Vec<Value>,
}

impl Statement {
    /// Create a new statement.
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Create a statement with no bound arguments.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// The result of executing one statement.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Fetched rows, empty for statements that return none
    pub rows: Vec<Row>,
    /// Field names of the result set, in column order
    pub fields: Vec<String>,
    /// Number of rows affected by a write
    pub affected: u64,
    /// Generated key from the last insert, when the backend reports one
    pub last_insert_id: Option<i64>,
}

impl ExecutionResult {
    /// Result of a write that touched `affected` rows and returned nothing.
    pub fn affected(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    /// Result carrying fetched rows.
    pub fn with_rows(fields: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            rows,
            fields,
            affected: 0,
            last_insert_id: None,
        }
    }

    /// First row of the result set, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Check if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
