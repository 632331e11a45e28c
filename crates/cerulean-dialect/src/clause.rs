//! Structural clause types handed to a Grammar for assembly.

use cerulean_core::Value;

use crate::condition::{ColumnRef, Condition};

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// A single ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn asc(column: ColumnRef) -> Self {
        Self {
            column,
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(column: ColumnRef) -> Self {
        Self {
            column,
            direction: OrderDirection::Desc,
        }
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    pub const fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// One JOIN clause: a target table, the alias it is known by in the rest of
/// the statement, and the ON condition (absent for cross joins).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub alias: Option<String>,
    pub kind: JoinKind,
    pub on: Option<Condition>,
}

impl JoinClause {
    pub fn new(table: impl Into<String>, kind: JoinKind, on: Condition) -> Self {
        Self {
            table: table.into(),
            alias: None,
            kind,
            on: Some(on),
        }
    }

    /// Set the alias this table is referenced by.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name other clauses use to reference this table.
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

/// The full structural intent of a SELECT, independent of dialect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectState {
    pub table: String,
    /// Projected columns; empty means `*`
    pub columns: Vec<ColumnRef>,
    pub joins: Vec<JoinClause>,
    pub filter: Option<Condition>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectState {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Merge a condition into the filter under AND.
    pub fn add_filter(&mut self, condition: Condition) {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
    }
}

/// The structural intent of an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertState {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
    /// Column whose generated value the caller wants back
    pub returning: Option<String>,
}

impl InsertState {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            returning: None,
        }
    }

    /// Add one column/value pair.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerulean_core::Value;

    #[test]
    fn test_add_filter_merges_under_and() {
        let mut state = SelectState::from_table("posts");
        state.add_filter(Condition::eq(ColumnRef::bare("a"), 1));
        state.add_filter(Condition::eq(ColumnRef::bare("b"), 2));
        assert!(matches!(state.filter, Some(Condition::And(ref parts)) if parts.len() == 2));
    }

    #[test]
    fn test_join_reference_name_prefers_alias() {
        let join = JoinClause::new(
            "authors",
            JoinKind::Inner,
            Condition::column_eq(
                ColumnRef::qualified("posts", "author_id"),
                ColumnRef::qualified("authors", "id"),
            ),
        );
        assert_eq!(join.reference_name(), "authors");
        let aliased = join.with_alias("authors_j1");
        assert_eq!(aliased.reference_name(), "authors_j1");
    }

    #[test]
    fn test_insert_state_pairs_columns_and_values() {
        let mut state = InsertState::new("posts");
        state.set("title", "hello");
        state.set("author_id", 7_i64);
        assert_eq!(state.columns, vec!["title", "author_id"]);
        assert_eq!(
            state.values,
            vec![Value::Text("hello".to_string()), Value::BigInt(7)]
        );
    }
}
