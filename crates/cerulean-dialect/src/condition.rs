//! Structural condition trees.
//!
//! Conditions are plain data describing filter intent. Nothing here renders
//! SQL; predicate names are strings validated by the Translator when a
//! Grammar assembles the statement.

use cerulean_core::Value;

/// A column reference with an optional table or alias qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or join alias
    pub table: Option<String>,
    /// Column name
    pub name: String,
}

impl ColumnRef {
    /// An unqualified column.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    /// A column qualified by a table name or alias.
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

/// A filter condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A logical predicate applied to one column and one value.
    ///
    /// The predicate name is logical ("contains", "gte", ...); its SQL
    /// shape comes from the Translator at render time.
    Compare {
        column: ColumnRef,
        predicate: String,
        value: Value,
    },

    /// Column matches any of the listed values.
    In {
        column: ColumnRef,
        values: Vec<Value>,
    },

    /// IS NULL / IS NOT NULL.
    IsNull { column: ColumnRef, negated: bool },

    /// Column-to-column equality, used in join ON fragments.
    ColumnEq { left: ColumnRef, right: ColumnRef },

    /// All sub-conditions hold.
    And(Vec<Condition>),

    /// Any sub-condition holds.
    Or(Vec<Condition>),

    /// The sub-condition does not hold.
    Not(Box<Condition>),

    /// Raw SQL fragment with bound arguments (escape hatch).
    Raw { sql: String, args: Vec<Value> },
}

impl Condition {
    /// A predicate comparison on a column.
    pub fn compare(
        column: ColumnRef,
        predicate: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Condition::Compare {
            column,
            predicate: predicate.into(),
            value: value.into(),
        }
    }

    /// Shorthand for an equality comparison.
    pub fn eq(column: ColumnRef, value: impl Into<Value>) -> Self {
        Condition::compare(column, "eq", value)
    }

    /// Membership in a value list.
    pub fn in_values(column: ColumnRef, values: Vec<Value>) -> Self {
        Condition::In { column, values }
    }

    /// IS NULL check.
    pub fn is_null(column: ColumnRef) -> Self {
        Condition::IsNull {
            column,
            negated: false,
        }
    }

    /// IS NOT NULL check.
    pub fn is_not_null(column: ColumnRef) -> Self {
        Condition::IsNull {
            column,
            negated: true,
        }
    }

    /// Column-to-column equality for join ON fragments.
    pub fn column_eq(left: ColumnRef, right: ColumnRef) -> Self {
        Condition::ColumnEq { left, right }
    }

    /// Combine with another condition under AND, flattening nested ANDs.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut parts) => {
                parts.push(other);
                Condition::And(parts)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    /// Combine with another condition under OR, flattening nested ORs.
    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut parts) => {
                parts.push(other);
                Condition::Or(parts)
            }
            first => Condition::Or(vec![first, other]),
        }
    }

    /// Negate this condition.
    pub fn negate(self) -> Self {
        Condition::Not(Box::new(self))
    }
}
