//! Clause phrasing.
//!
//! A Phrasing turns structural clause data into SQL text, asking the
//! Grammar for quoting and placeholder style and the Translator for
//! predicate shapes. Dialect phrasings override only the clauses that
//! differ; today that is RETURNING, which MySQL cannot express natively.

use cerulean_core::{Error, Result, Value};

use crate::clause::{JoinClause, OrderBy};
use crate::condition::{ColumnRef, Condition};
use crate::grammar::Grammar;

/// Sentinel embedded in statements whose RETURNING is emulated.
pub const PSEUDO_RETURN_MARKER: &str = "pseudo-return:";

/// Check whether a rendered statement carries the pseudo-return sentinel.
pub fn wants_pseudo_return(sql: &str) -> bool {
    sql.contains(PSEUDO_RETURN_MARKER)
}

/// Extract the returning column named by the pseudo-return sentinel.
pub fn pseudo_return_column(sql: &str) -> Option<&str> {
    let start = sql.find(PSEUDO_RETURN_MARKER)? + PSEUDO_RETURN_MARKER.len();
    let rest = &sql[start..];
    let end = rest.find(" */")?;
    Some(&rest[..end])
}

/// How a grammar asks for generated values back from an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturningClause {
    /// Dialect supports RETURNING; the clause text is appended as-is
    Native(String),
    /// Dialect cannot return rows from an insert; the sentinel comment is
    /// appended and the generated key is recovered from the adapter's
    /// insert-id signal after execution
    Emulated(String),
}

impl ReturningClause {
    /// The text appended to the statement either way.
    pub fn as_sql(&self) -> &str {
        match self {
            ReturningClause::Native(sql) | ReturningClause::Emulated(sql) => sql,
        }
    }
}

fn render_column(grammar: &dyn Grammar, column: &ColumnRef) -> String {
    match &column.table {
        Some(table) => format!(
            "{}.{}",
            grammar.quote_ident(table),
            grammar.quote_ident(&column.name)
        ),
        None => grammar.quote_ident(&column.name),
    }
}

fn bind(grammar: &dyn Grammar, args: &mut Vec<Value>, value: Value) -> String {
    let placeholder = grammar.placeholder(args.len() + 1);
    args.push(value);
    placeholder
}

/// Composes clause text for one dialect family.
pub trait Phrasing: Send + Sync {
    /// Render a condition tree, appending bound values to `args`.
    fn condition(
        &self,
        grammar: &dyn Grammar,
        condition: &Condition,
        args: &mut Vec<Value>,
    ) -> Result<String> {
        match condition {
            Condition::Compare {
                column,
                predicate,
                value,
            } => {
                let resolved = grammar.translator().predicate(predicate)?;
                let bound = resolved.apply(value);
                let col = render_column(grammar, column);
                let mut sql = resolved.format.replace("{col}", &col);
                if sql.contains("{lo}") {
                    let Value::Array(pair) = &bound else {
                        return Err(Error::Custom(format!(
                            "predicate '{predicate}' requires a two-element array"
                        )));
                    };
                    let [lo, hi] = pair.as_slice() else {
                        return Err(Error::Custom(format!(
                            "predicate '{predicate}' requires a two-element array"
                        )));
                    };
                    let lo_ph = bind(grammar, args, lo.clone());
                    let hi_ph = bind(grammar, args, hi.clone());
                    sql = sql.replace("{lo}", &lo_ph).replace("{hi}", &hi_ph);
                } else if sql.contains("{vals}") {
                    let Value::Array(values) = &bound else {
                        return Err(Error::Custom(format!(
                            "predicate '{predicate}' requires an array value"
                        )));
                    };
                    if values.is_empty() {
                        return Ok("1 = 0".to_string());
                    }
                    let placeholders: Vec<String> = values
                        .iter()
                        .map(|v| bind(grammar, args, v.clone()))
                        .collect();
                    sql = sql.replace("{vals}", &placeholders.join(", "));
                } else if sql.contains("{val}") {
                    let placeholder = bind(grammar, args, bound);
                    sql = sql.replace("{val}", &placeholder);
                }
                Ok(sql)
            }
            Condition::In { column, values } => {
                if values.is_empty() {
                    return Ok("1 = 0".to_string());
                }
                let col = render_column(grammar, column);
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| bind(grammar, args, v.clone()))
                    .collect();
                Ok(format!("{col} IN ({})", placeholders.join(", ")))
            }
            Condition::IsNull { column, negated } => {
                let col = render_column(grammar, column);
                if *negated {
                    Ok(format!("{col} IS NOT NULL"))
                } else {
                    Ok(format!("{col} IS NULL"))
                }
            }
            Condition::ColumnEq { left, right } => Ok(format!(
                "{} = {}",
                render_column(grammar, left),
                render_column(grammar, right)
            )),
            Condition::And(parts) => self.connective(grammar, parts, " AND ", args),
            Condition::Or(parts) => self.connective(grammar, parts, " OR ", args),
            Condition::Not(inner) => {
                let rendered = self.condition(grammar, inner, args)?;
                Ok(format!("NOT ({rendered})"))
            }
            Condition::Raw {
                sql,
                args: raw_args,
            } => {
                args.extend(raw_args.iter().cloned());
                Ok(sql.clone())
            }
        }
    }

    /// Render parts joined by a connective, parenthesizing composite parts.
    fn connective(
        &self,
        grammar: &dyn Grammar,
        parts: &[Condition],
        joiner: &str,
        args: &mut Vec<Value>,
    ) -> Result<String> {
        let mut rendered = Vec::with_capacity(parts.len());
        for part in parts {
            let text = self.condition(grammar, part, args)?;
            let composite = matches!(part, Condition::And(_) | Condition::Or(_));
            rendered.push(if composite { format!("({text})") } else { text });
        }
        Ok(rendered.join(joiner))
    }

    /// WHERE clause including the leading keyword, or empty.
    fn where_clause(
        &self,
        grammar: &dyn Grammar,
        filter: Option<&Condition>,
        args: &mut Vec<Value>,
    ) -> Result<String> {
        match filter {
            Some(condition) => {
                let rendered = self.condition(grammar, condition, args)?;
                Ok(format!(" WHERE {rendered}"))
            }
            None => Ok(String::new()),
        }
    }

    /// One JOIN clause including its ON condition.
    fn join_clause(
        &self,
        grammar: &dyn Grammar,
        join: &JoinClause,
        args: &mut Vec<Value>,
    ) -> Result<String> {
        let mut sql = format!(" {} {}", join.kind.as_sql(), grammar.quote_ident(&join.table));
        if let Some(alias) = &join.alias {
            sql.push_str(" AS ");
            sql.push_str(&grammar.quote_ident(alias));
        }
        if let Some(on) = &join.on {
            let rendered = self.condition(grammar, on, args)?;
            sql.push_str(" ON ");
            sql.push_str(&rendered);
        }
        Ok(sql)
    }

    /// ORDER BY clause including the leading keyword, or empty.
    fn order_by_clause(&self, grammar: &dyn Grammar, order_by: &[OrderBy]) -> String {
        if order_by.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = order_by
            .iter()
            .map(|term| {
                format!(
                    "{} {}",
                    render_column(grammar, &term.column),
                    term.direction.as_sql()
                )
            })
            .collect();
        format!(" ORDER BY {}", terms.join(", "))
    }

    /// LIMIT / OFFSET clause, or empty.
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut sql = String::new();
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        sql
    }

    /// Projection list; `*` when no columns are named.
    fn columns(&self, grammar: &dyn Grammar, columns: &[ColumnRef]) -> String {
        if columns.is_empty() {
            return "*".to_string();
        }
        let rendered: Vec<String> = columns
            .iter()
            .map(|column| render_column(grammar, column))
            .collect();
        rendered.join(", ")
    }

    /// How generated insert values come back.
    fn returning(&self, grammar: &dyn Grammar, column: &str) -> ReturningClause {
        ReturningClause::Native(format!(" RETURNING {}", grammar.quote_ident(column)))
    }
}

/// Base phrasing shared by dialects with native RETURNING.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiPhrasing;

impl Phrasing for AnsiPhrasing {}

/// MySQL phrasing: RETURNING is emulated through the sentinel marker.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlPhrasing;

impl Phrasing for MysqlPhrasing {
    fn returning(&self, _grammar: &dyn Grammar, column: &str) -> ReturningClause {
        ReturningClause::Emulated(format!(" /* {PSEUDO_RETURN_MARKER}{column} */"))
    }
}
