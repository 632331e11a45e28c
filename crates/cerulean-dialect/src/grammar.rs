//! Statement assembly.
//!
//! A Grammar owns the dialect's quoting and placeholder style plus its
//! Translator and Phrasing, and assembles structural intent into a
//! [`Statement`]. All variable values are bound as args, never
//! interpolated into the SQL text.

use cerulean_core::{Result, Statement, Value, quote_ident, quote_ident_mysql};
use tracing::trace;

use crate::clause::{InsertState, SelectState};
use crate::phrasing::{AnsiPhrasing, MysqlPhrasing, Phrasing};
use crate::translator::{MysqlTranslator, PostgresTranslator, SqliteTranslator, Translator};

/// Renders structural query intent into dialect SQL.
pub trait Grammar: Send + Sync {
    /// The predicate/type translator for this dialect.
    fn translator(&self) -> &dyn Translator;

    /// The clause phrasing for this dialect.
    fn phrasing(&self) -> &dyn Phrasing;

    /// Quote an identifier. ANSI double-quoting by default.
    fn quote_ident(&self, name: &str) -> String {
        quote_ident(name)
    }

    /// Placeholder for the 1-based parameter index. `$n` by default.
    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    /// Assemble a SELECT statement.
    fn select(&self, state: &SelectState) -> Result<Statement>;

    /// Assemble an INSERT statement.
    fn insert(&self, state: &InsertState) -> Result<Statement>;
}

/// Shared SELECT assembly; each grammar delegates here.
pub fn compose_select(grammar: &dyn Grammar, state: &SelectState) -> Result<Statement> {
    let phrasing = grammar.phrasing();
    let mut args = Vec::new();

    let mut sql = format!(
        "SELECT {} FROM {}",
        phrasing.columns(grammar, &state.columns),
        grammar.quote_ident(&state.table)
    );
    for join in &state.joins {
        sql.push_str(&phrasing.join_clause(grammar, join, &mut args)?);
    }
    sql.push_str(&phrasing.where_clause(grammar, state.filter.as_ref(), &mut args)?);
    sql.push_str(&phrasing.order_by_clause(grammar, &state.order_by));
    sql.push_str(&phrasing.limit_offset(state.limit, state.offset));

    trace!(sql = %sql, args = args.len(), "composed select");
    Ok(Statement::new(sql, args))
}

/// Shared INSERT assembly; each grammar delegates here.
pub fn compose_insert(grammar: &dyn Grammar, state: &InsertState) -> Result<Statement> {
    let mut args = Vec::new();
    let columns: Vec<String> = state
        .columns
        .iter()
        .map(|column| grammar.quote_ident(column))
        .collect();
    let mut slots = Vec::with_capacity(state.values.len());
    for value in &state.values {
        if matches!(value, Value::Default) {
            slots.push("DEFAULT".to_string());
        } else {
            let placeholder = grammar.placeholder(args.len() + 1);
            args.push(value.clone());
            slots.push(placeholder);
        }
    }

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        grammar.quote_ident(&state.table),
        columns.join(", "),
        slots.join(", ")
    );
    if let Some(column) = &state.returning {
        let clause = grammar.phrasing().returning(grammar, column);
        sql.push_str(clause.as_sql());
    }

    trace!(sql = %sql, args = args.len(), "composed insert");
    Ok(Statement::new(sql, args))
}

/// PostgreSQL grammar: ANSI quoting, `$n` placeholders, native RETURNING.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresGrammar {
    translator: PostgresTranslator,
    phrasing: AnsiPhrasing,
}

impl Grammar for PostgresGrammar {
    fn translator(&self) -> &dyn Translator {
        &self.translator
    }

    fn phrasing(&self) -> &dyn Phrasing {
        &self.phrasing
    }

    fn select(&self, state: &SelectState) -> Result<Statement> {
        compose_select(self, state)
    }

    fn insert(&self, state: &InsertState) -> Result<Statement> {
        compose_insert(self, state)
    }
}

/// SQLite grammar: ANSI quoting, `?n` placeholders, native RETURNING.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGrammar {
    translator: SqliteTranslator,
    phrasing: AnsiPhrasing,
}

impl Grammar for SqliteGrammar {
    fn translator(&self) -> &dyn Translator {
        &self.translator
    }

    fn phrasing(&self) -> &dyn Phrasing {
        &self.phrasing
    }

    fn placeholder(&self, index: usize) -> String {
        format!("?{index}")
    }

    fn select(&self, state: &SelectState) -> Result<Statement> {
        compose_select(self, state)
    }

    fn insert(&self, state: &InsertState) -> Result<Statement> {
        compose_insert(self, state)
    }
}

/// MySQL grammar: backtick quoting, bare `?` placeholders, emulated
/// RETURNING via the pseudo-return sentinel.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlGrammar {
    translator: MysqlTranslator,
    phrasing: MysqlPhrasing,
}

impl Grammar for MysqlGrammar {
    fn translator(&self) -> &dyn Translator {
        &self.translator
    }

    fn phrasing(&self) -> &dyn Phrasing {
        &self.phrasing
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_ident_mysql(name)
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn select(&self, state: &SelectState) -> Result<Statement> {
        compose_select(self, state)
    }

    fn insert(&self, state: &InsertState) -> Result<Statement> {
        compose_insert(self, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{JoinClause, JoinKind, OrderBy};
    use crate::condition::{ColumnRef, Condition};
    use crate::phrasing::{pseudo_return_column, wants_pseudo_return};

    fn title_filter() -> Condition {
        Condition::compare(
            ColumnRef::qualified("posts", "title"),
            "contains",
            "rust",
        )
    }

    #[test]
    fn test_postgres_select_with_filter() {
        let mut state = SelectState::from_table("posts");
        state.add_filter(title_filter());
        let statement = PostgresGrammar::default().select(&state).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM \"posts\" WHERE \"posts\".\"title\" LIKE $1"
        );
        assert_eq!(statement.args, vec![Value::Text("%rust%".to_string())]);
    }

    #[test]
    fn test_sqlite_numbered_placeholders() {
        let mut state = SelectState::from_table("posts");
        state.add_filter(
            Condition::eq(ColumnRef::bare("a"), 1).and(Condition::eq(ColumnRef::bare("b"), 2)),
        );
        let statement = SqliteGrammar::default().select(&state).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM \"posts\" WHERE \"a\" = ?1 AND \"b\" = ?2"
        );
    }

    #[test]
    fn test_mysql_backticks_and_binary_like() {
        let mut state = SelectState::from_table("posts");
        state.add_filter(title_filter());
        let statement = MysqlGrammar::default().select(&state).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM `posts` WHERE `posts`.`title` LIKE BINARY ?"
        );
    }

    #[test]
    fn test_mysql_icontains_plain_like() {
        let mut state = SelectState::from_table("posts");
        state.add_filter(Condition::compare(
            ColumnRef::qualified("posts", "title"),
            "iContains",
            "rust",
        ));
        let statement = MysqlGrammar::default().select(&state).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM `posts` WHERE `posts`.`title` LIKE ?"
        );
        assert_eq!(statement.args, vec![Value::Text("%rust%".to_string())]);
    }

    #[test]
    fn test_select_with_join_order_limit() {
        let mut state = SelectState::from_table("posts");
        state.joins.push(
            JoinClause::new(
                "authors",
                JoinKind::Inner,
                Condition::column_eq(
                    ColumnRef::qualified("posts", "author_id"),
                    ColumnRef::qualified("authors", "id"),
                ),
            ),
        );
        state.order_by.push(OrderBy::desc(ColumnRef::qualified("posts", "id")));
        state.limit = Some(10);
        state.offset = Some(20);
        let statement = PostgresGrammar::default().select(&state).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM \"posts\" \
             INNER JOIN \"authors\" ON \"posts\".\"author_id\" = \"authors\".\"id\" \
             ORDER BY \"posts\".\"id\" DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_aliased_join_renders_as() {
        let mut state = SelectState::from_table("comments");
        state.joins.push(
            JoinClause::new(
                "authors",
                JoinKind::Inner,
                Condition::column_eq(
                    ColumnRef::qualified("comments", "author_id"),
                    ColumnRef::qualified("authors_j1", "id"),
                ),
            )
            .with_alias("authors_j1"),
        );
        let statement = PostgresGrammar::default().select(&state).unwrap();
        assert!(statement.sql.contains("INNER JOIN \"authors\" AS \"authors_j1\" ON"));
    }

    #[test]
    fn test_empty_in_renders_false() {
        let mut state = SelectState::from_table("posts");
        state.add_filter(Condition::in_values(ColumnRef::bare("id"), Vec::new()));
        let statement = PostgresGrammar::default().select(&state).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM \"posts\" WHERE 1 = 0");
        assert!(statement.args.is_empty());
    }

    #[test]
    fn test_in_binds_each_value() {
        let mut state = SelectState::from_table("authors");
        state.add_filter(Condition::in_values(
            ColumnRef::qualified("authors", "id"),
            vec![Value::BigInt(1), Value::BigInt(2)],
        ));
        let statement = PostgresGrammar::default().select(&state).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM \"authors\" WHERE \"authors\".\"id\" IN ($1, $2)"
        );
        assert_eq!(statement.args, vec![Value::BigInt(1), Value::BigInt(2)]);
    }

    #[test]
    fn test_postgres_insert_native_returning() {
        let mut state = InsertState::new("posts");
        state.set("title", "hello");
        state.returning = Some("id".to_string());
        let statement = PostgresGrammar::default().insert(&state).unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"posts\" (\"title\") VALUES ($1) RETURNING \"id\""
        );
        assert!(!wants_pseudo_return(&statement.sql));
    }

    #[test]
    fn test_mysql_insert_pseudo_return_marker() {
        let mut state = InsertState::new("posts");
        state.set("title", "hello");
        state.returning = Some("id".to_string());
        let statement = MysqlGrammar::default().insert(&state).unwrap();
        assert!(wants_pseudo_return(&statement.sql));
        assert_eq!(pseudo_return_column(&statement.sql), Some("id"));
        assert!(statement.sql.starts_with("INSERT INTO `posts` (`title`) VALUES (?)"));
    }

    #[test]
    fn test_insert_default_keyword_not_bound() {
        let mut state = InsertState::new("posts");
        state.set("title", "hello");
        state.set("created_at", Value::Default);
        let statement = PostgresGrammar::default().insert(&state).unwrap();
        assert_eq!(
            statement.sql,
            "INSERT INTO \"posts\" (\"title\", \"created_at\") VALUES ($1, DEFAULT)"
        );
        assert_eq!(statement.args.len(), 1);
    }

    #[test]
    fn test_unknown_predicate_surfaces_at_render_time() {
        let mut state = SelectState::from_table("posts");
        state.add_filter(Condition::compare(
            ColumnRef::bare("title"),
            "soundsLike",
            "rust",
        ));
        assert!(PostgresGrammar::default().select(&state).is_err());
    }

    #[test]
    fn test_between_binds_two_values() {
        let mut state = SelectState::from_table("posts");
        state.add_filter(Condition::compare(
            ColumnRef::bare("id"),
            "between",
            Value::Array(vec![Value::BigInt(1), Value::BigInt(9)]),
        ));
        let statement = PostgresGrammar::default().select(&state).unwrap();
        assert_eq!(
            statement.sql,
            "SELECT * FROM \"posts\" WHERE \"id\" BETWEEN $1 AND $2"
        );
    }
}
