//! Dialect strategy layer for Cerulean.
//!
//! Three strategies cooperate to render one structural query description
//! into dialect-correct SQL:
//!
//! - `Translator` — logical predicate/type names to SQL fragments
//! - `Phrasing` — clause composition, including RETURNING emulation
//! - `Grammar` — quoting, placeholders, and final statement assembly
//!
//! Structural types (`Condition`, `SelectState`, ...) are plain data with
//! no rendering logic of their own.

pub mod clause;
pub mod condition;
pub mod grammar;
pub mod phrasing;
pub mod translator;

pub use clause::{InsertState, JoinClause, JoinKind, OrderBy, OrderDirection, SelectState};
pub use condition::{ColumnRef, Condition};
pub use grammar::{Grammar, MysqlGrammar, PostgresGrammar, SqliteGrammar};
pub use phrasing::{
    AnsiPhrasing, MysqlPhrasing, PSEUDO_RETURN_MARKER, Phrasing, ReturningClause,
    pseudo_return_column, wants_pseudo_return,
};
pub use translator::{
    MysqlTranslator, PostgresTranslator, Predicate, SqliteTranslator, Translator,
};
