//! Predicate and type translation.
//!
//! A Translator maps logical predicate names ("contains", "gte") and
//! logical type names ("serial", "dateTime") to dialect SQL. Dialects
//! override by exception: each dialect translator supplies only its deltas
//! and everything else falls through to the shared base tables.

use cerulean_core::error::{TranslateError, TranslateErrorKind};
use cerulean_core::{Result, Value};

/// A resolved predicate: a SQL template plus an optional value rewrite.
///
/// Templates use `{col}` and `{val}` holes; `between` uses `{lo}`/`{hi}`
/// and `in` uses `{vals}`. The Phrasing layer fills holes with quoted
/// identifiers and placeholders.
#[derive(Debug, Clone, Copy)]
pub struct Predicate {
    pub format: &'static str,
    /// Optional rewrite of the bound value, e.g. wrapping in `%` for contains
    pub transform: Option<fn(&Value) -> Value>,
}

impl Predicate {
    const fn plain(format: &'static str) -> Self {
        Self {
            format,
            transform: None,
        }
    }

    const fn with(format: &'static str, transform: fn(&Value) -> Value) -> Self {
        Self {
            format,
            transform: Some(transform),
        }
    }

    /// Apply the value transform, if any.
    pub fn apply(&self, value: &Value) -> Value {
        match self.transform {
            Some(f) => f(value),
            None => value.clone(),
        }
    }
}

fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Text(s) => Value::Text(f(s)),
        other => other.clone(),
    }
}

fn wrap_contains(value: &Value) -> Value {
    map_text(value, |s| format!("%{s}%"))
}

fn wrap_prefix(value: &Value) -> Value {
    map_text(value, |s| format!("{s}%"))
}

fn wrap_suffix(value: &Value) -> Value {
    map_text(value, |s| format!("%{s}"))
}

fn lower(value: &Value) -> Value {
    map_text(value, str::to_lowercase)
}

fn lower_contains(value: &Value) -> Value {
    map_text(value, |s| format!("%{}%", s.to_lowercase()))
}

fn lower_prefix(value: &Value) -> Value {
    map_text(value, |s| format!("{}%", s.to_lowercase()))
}

fn lower_suffix(value: &Value) -> Value {
    map_text(value, |s| format!("%{}", s.to_lowercase()))
}

/// Shared base predicate table (portable SQL).
fn base_predicate(name: &str) -> Option<Predicate> {
    Some(match name {
        "exact" | "eq" => Predicate::plain("{col} = {val}"),
        "iExact" => Predicate::with("LOWER({col}) = {val}", lower),
        "contains" => Predicate::with("{col} LIKE {val}", wrap_contains),
        "iContains" => Predicate::with("LOWER({col}) LIKE {val}", lower_contains),
        "startsWith" => Predicate::with("{col} LIKE {val}", wrap_prefix),
        "iStartsWith" => Predicate::with("LOWER({col}) LIKE {val}", lower_prefix),
        "endsWith" => Predicate::with("{col} LIKE {val}", wrap_suffix),
        "iEndsWith" => Predicate::with("LOWER({col}) LIKE {val}", lower_suffix),
        "like" => Predicate::plain("{col} LIKE {val}"),
        "ne" => Predicate::plain("{col} <> {val}"),
        "lt" => Predicate::plain("{col} < {val}"),
        "lte" => Predicate::plain("{col} <= {val}"),
        "gt" => Predicate::plain("{col} > {val}"),
        "gte" => Predicate::plain("{col} >= {val}"),
        "between" => Predicate::plain("{col} BETWEEN {lo} AND {hi}"),
        "in" => Predicate::plain("{col} IN ({vals})"),
        "isNull" => Predicate::plain("{col} IS NULL"),
        "year" => Predicate::plain("EXTRACT(YEAR FROM {col}) = {val}"),
        "month" => Predicate::plain("EXTRACT(MONTH FROM {col}) = {val}"),
        "day" => Predicate::plain("EXTRACT(DAY FROM {col}) = {val}"),
        "weekday" => Predicate::plain("EXTRACT(DOW FROM {col}) = {val}"),
        _ => return None,
    })
}

/// Shared base column-type table.
fn base_type(name: &str) -> Option<&'static str> {
    Some(match name {
        "serial" => "SERIAL",
        "integer" => "INTEGER",
        "string" => "VARCHAR(255)",
        "text" => "TEXT",
        "binary" => "BLOB",
        "bool" => "BOOLEAN",
        "date" => "DATE",
        "time" => "TIME",
        "dateTime" => "TIMESTAMP",
        "float" => "REAL",
        "decimal" => "NUMERIC",
        _ => return None,
    })
}

/// Maps logical predicate and type names to dialect SQL.
pub trait Translator: Send + Sync {
    /// Dialect delta for a predicate; `None` falls through to the base table.
    fn predicate_override(&self, name: &str) -> Option<Predicate> {
        let _ = name;
        None
    }

    /// Dialect delta for a column type; `None` falls through to the base table.
    fn type_override(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    /// Resolve a logical predicate name.
    fn predicate(&self, name: &str) -> Result<Predicate> {
        self.predicate_override(name)
            .or_else(|| base_predicate(name))
            .ok_or_else(|| {
                TranslateError {
                    kind: TranslateErrorKind::Predicate,
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Resolve a logical column-type name.
    fn column_type(&self, name: &str) -> Result<&'static str> {
        self.type_override(name)
            .or_else(|| base_type(name))
            .ok_or_else(|| {
                TranslateError {
                    kind: TranslateErrorKind::Type,
                    name: name.to_string(),
                }
                .into()
            })
    }
}

/// PostgreSQL: ILIKE for the case-insensitive family, BYTEA for binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresTranslator;

impl Translator for PostgresTranslator {
    fn predicate_override(&self, name: &str) -> Option<Predicate> {
        Some(match name {
            "iExact" => Predicate::plain("{col} ILIKE {val}"),
            "iContains" => Predicate::with("{col} ILIKE {val}", wrap_contains),
            "iStartsWith" => Predicate::with("{col} ILIKE {val}", wrap_prefix),
            "iEndsWith" => Predicate::with("{col} ILIKE {val}", wrap_suffix),
            _ => return None,
        })
    }

    fn type_override(&self, name: &str) -> Option<&'static str> {
        match name {
            "binary" => Some("BYTEA"),
            _ => None,
        }
    }
}

/// SQLite: date parts via strftime, rowid-backed serial.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTranslator;

impl Translator for SqliteTranslator {
    fn predicate_override(&self, name: &str) -> Option<Predicate> {
        Some(match name {
            "year" => Predicate::plain("CAST(strftime('%Y', {col}) AS INTEGER) = {val}"),
            "month" => Predicate::plain("CAST(strftime('%m', {col}) AS INTEGER) = {val}"),
            "day" => Predicate::plain("CAST(strftime('%d', {col}) AS INTEGER) = {val}"),
            "weekday" => Predicate::plain("CAST(strftime('%w', {col}) AS INTEGER) = {val}"),
            _ => return None,
        })
    }

    fn type_override(&self, name: &str) -> Option<&'static str> {
        match name {
            "serial" => Some("INTEGER"),
            "string" => Some("TEXT"),
            "dateTime" => Some("TEXT"),
            _ => None,
        }
    }
}

/// MySQL: collation is case-insensitive by default, so the case-sensitive
/// family needs BINARY and the insensitive family is plain LIKE.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlTranslator;

impl Translator for MysqlTranslator {
    fn predicate_override(&self, name: &str) -> Option<Predicate> {
        Some(match name {
            "contains" => Predicate::with("{col} LIKE BINARY {val}", wrap_contains),
            "startsWith" => Predicate::with("{col} LIKE BINARY {val}", wrap_prefix),
            "endsWith" => Predicate::with("{col} LIKE BINARY {val}", wrap_suffix),
            "like" => Predicate::plain("{col} LIKE BINARY {val}"),
            "iExact" => Predicate::plain("{col} = {val}"),
            "iContains" => Predicate::with("{col} LIKE {val}", wrap_contains),
            "iStartsWith" => Predicate::with("{col} LIKE {val}", wrap_prefix),
            "iEndsWith" => Predicate::with("{col} LIKE {val}", wrap_suffix),
            "year" => Predicate::plain("YEAR({col}) = {val}"),
            "month" => Predicate::plain("MONTH({col}) = {val}"),
            "day" => Predicate::plain("DAYOFMONTH({col}) = {val}"),
            "weekday" => Predicate::plain("DAYOFWEEK({col}) = {val}"),
            _ => return None,
        })
    }

    fn type_override(&self, name: &str) -> Option<&'static str> {
        match name {
            "serial" => Some("BIGINT AUTO_INCREMENT"),
            "bool" => Some("TINYINT(1)"),
            "dateTime" => Some("DATETIME"),
            "binary" => Some("LONGBLOB"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerulean_core::Error;

    #[test]
    fn test_base_contains_wraps_value() {
        let predicate = PostgresTranslator.predicate("contains").unwrap();
        assert_eq!(predicate.format, "{col} LIKE {val}");
        assert_eq!(
            predicate.apply(&Value::Text("rust".to_string())),
            Value::Text("%rust%".to_string())
        );
    }

    #[test]
    fn test_postgres_icontains_uses_ilike() {
        let predicate = PostgresTranslator.predicate("iContains").unwrap();
        assert_eq!(predicate.format, "{col} ILIKE {val}");
    }

    #[test]
    fn test_mysql_case_sensitivity_split() {
        let sensitive = MysqlTranslator.predicate("contains").unwrap();
        assert_eq!(sensitive.format, "{col} LIKE BINARY {val}");
        let insensitive = MysqlTranslator.predicate("iContains").unwrap();
        assert_eq!(insensitive.format, "{col} LIKE {val}");
    }

    #[test]
    fn test_sqlite_weekday_uses_strftime() {
        let predicate = SqliteTranslator.predicate("weekday").unwrap();
        assert!(predicate.format.contains("strftime('%w'"));
    }

    #[test]
    fn test_unknown_predicate_is_translate_error() {
        let err = PostgresTranslator.predicate("soundsLike").unwrap_err();
        assert!(matches!(err, Error::Translate(ref e) if e.name == "soundsLike"));
    }

    #[test]
    fn test_type_overrides_fall_through() {
        assert_eq!(MysqlTranslator.column_type("bool").unwrap(), "TINYINT(1)");
        assert_eq!(MysqlTranslator.column_type("text").unwrap(), "TEXT");
        assert_eq!(SqliteTranslator.column_type("serial").unwrap(), "INTEGER");
        assert!(PostgresTranslator.column_type("uuidish").is_err());
    }

    #[test]
    fn test_lowercase_family_transforms() {
        let predicate = SqliteTranslator.predicate("iStartsWith").unwrap();
        assert_eq!(
            predicate.apply(&Value::Text("Ru".to_string())),
            Value::Text("ru%".to_string())
        );
    }
}
