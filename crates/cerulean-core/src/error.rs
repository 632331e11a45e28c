//! Error types for Cerulean operations.
//!
//! Three families: programmer errors (misuse of the builder or relation
//! surface), lookup errors (data that should exist but does not), and
//! adapter errors (propagated unchanged from statement execution).

use std::fmt;

use crate::value::Value;

/// The primary error type for all Cerulean operations.
///
/// Cloneable so an execute-once cache can return the same failure to
/// repeated awaits; driver sources are shared, not duplicated.
#[derive(Debug, Clone)]
pub enum Error {
    /// A query was rendered or executed with no grammar bound
    Unrenderable,
    /// A relation-managed attribute was written directly
    CannotSet(CannotSetError),
    /// An unloaded relation was read without a prior fetch
    NotLoaded(NotLoadedError),
    /// A foreign key pointed at no existing row
    Lookup(LookupError),
    /// Statement execution failed at the adapter
    Execution(ExecutionError),
    /// A logical predicate or type name had no dialect rendering
    Translate(TranslateError),
    /// Column value had an unexpected shape
    Type(TypeError),
    /// Custom error with message
    Custom(String),
}

/// Write to an attribute the relation system owns.
#[derive(Debug, Clone)]
pub struct CannotSetError {
    /// The attribute that was written
    pub attribute: String,
    /// The relation managing it
    pub relation: String,
}

/// Read of a relation that has not been loaded.
#[derive(Debug, Clone)]
pub struct NotLoadedError {
    /// The relation that was read
    pub relation: String,
    /// The model the read happened on
    pub model: String,
}

/// A resolution that found nothing where the schema promises a row.
#[derive(Debug, Clone)]
pub struct LookupError {
    /// The related model that was searched
    pub related: String,
    /// The column the key was matched against
    pub column: String,
    /// The key value that matched nothing
    pub key: Value,
}

/// Failure reported by the adapter while executing a statement.
#[derive(Debug, Clone)]
pub struct ExecutionError {
    pub message: String,
    pub sql: Option<String>,
    pub source: Option<std::sync::Arc<dyn std::error::Error + Send + Sync>>,
}

/// A name the translator does not know.
#[derive(Debug, Clone)]
pub struct TranslateError {
    pub kind: TranslateErrorKind,
    /// The unknown name
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateErrorKind {
    /// Unknown logical predicate name
    Predicate,
    /// Unknown logical type name
    Type,
}

#[derive(Debug, Clone)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl Error {
    /// Shorthand for a guarded foreign-key write.
    pub fn cannot_set(attribute: impl Into<String>, relation: impl Into<String>) -> Self {
        Error::CannotSet(CannotSetError {
            attribute: attribute.into(),
            relation: relation.into(),
        })
    }

    /// Shorthand for reading an unloaded relation.
    pub fn not_loaded(relation: impl Into<String>, model: impl Into<String>) -> Self {
        Error::NotLoaded(NotLoadedError {
            relation: relation.into(),
            model: model.into(),
        })
    }

    /// Shorthand for an execution failure without a driver source.
    pub fn execution(message: impl Into<String>, sql: Option<String>) -> Self {
        Error::Execution(ExecutionError {
            message: message.into(),
            sql,
            source: None,
        })
    }

    /// Is this a programmer error (surface misuse, not data or adapter state)?
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Error::Unrenderable | Error::CannotSet(_) | Error::NotLoaded(_) | Error::Translate(_)
        )
    }

    /// Get the SQL that caused this error, if available.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Execution(e) => e.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unrenderable => {
                write!(f, "Query cannot be rendered: no grammar bound")
            }
            Error::CannotSet(e) => write!(
                f,
                "Cannot set attribute '{}': it is managed by relation '{}'",
                e.attribute, e.relation
            ),
            Error::NotLoaded(e) => write!(
                f,
                "Relation '{}' on '{}' is not loaded; fetch it before reading",
                e.relation, e.model
            ),
            Error::Lookup(e) => write!(
                f,
                "No '{}' row found where {} = {:?}",
                e.related, e.column, e.key
            ),
            Error::Execution(e) => {
                if let Some(sql) = &e.sql {
                    write!(f, "Execution error: {} (statement: {})", e.message, sql)
                } else {
                    write!(f, "Execution error: {}", e.message)
                }
            }
            Error::Translate(e) => match e.kind {
                TranslateErrorKind::Predicate => {
                    write!(f, "Unknown predicate '{}'", e.name)
                }
                TranslateErrorKind::Type => write!(f, "Unknown type '{}'", e.name),
            },
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Execution(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for CannotSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attribute '{}' is managed by '{}'", self.attribute, self.relation)
    }
}

impl fmt::Display for NotLoadedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "relation '{}' on '{}' is not loaded", self.relation, self.model)
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no '{}' row where {} = {:?}",
            self.related, self.column, self.key
        )
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<CannotSetError> for Error {
    fn from(err: CannotSetError) -> Self {
        Error::CannotSet(err)
    }
}

impl From<NotLoadedError> for Error {
    fn from(err: NotLoadedError) -> Self {
        Error::NotLoaded(err)
    }
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Self {
        Error::Lookup(err)
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        Error::Execution(err)
    }
}

impl From<TranslateError> for Error {
    fn from(err: TranslateError) -> Self {
        Error::Translate(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

/// Result type alias for Cerulean operations.
pub type Result<T> = std::result::Result<T, Error>;
