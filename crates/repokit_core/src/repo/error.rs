//! Repository error taxonomy.
//!
//! Compile-time variants (`UnknownAttribute`, `UnsupportedOperator`,
//! `ParameterMismatch`, `MissingParameter`, `InvalidQuery`) are always raised
//! before any store round-trip. Store failures pass through as `Db`.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Store failure, propagated unmodified.
    Db(DbError),
    /// Attribute path does not exist on the target entity.
    UnknownAttribute { entity: &'static str, path: String },
    /// Operator keyword unknown, or not applicable to the attribute type.
    UnsupportedOperator { operator: String, reason: String },
    /// Binding count disagrees with placeholder count.
    ParameterMismatch { expected: usize, actual: usize },
    /// Named placeholder without a binding, or a binding without a placeholder.
    MissingParameter(String),
    /// Malformed query template, assignment, or page request.
    InvalidQuery(String),
    /// Dispatch to a query name that was never declared.
    UnknownQuery(String),
    /// Single-result query matched more than one row.
    NonUniqueResult { query: String },
    /// Row width disagrees with the target shape.
    ProjectionArity { expected: usize, actual: usize },
    /// Persisted identity has no row.
    NotFound { entity: &'static str, id: i64 },
    /// Column value cannot be converted to the requested type.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownAttribute { entity, path } => {
                write!(f, "unknown attribute `{path}` on entity `{entity}`")
            }
            Self::UnsupportedOperator { operator, reason } => {
                write!(f, "unsupported operator `{operator}`: {reason}")
            }
            Self::ParameterMismatch { expected, actual } => write!(
                f,
                "query expects {expected} parameter(s) but {actual} were bound"
            ),
            Self::MissingParameter(name) => write!(f, "unmatched query parameter `{name}`"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::UnknownQuery(name) => write!(f, "no query declared under `{name}`"),
            Self::NonUniqueResult { query } => {
                write!(f, "query `{query}` returned more than one row")
            }
            Self::ProjectionArity { expected, actual } => write!(
                f,
                "projection expects {expected} column(s) but row has {actual}"
            ),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
