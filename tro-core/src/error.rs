//! Error taxonomy shared across the core.
//!
//! Every store, cache, broker and catalog failure is folded into
//! [`CoreError`] so callers can make a single recovery decision:
//! retry the transaction, surface a client error, back off, or fail fast.

use thiserror::Error;

/// Postgres error code raised when a serializable transaction must be retried.
pub const SERIALIZATION_FAILURE_CODE: &str = "40001";

/// Postgres error code for unique constraint violations.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Errors produced by the core subsystems.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The serializable transaction lost a conflict and the whole closure
    /// should be retried.
    #[error("serialization conflict")]
    SerializationConflict,

    /// A seat is already held or sold, or a duplicate row was inserted.
    #[error("conflict")]
    Conflict,

    /// The requested entity does not exist.
    #[error("not found")]
    NotFound,

    /// The request itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An I/O-shaped failure that may succeed on retry.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A failure that will not succeed on retry (schema drift, corrupt data).
    #[error("fatal: {0}")]
    Fatal(String),
}

impl CoreError {
    /// Classify a raw Postgres error code.
    pub fn from_db_code(code: &str) -> Option<Self> {
        match code {
            SERIALIZATION_FAILURE_CODE => Some(Self::SerializationConflict),
            UNIQUE_VIOLATION_CODE => Some(Self::Conflict),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) => {
                if let Some(code) = db.code() {
                    if let Some(mapped) = Self::from_db_code(&code) {
                        return mapped;
                    }
                }
                Self::Transient(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Fatal(err.to_string())
            }
            _ => Self::Transient(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for CoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<lapin::Error> for CoreError {
    fn from(err: lapin::Error) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<mongodb::error::Error> for CoreError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Fatal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_code_classification() {
        assert!(matches!(
            CoreError::from_db_code("40001"),
            Some(CoreError::SerializationConflict)
        ));
        assert!(matches!(
            CoreError::from_db_code("23505"),
            Some(CoreError::Conflict)
        ));
        assert!(CoreError::from_db_code("23503").is_none());
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: CoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, CoreError::NotFound));
    }
}
