//! # Storage Errors
//!
//! `DbError` sorts SQLite failures into the few cases the engine reacts to
//! differently:
//!
//! ```text
//! sqlx::Error
//!   ├── SQLITE_BUSY / SQLITE_LOCKED ─────────────► Busy        (retryable)
//!   ├── version CAS missed, duplicate open ──────► Conflict    (retryable)
//!   ├── UNIQUE / PRIMARY KEY ────────────────────► UniqueViolation
//!   ├── FOREIGN KEY ─────────────────────────────► ForeignKeyViolation
//!   ├── CHECK, immutability triggers ────────────► ConstraintViolation
//!   ├── pool timed out ──────────────────────────► PoolExhausted (retryable)
//!   └── anything else ───────────────────────────► QueryFailed / Internal
//! ```

use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;

/// SQLite primary result codes, taken from the low byte of extended codes.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
/// `SQLITE_CONSTRAINT_TRIGGER`: a trigger ran `RAISE(ABORT, ...)`.
const SQLITE_CONSTRAINT_TRIGGER: i32 = 1811;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Another writer got to the row first: the stored version moved on, or a
    /// racing open already inserted the day.
    #[error("Concurrent update of {entity} {key}")]
    Conflict { entity: String, key: String },

    #[error("Database is busy: {0}")]
    Busy(String),

    /// A uniqueness clash on a path that is not version-checked.
    #[error("Duplicate key: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK constraint or an immutability trigger rejected the statement.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt {entity}: {message}")]
    Corrupt { entity: String, message: String },

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>, key: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            key: key.into(),
        }
    }

    pub fn corrupt(entity: impl Into<String>, message: impl Into<String>) -> Self {
        DbError::Corrupt {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Returns true when re-reading and repeating the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DbError::Conflict { .. } | DbError::Busy(_) | DbError::PoolExhausted
        )
    }
}

/// Buckets a driver-level SQLite error.
fn classify(err: &dyn DatabaseError) -> DbError {
    let message = err.message().to_string();
    let code = err.code().and_then(|c| c.parse::<i32>().ok());

    if let Some(code) = code {
        if matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED) {
            return DbError::Busy(message);
        }
        if code == SQLITE_CONSTRAINT_TRIGGER {
            return DbError::ConstraintViolation(message);
        }
    }

    match err.kind() {
        ErrorKind::UniqueViolation => DbError::UniqueViolation {
            constraint: message
                .strip_prefix("UNIQUE constraint failed: ")
                .unwrap_or(&message)
                .to_string(),
        },
        ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
        ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
            DbError::ConstraintViolation(message)
        }
        _ if message.contains("database is locked") => DbError::Busy(message),
        _ if message.contains("immutable") || message.contains("append-only") => {
            DbError::ConstraintViolation(message)
        }
        _ => DbError::QueryFailed(message),
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => classify(db_err.as_ref()),
            sqlx::Error::RowNotFound => DbError::not_found("row", "unknown"),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::corrupt("column", format!("{index}: {source}"))
            }
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::corrupt("audit snapshot", err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
