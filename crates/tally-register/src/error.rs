//! # Register Error Type
//!
//! The single error type every engine operation returns.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally Register                         │
//! │                                                                         │
//! │  ValidationError ─► CoreError ──────┐                                  │
//! │                                     ├──► RegisterError ──► caller      │
//! │  sqlx::Error ─────► DbError ────────┘        │                          │
//! │                                              ├── code()  → ErrorCode   │
//! │  collaborator failure ─► Collaborator        ├── is_retryable()        │
//! │  config file / env ────► Config/Io/Parse     └── to_response()         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is retried automatically. A failed operation leaves no partial
//! state, so a caller seeing `is_retryable() == true` may re-read the drawer
//! and try again.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use tally_core::{Action, CoreError, DrawerStatus, ValidationError};
use tally_db::DbError;

/// Errors returned by the reconciliation engine and its support code.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Malformed input: negative amount, empty reason, bad date range.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The action is not permitted in the drawer's current status.
    #[error("Drawer for {date} is {status}, cannot {action}")]
    InvalidState {
        date: NaiveDate,
        status: DrawerStatus,
        action: Action,
    },

    /// The actor is unknown or their role does not permit the action.
    #[error("{actor} is not authorized: {reason}")]
    Unauthorized { actor: String, reason: String },

    /// Nothing is recorded under the requested key.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// Another writer changed the same day first.
    #[error("Drawer for {key} was modified concurrently, retry the operation")]
    Concurrency { key: String },

    /// A collaborating service (sales totals, actor directory) failed.
    #[error("Collaborator failed: {0}")]
    Collaborator(String),

    /// Any other storage failure.
    #[error("Storage error: {0}")]
    Storage(DbError),

    /// Configuration is invalid or could not be saved.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while reading or writing configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for the expected shape.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for register operations.
pub type RegisterResult<T> = Result<T, RegisterError>;

/// Machine-readable error codes.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (e.code) {
///   case 'CONCURRENT_MODIFICATION': reloadAndRetry(); break;
///   case 'INVALID_STATE':           refreshStatus();  break;
///   case 'VALIDATION_ERROR':        showForm(e.message); break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidState,
    Unauthorized,
    NotFound,
    ConcurrentModification,
    CollaboratorError,
    DatabaseError,
    ConfigError,
}

/// Serializable form of an error, as the register screen receives it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl RegisterError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        RegisterError::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Creates an Unauthorized error.
    pub fn unauthorized(actor: impl Into<String>, reason: impl Into<String>) -> Self {
        RegisterError::Unauthorized {
            actor: actor.into(),
            reason: reason.into(),
        }
    }

    /// Maps a storage error raised while working on `date`.
    ///
    /// A busy or locked database is reported against the date being written.
    pub fn storage(date: NaiveDate, err: DbError) -> Self {
        match err {
            DbError::Busy(_) => RegisterError::Concurrency {
                key: date.to_string(),
            },
            other => other.into(),
        }
    }

    /// Returns the machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RegisterError::Validation(_) => ErrorCode::ValidationError,
            RegisterError::InvalidState { .. } => ErrorCode::InvalidState,
            RegisterError::Unauthorized { .. } => ErrorCode::Unauthorized,
            RegisterError::NotFound { .. } => ErrorCode::NotFound,
            RegisterError::Concurrency { .. } => ErrorCode::ConcurrentModification,
            RegisterError::Collaborator(_) => ErrorCode::CollaboratorError,
            RegisterError::Storage(_) => ErrorCode::DatabaseError,
            RegisterError::Config(_) | RegisterError::Io(_) | RegisterError::ConfigParse(_) => {
                ErrorCode::ConfigError
            }
        }
    }

    /// Returns true when the caller may re-read and try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegisterError::Concurrency { .. } | RegisterError::Collaborator(_) => true,
            RegisterError::Storage(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Builds the serializable response for this error.
    ///
    /// Storage failures carry a generic message; the detail is logged.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            RegisterError::Storage(err) => {
                tracing::error!(error = %err, "Storage failure");
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse {
            code: self.code(),
            message,
            retryable: self.is_retryable(),
        }
    }
}

/// Converts core errors to register errors.
impl From<CoreError> for RegisterError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidState {
                date,
                status,
                action,
            } => RegisterError::InvalidState {
                date,
                status,
                action,
            },
            CoreError::Unauthorized {
                actor,
                role,
                action,
            } => RegisterError::Unauthorized {
                actor,
                reason: format!("role {role} may not {action}"),
            },
            CoreError::Validation(e) => RegisterError::Validation(e),
        }
    }
}

/// Converts database errors to register errors.
impl From<DbError> for RegisterError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict { key, .. } => RegisterError::Concurrency { key },
            DbError::Busy(_) => RegisterError::Concurrency {
                key: "database".to_string(),
            },
            DbError::NotFound { entity, id } => RegisterError::NotFound { entity, key: id },
            other => {
                tracing::error!(error = %other, "Database operation failed");
                RegisterError::Storage(other)
            }
        }
    }
}

impl From<toml::ser::Error> for RegisterError {
    fn from(err: toml::ser::Error) -> Self {
        RegisterError::Config(format!("Failed to serialize configuration: {err}"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Role;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn test_core_errors_map_to_codes() {
        let err: RegisterError = CoreError::InvalidState {
            date: day(),
            status: DrawerStatus::Closed,
            action: Action::Close,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InvalidState);
        assert!(!err.is_retryable());

        let err: RegisterError = CoreError::Unauthorized {
            actor: "cashier-1".to_string(),
            role: Role::Cashier,
            action: Action::Reopen,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(
            err.to_string(),
            "cashier-1 is not authorized: role cashier may not reopen"
        );

        let err: RegisterError = CoreError::Validation(ValidationError::Required {
            field: "reason".to_string(),
        })
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_conflicts_are_retryable() {
        let err: RegisterError = DbError::conflict("drawer", "2024-01-10").into();
        assert!(matches!(err, RegisterError::Concurrency { ref key } if key == "2024-01-10"));
        assert!(err.is_retryable());

        let err = RegisterError::storage(day(), DbError::Busy("database is locked".to_string()));
        assert_eq!(err.code(), ErrorCode::ConcurrentModification);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_storage_errors_hide_detail() {
        let err: RegisterError = DbError::QueryFailed("no such table: x".to_string()).into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert!(!err.is_retryable());

        let response = err.to_response();
        assert_eq!(response.message, "Database operation failed");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "DATABASE_ERROR");
        assert_eq!(json["retryable"], false);
    }

    #[test]
    fn test_concurrency_code_serializes() {
        let err = RegisterError::Concurrency {
            key: "2024-01-10".to_string(),
        };
        let json = serde_json::to_value(err.to_response()).unwrap();
        assert_eq!(json["code"], "CONCURRENT_MODIFICATION");
        assert_eq!(json["retryable"], true);
    }
}
