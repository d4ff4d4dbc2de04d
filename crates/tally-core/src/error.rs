//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - State machine and policy violations            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures, version conflicts            │
//! │                                                                         │
//! │  tally-register errors                                                 │
//! │  └── RegisterError    - What callers see (with ErrorCode)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                          DbError ───┴──► RegisterError → Caller        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::auth::{Action, Role};
use crate::types::DrawerStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by drawer transitions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The drawer's current status does not permit the action.
    ///
    /// ## When This Occurs
    /// - Opening a day that already has a record
    /// - Recording an expense on an unopened or closed day
    /// - Closing a day that is not open (a closed day must be reopened first)
    /// - Reopening a day that is not closed
    #[error("Drawer for {date} is {status}, cannot {action}")]
    InvalidState {
        date: NaiveDate,
        status: DrawerStatus,
        action: Action,
    },

    /// The actor's role does not permit the action.
    #[error("{actor} ({role}) is not allowed to {action}")]
    Unauthorized {
        actor: String,
        role: Role,
        action: Action,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any state is consulted, so a malformed request never
/// reaches storage.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be zero or more.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid combination or format (e.g., an inverted date range).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
