//! # Validation Module
//!
//! Input validation for drawer operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (register screen)                                     │
//! │  └── Immediate feedback on obvious mistakes                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Amount signs and caps, reason/notes length, date ranges           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on amounts and status                           │
//! │  └── Triggers rejecting UPDATE/DELETE on the audit log                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::validation::{validate_expense_amount, validate_reopen_reason};
//!
//! assert!(validate_expense_amount(Money::from_cents(50_000)).is_ok());
//! assert!(validate_expense_amount(Money::zero()).is_err());
//! assert_eq!(validate_reopen_reason("  Counting mistake ").unwrap(), "Counting mistake");
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_DESCRIPTION_LENGTH, MAX_NOTES_LENGTH, MAX_REASON_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates the float placed in the drawer at open. Zero is allowed.
pub fn validate_opening_balance(amount: Money) -> ValidationResult<()> {
    non_negative("opening balance", amount)
}

/// Validates a physical cash count. Zero is allowed (an emptied till).
pub fn validate_actual_cash(amount: Money) -> ValidationResult<()> {
    non_negative("actual cash", amount)
}

/// Validates an expense amount. Must be strictly positive.
pub fn validate_expense_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "expense amount".to_string(),
        });
    }

    at_most_max("expense amount", amount, 1)
}

fn non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    at_most_max(field, amount, 0)
}

fn at_most_max(field: &str, amount: Money, min: i64) -> ValidationResult<()> {
    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: format!("{field} (cents)"),
            min,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Text Validators
// =============================================================================

/// Validates the reason for reopening a closed day.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most MAX_REASON_LENGTH characters
///
/// ## Returns
/// The trimmed reason.
pub fn validate_reopen_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    max_length("reason", reason, MAX_REASON_LENGTH)?;

    Ok(reason.to_string())
}

/// Validates an expense description. May be empty.
pub fn validate_expense_description(description: &str) -> ValidationResult<String> {
    let description = description.trim();
    max_length("description", description, MAX_DESCRIPTION_LENGTH)?;
    Ok(description.to_string())
}

/// Validates closing notes. Blank notes are treated as absent.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    max_length("notes", notes, MAX_NOTES_LENGTH)?;

    Ok(Some(notes.to_string()))
}

fn max_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Range Validators
// =============================================================================

/// Validates a history query range (inclusive on both ends).
///
/// ## Rules
/// - `start` must not be after `end`
/// - The range may cover at most `max_days` days
pub fn validate_date_range(start: NaiveDate, end: NaiveDate, max_days: u32) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvalidFormat {
            field: "date range".to_string(),
            reason: format!("start {} is after end {}", start, end),
        });
    }

    let days = (end - start).num_days() + 1;
    if days > i64::from(max_days) {
        return Err(ValidationError::OutOfRange {
            field: "date range (days)".to_string(),
            min: 1,
            max: i64::from(max_days),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
