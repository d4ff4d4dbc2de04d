//! # Drawer Transitions
//!
//! The drawer state machine as pure functions. Each operation takes the
//! current record (or `None` for an unopened day), the caller's input, the
//! resolved actor and the timestamp, and returns a [`Transition`] describing
//! everything that must be written atomically.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine (tally-register)                                                │
//! │     │  load record, live cash sales, now                                │
//! │     ▼                                                                   │
//! │  reconcile::close_drawer(...)  ← THIS MODULE                            │
//! │     │  1. authorize(actor, action)                                      │
//! │     │  2. validate input                                                │
//! │     │  3. check status                                                  │
//! │     │  4. build next record + audit entry                               │
//! │     ▼                                                                   │
//! │  Transition { record, expected_version, expense, audit }                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  tally-db persists in ONE transaction (version compare-and-swap)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here reads a clock or a database, so every rule is testable with
//! plain values.

use chrono::{DateTime, NaiveDate, Utc};

use crate::auth::{authorize, Action};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    Actor, AuditSnapshot, DrawerRecord, DrawerStatus, Expense, NewAuditEntry, NewExpense,
};
use crate::validation::{
    validate_actual_cash, validate_expense_amount, validate_expense_description, validate_notes,
    validate_opening_balance, validate_reopen_reason,
};

/// Everything one successful operation changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The record as it must look after the write.
    pub record: DrawerRecord,
    /// Version the stored record must still have; `None` when creating it.
    pub expected_version: Option<i64>,
    /// A newly recorded expense, if the operation added one.
    pub expense: Option<Expense>,
    /// The entry to append to the day's audit log.
    pub audit: NewAuditEntry,
}

impl Transition {
    /// Returns true when the transition creates the day's record.
    pub fn creates_record(&self) -> bool {
        self.expected_version.is_none()
    }
}

fn status_of(record: Option<&DrawerRecord>) -> DrawerStatus {
    record.map_or(DrawerStatus::Unopened, |r| r.status)
}

fn invalid_state(date: NaiveDate, status: DrawerStatus, action: Action) -> CoreError {
    CoreError::InvalidState {
        date,
        status,
        action,
    }
}

/// Requires an active (Open or Reopened) record and returns it.
fn require_active(
    record: Option<&DrawerRecord>,
    date: NaiveDate,
    action: Action,
) -> CoreResult<&DrawerRecord> {
    match record {
        Some(r) if r.status.is_active() => Ok(r),
        other => Err(invalid_state(date, status_of(other), action)),
    }
}

/// Advances a record to its next stored version.
fn next_version(current: &DrawerRecord) -> (DrawerRecord, Option<i64>) {
    let mut next = current.clone();
    next.version = current.version + 1;
    (next, Some(current.version))
}

// =============================================================================
// Open
// =============================================================================

/// Opens the drawer for `date` with a counted float.
///
/// ## Errors
/// - `Validation` if `opening_balance` is negative
/// - `InvalidState` if the day already has a record (Open, Closed or Reopened)
pub fn open_drawer(
    existing: Option<&DrawerRecord>,
    date: NaiveDate,
    opening_balance: Money,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<Transition> {
    authorize(actor, Action::Open)?;
    validate_opening_balance(opening_balance)?;

    if let Some(record) = existing {
        return Err(invalid_state(date, record.status, Action::Open));
    }

    let record = DrawerRecord {
        date,
        status: DrawerStatus::Open,
        opening_balance,
        opened_by: actor.id.clone(),
        opened_at: now,
        expenses: Vec::new(),
        actual_cash: None,
        difference: None,
        closed_at: None,
        closed_by: None,
        notes: None,
        reopened_at: None,
        reopened_by: None,
        reopen_reason: None,
        version: 1,
    };

    let audit = NewAuditEntry::new(date, actor, now, None, AuditSnapshot::Open { opening_balance });

    Ok(Transition {
        record,
        expected_version: None,
        expense: None,
        audit,
    })
}

// =============================================================================
// Add Expense
// =============================================================================

/// Records a cash outflow against an active drawer.
///
/// ## Errors
/// - `Validation` for a non-positive amount or an over-long description
/// - `InvalidState` if the day is unopened or closed
pub fn add_expense(
    existing: Option<&DrawerRecord>,
    date: NaiveDate,
    input: NewExpense,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<Transition> {
    authorize(actor, Action::AddExpense)?;
    validate_expense_amount(input.amount)?;
    let description = validate_expense_description(&input.description)?;

    let current = require_active(existing, date, Action::AddExpense)?;
    let (mut record, expected_version) = next_version(current);

    let expense = Expense {
        date,
        sequence: current.expenses.len() as i64 + 1,
        amount: input.amount,
        category: input.category,
        description: description.clone(),
        recorded_by: actor.id.clone(),
        recorded_at: now,
    };
    record.expenses.push(expense.clone());

    let snapshot = AuditSnapshot::ExpenseAdded {
        expense_sequence: expense.sequence,
        amount: expense.amount,
        category: expense.category,
        description: description.clone(),
        cash_expenses: record.cash_expenses(),
    };
    let note = Some(description).filter(|d| !d.is_empty());
    let audit = NewAuditEntry::new(date, actor, now, note, snapshot);

    Ok(Transition {
        record,
        expected_version,
        expense: Some(expense),
        audit,
    })
}

// =============================================================================
// Close
// =============================================================================

/// Closes an active drawer against a physical count.
///
/// `cash_sales` must be the live total at the moment of closing; the
/// difference is computed from it and then frozen in the record.
///
/// ## Errors
/// - `Validation` if `actual_cash` is negative or notes are too long
/// - `InvalidState` if the day is unopened or already closed
pub fn close_drawer(
    existing: Option<&DrawerRecord>,
    date: NaiveDate,
    actual_cash: Money,
    notes: Option<&str>,
    cash_sales: Money,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<Transition> {
    authorize(actor, Action::Close)?;
    validate_actual_cash(actual_cash)?;
    let notes = validate_notes(notes)?;

    let current = require_active(existing, date, Action::Close)?;
    let (mut record, expected_version) = next_version(current);

    let cash_expenses = current.cash_expenses();
    let expected_cash = current.expected_cash(cash_sales);
    let difference = actual_cash - expected_cash;

    record.status = DrawerStatus::Closed;
    record.actual_cash = Some(actual_cash);
    record.difference = Some(difference);
    record.closed_at = Some(now);
    record.closed_by = Some(actor.id.clone());
    record.notes = notes.clone();

    let snapshot = AuditSnapshot::Close {
        cash_sales,
        cash_expenses,
        expected_cash,
        actual_cash,
        difference,
    };
    let audit = NewAuditEntry::new(date, actor, now, notes, snapshot);

    Ok(Transition {
        record,
        expected_version,
        expense: None,
        audit,
    })
}

// =============================================================================
// Reopen
// =============================================================================

/// Reopens a closed day for corrections. Privileged.
///
/// The previous count stays on the record until the next close replaces it,
/// and is also frozen in the Reopen audit snapshot.
///
/// ## Errors
/// - `Unauthorized` if the actor's role is not privileged
/// - `Validation` if the reason is empty
/// - `InvalidState` if the day is not closed
pub fn reopen_drawer(
    existing: Option<&DrawerRecord>,
    date: NaiveDate,
    reason: &str,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<Transition> {
    authorize(actor, Action::Reopen)?;
    let reason = validate_reopen_reason(reason)?;

    let current = match existing {
        Some(r) if r.status == DrawerStatus::Closed => r,
        other => return Err(invalid_state(date, status_of(other), Action::Reopen)),
    };
    let (mut record, expected_version) = next_version(current);

    record.status = DrawerStatus::Reopened;
    record.reopened_at = Some(now);
    record.reopened_by = Some(actor.id.clone());
    record.reopen_reason = Some(reason.clone());

    let snapshot = AuditSnapshot::Reopen {
        reason: reason.clone(),
        previous_actual_cash: current.actual_cash,
        previous_difference: current.difference,
    };
    let audit = NewAuditEntry::new(date, actor, now, Some(reason), snapshot);

    Ok(Transition {
        record,
        expected_version,
        expense: None,
        audit,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
