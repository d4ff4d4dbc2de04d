//! # Domain Types
//!
//! Core domain types for daily drawer reconciliation.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DrawerRecord   │   │    Expense      │   │   AuditEntry    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  date (key)     │◄──│  date + seq     │   │  date + seq     │       │
//! │  │  status         │   │  amount         │   │  action         │       │
//! │  │  opening        │   │  category       │   │  actor          │       │
//! │  │  actual / diff  │   │  recorded_by    │   │  snapshot       │       │
//! │  │  version        │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DrawerStatus   │   │ExpenseCategory  │   │  AuditAction    │       │
//! │  │  Unopened*      │   │  ShopExpense    │   │  Open           │       │
//! │  │  Open           │   │  StaffAdvance   │   │  ExpenseAdded   │       │
//! │  │  Closed         │   │  UtilityBill    │   │  Close          │       │
//! │  │  Reopened       │   │  SupplierPayment│   │  Reopen         │       │
//! │  └─────────────────┘   │  Other          │   └─────────────────┘       │
//! │   * never persisted    └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived vs Snapshot Values
//! `expected_cash` is never stored: it is `opening + live cash sales - expenses`
//! and is computed by [`DrawerView`] on every read. `actual_cash` and
//! `difference` are what the cashier counted at close and are stored as-is.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::auth::Role;
use crate::money::Money;

// =============================================================================
// Drawer Status
// =============================================================================

/// Lifecycle status of a business day's drawer.
///
/// ```text
///   Unopened ──open──► Open ──close──► Closed ──reopen──► Reopened
///                       │  ▲                                 │
///                   expense│                             close│ expense
///                       └──┘               Closed ◄──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DrawerStatus {
    /// No record exists for the date yet.
    #[default]
    Unopened,
    /// Opened for the day; expenses may be recorded.
    Open,
    /// Counted and closed.
    Closed,
    /// Closed once, then reopened for corrections.
    Reopened,
}

impl DrawerStatus {
    /// Returns true while expenses may be recorded and the drawer may be closed.
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, DrawerStatus::Open | DrawerStatus::Reopened)
    }

    /// Lowercase name, matching the stored value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DrawerStatus::Unopened => "unopened",
            DrawerStatus::Open => "open",
            DrawerStatus::Closed => "closed",
            DrawerStatus::Reopened => "reopened",
        }
    }
}

impl fmt::Display for DrawerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Expense
// =============================================================================

/// What a cash outflow from the drawer was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    ShopExpense,
    StaffAdvance,
    UtilityBill,
    SupplierPayment,
    Other,
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpenseCategory::ShopExpense => "shop_expense",
            ExpenseCategory::StaffAdvance => "staff_advance",
            ExpenseCategory::UtilityBill => "utility_bill",
            ExpenseCategory::SupplierPayment => "supplier_payment",
            ExpenseCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// Caller input for recording an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewExpense {
    pub amount: Money,
    pub category: ExpenseCategory,
    pub description: String,
}

impl NewExpense {
    pub fn new(amount: Money, category: ExpenseCategory, description: impl Into<String>) -> Self {
        NewExpense {
            amount,
            category,
            description: description.into(),
        }
    }
}

/// A cash outflow recorded against a business day. Never edited once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// 1-based position within the day.
    pub sequence: i64,
    pub amount: Money,
    pub category: ExpenseCategory,
    pub description: String,
    pub recorded_by: String,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Drawer Record
// =============================================================================

/// The persisted drawer for one business day.
///
/// ## Invariants
/// - one record per `date`; `status` is never `Unopened`
/// - `opening_balance` never changes after open
/// - `actual_cash` / `difference` are set by the most recent close and stay
///   visible through a reopen until the next close replaces them
/// - `version` increases by one with every persisted mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrawerRecord {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub status: DrawerStatus,
    pub opening_balance: Money,
    pub opened_by: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    pub expenses: Vec<Expense>,
    pub actual_cash: Option<Money>,
    pub difference: Option<Money>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub reopened_at: Option<DateTime<Utc>>,
    pub reopened_by: Option<String>,
    pub reopen_reason: Option<String>,
    pub version: i64,
}

impl DrawerRecord {
    /// Running total of the day's expenses.
    pub fn cash_expenses(&self) -> Money {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    /// `opening_balance + cash_sales - cash_expenses`.
    ///
    /// `cash_sales` must be the live total for the day; it is never cached here.
    pub fn expected_cash(&self, cash_sales: Money) -> Money {
        self.opening_balance + cash_sales - self.cash_expenses()
    }

    /// The counted cash and discrepancy from the latest close, if any.
    pub fn last_reconciliation(&self) -> Option<(Money, Money)> {
        self.actual_cash.zip(self.difference)
    }
}

/// A drawer record together with the values derived from live cash sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrawerView {
    pub record: DrawerRecord,
    pub cash_sales: Money,
    pub cash_expenses: Money,
    pub expected_cash: Money,
}

impl DrawerView {
    pub fn new(record: DrawerRecord, cash_sales: Money) -> Self {
        let cash_expenses = record.cash_expenses();
        let expected_cash = record.expected_cash(cash_sales);
        DrawerView {
            record,
            cash_sales,
            cash_expenses,
            expected_cash,
        }
    }
}

/// Result of a status lookup. A missing record is a state, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DrawerState {
    Unopened { date: NaiveDate },
    Recorded(DrawerView),
}

impl DrawerState {
    pub fn status(&self) -> DrawerStatus {
        match self {
            DrawerState::Unopened { .. } => DrawerStatus::Unopened,
            DrawerState::Recorded(view) => view.record.status,
        }
    }

    pub fn is_unopened(&self) -> bool {
        matches!(self, DrawerState::Unopened { .. })
    }

    pub fn view(&self) -> Option<&DrawerView> {
        match self {
            DrawerState::Unopened { .. } => None,
            DrawerState::Recorded(view) => Some(view),
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The person performing an operation, with a role already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Actor {
            id: id.into(),
            role,
        }
    }
}

// =============================================================================
// Audit Trail
// =============================================================================

/// The kind of state change an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Open,
    ExpenseAdded,
    Close,
    Reopen,
}

/// Fields captured at the moment of an action.
///
/// ## Snapshot Pattern
/// Like a sale item freezing the product price, each entry freezes the
/// numbers the actor saw. Later changes to the record never alter them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditSnapshot {
    Open {
        opening_balance: Money,
    },
    ExpenseAdded {
        expense_sequence: i64,
        amount: Money,
        category: ExpenseCategory,
        description: String,
        cash_expenses: Money,
    },
    Close {
        cash_sales: Money,
        cash_expenses: Money,
        expected_cash: Money,
        actual_cash: Money,
        difference: Money,
    },
    Reopen {
        reason: String,
        previous_actual_cash: Option<Money>,
        previous_difference: Option<Money>,
    },
}

impl AuditSnapshot {
    pub const fn action(&self) -> AuditAction {
        match self {
            AuditSnapshot::Open { .. } => AuditAction::Open,
            AuditSnapshot::ExpenseAdded { .. } => AuditAction::ExpenseAdded,
            AuditSnapshot::Close { .. } => AuditAction::Close,
            AuditSnapshot::Reopen { .. } => AuditAction::Reopen,
        }
    }
}

/// An audit entry waiting to be appended; the log assigns its sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub date: NaiveDate,
    pub action: AuditAction,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
    pub note: Option<String>,
    pub snapshot: AuditSnapshot,
}

impl NewAuditEntry {
    /// Builds an entry whose action is taken from the snapshot kind.
    pub fn new(
        date: NaiveDate,
        actor: &Actor,
        recorded_at: DateTime<Utc>,
        note: Option<String>,
        snapshot: AuditSnapshot,
    ) -> Self {
        NewAuditEntry {
            date,
            action: snapshot.action(),
            actor: actor.id.clone(),
            recorded_at,
            note,
            snapshot,
        }
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuditEntry {
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// 1-based append position within the day.
    pub sequence: i64,
    pub action: AuditAction,
    pub actor: String,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
    pub note: Option<String>,
    pub snapshot: AuditSnapshot,
}

impl AuditEntry {
    /// Pairs a pending entry with the sequence the log gave it.
    pub fn from_new(entry: NewAuditEntry, sequence: i64) -> Self {
        AuditEntry {
            date: entry.date,
            sequence,
            action: entry.action,
            actor: entry.actor,
            recorded_at: entry.recorded_at,
            note: entry.note,
            snapshot: entry.snapshot,
        }
    }
}

// =============================================================================
// History
// =============================================================================

/// Sort direction for history rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    Ascending,
    /// Newest day first, as the history screen shows it.
    #[default]
    Descending,
}

/// One summary row per recorded business day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryRow {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub status: DrawerStatus,
    pub opening_balance: Money,
    pub cash_sales: Money,
    pub cash_expenses: Money,
    pub expected_cash: Money,
    pub actual_cash: Option<Money>,
    pub difference: Option<Money>,
    pub expense_count: usize,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub reopened_at: Option<DateTime<Utc>>,
    pub reopened_by: Option<String>,
    pub reopen_reason: Option<String>,
}

impl From<&DrawerView> for HistoryRow {
    fn from(view: &DrawerView) -> Self {
        let record = &view.record;
        HistoryRow {
            date: record.date,
            status: record.status,
            opening_balance: record.opening_balance,
            cash_sales: view.cash_sales,
            cash_expenses: view.cash_expenses,
            expected_cash: view.expected_cash,
            actual_cash: record.actual_cash,
            difference: record.difference,
            expense_count: record.expenses.len(),
            closed_at: record.closed_at,
            notes: record.notes.clone(),
            reopened_at: record.reopened_at,
            reopened_by: record.reopened_by.clone(),
            reopen_reason: record.reopen_reason.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
