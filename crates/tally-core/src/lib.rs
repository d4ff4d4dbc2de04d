//! # tally-core: Pure Drawer Reconciliation Logic
//!
//! This crate holds the rules of the daily cash drawer: what may happen to a
//! business day, who may do it, and what the numbers must add up to. It has
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tally-register (Engine Layer)                  │   │
//! │  │   open / add expense / close / reopen / status / audit / history│   │
//! │  │   sales aggregator, actor directory, clock, config, tracing     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ reconcile │  │   auth    │  │   │
//! │  │   │  Drawer   │  │   Money   │  │Transition │  │   Role    │  │   │
//! │  │   │  Expense  │  │  (cents)  │  │ open/close│  │  policy   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │        SQLite records, expenses, append-only audit log          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (DrawerRecord, Expense, AuditEntry, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`reconcile`] - The drawer state machine as pure transitions
//! - [`auth`] - Roles and the action policy
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use tally_core::auth::Role;
//! use tally_core::reconcile::{close_drawer, open_drawer};
//! use tally_core::{Actor, Money};
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
//! let cashier = Actor::new("cashier-1", Role::Cashier);
//! let morning = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
//! let evening = Utc.with_ymd_and_hms(2024, 1, 10, 21, 0, 0).unwrap();
//!
//! let opened = open_drawer(None, date, Money::from_cents(500_000), &cashier, morning).unwrap();
//! let closed = close_drawer(
//!     Some(&opened.record),
//!     date,
//!     Money::from_cents(695_000),
//!     None,
//!     Money::from_cents(200_000),
//!     &cashier,
//!     evening,
//! )
//! .unwrap();
//!
//! // 5000 + 2000 - 0 expected, 6950 counted
//! assert_eq!(closed.record.difference, Some(Money::from_cents(-5_000)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod error;
pub mod money;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use auth::{Action, Role};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use reconcile::Transition;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a reopen reason, in characters.
pub const MAX_REASON_LENGTH: usize = 500;

/// Maximum length of closing notes, in characters.
pub const MAX_NOTES_LENGTH: usize = 1000;

/// Maximum length of an expense description, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 200;

/// Largest amount accepted for an opening float, expense or count
/// (one billion in major units).
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Default cap on the number of days a single history query may span.
pub const MAX_HISTORY_DAYS: u32 = 366;
