//! # Collaborators
//!
//! The services the engine consumes but does not own.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ReconciliationEngine<S, D, C>                                          │
//! │     │                                                                   │
//! │     ├── S: SalesAggregator  cash_sales_total(date) → Money  (live)      │
//! │     ├── D: ActorDirectory   role_of(actor_id) → Option<Role>            │
//! │     └── C: Clock            now() → DateTime<Utc>                       │
//! │                                                                         │
//! │  Bundled:  InMemorySales   StaticActorDirectory   SystemClock           │
//! │                                                   FixedClock            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The in-memory implementations are cheap handles: clones share state, so a
//! test can keep one and hand the other to the engine.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use tally_core::{Money, Role};

use crate::config::ActorEntry;
use crate::error::{RegisterError, RegisterResult};

// =============================================================================
// Traits
// =============================================================================

/// Source of the day's cash-tender sales total.
///
/// Queried on every status read and at close; the engine never caches it.
pub trait SalesAggregator: Send + Sync {
    fn cash_sales_total(&self, date: NaiveDate) -> impl Future<Output = RegisterResult<Money>> + Send;
}

/// Resolves an actor id to a role.
///
/// `Ok(None)` means the actor is unknown, which the engine rejects.
pub trait ActorDirectory: Send + Sync {
    fn role_of(&self, actor_id: &str) -> impl Future<Output = RegisterResult<Option<Role>>> + Send;
}

/// Source of audit timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// InMemorySales
// =============================================================================

/// Per-date cash sales totals held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySales {
    totals: Arc<RwLock<HashMap<NaiveDate, Money>>>,
}

impl InMemorySales {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the total for `date`.
    pub fn set_total(&self, date: NaiveDate, total: Money) -> RegisterResult<()> {
        let mut totals = self.totals.write().map_err(|_| poisoned())?;
        totals.insert(date, total);
        Ok(())
    }

    /// Adds one cash sale to the total for `date`.
    pub fn record_sale(&self, date: NaiveDate, amount: Money) -> RegisterResult<()> {
        let mut totals = self.totals.write().map_err(|_| poisoned())?;
        *totals.entry(date).or_default() += amount;
        Ok(())
    }

    fn total(&self, date: NaiveDate) -> RegisterResult<Money> {
        let totals = self.totals.read().map_err(|_| poisoned())?;
        Ok(totals.get(&date).copied().unwrap_or_default())
    }
}

fn poisoned() -> RegisterError {
    RegisterError::Collaborator("sales totals lock poisoned".to_string())
}

impl SalesAggregator for InMemorySales {
    async fn cash_sales_total(&self, date: NaiveDate) -> RegisterResult<Money> {
        self.total(date)
    }
}

// =============================================================================
// StaticActorDirectory
// =============================================================================

/// A fixed actor → role table, usually built from the `[[actors]]` config.
#[derive(Debug, Clone, Default)]
pub struct StaticActorDirectory {
    roles: HashMap<String, Role>,
}

impl StaticActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from configuration, parsing each role name.
    pub fn from_config(actors: &[ActorEntry]) -> Self {
        let roles = actors
            .iter()
            .map(|a| (a.id.clone(), Role::from_name(&a.role)))
            .collect();
        StaticActorDirectory { roles }
    }

    /// Adds or replaces one actor.
    pub fn with_actor(mut self, id: impl Into<String>, role: Role) -> Self {
        self.roles.insert(id.into(), role);
        self
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl ActorDirectory for StaticActorDirectory {
    async fn role_of(&self, actor_id: &str) -> RegisterResult<Option<Role>> {
        Ok(self.roles.get(actor_id).copied())
    }
}

// =============================================================================
// Clocks
// =============================================================================

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Millisecond resolution.
#[derive(Debug, Clone)]
pub struct FixedClock {
    millis: Arc<AtomicI64>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        FixedClock {
            millis: Arc::new(AtomicI64::new(at.timestamp_millis())),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
