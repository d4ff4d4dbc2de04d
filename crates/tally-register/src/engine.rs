//! # Reconciliation Engine
//!
//! Runs drawer operations end to end: resolve the actor, read the day,
//! apply the pure transition, persist it atomically.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  close_drawer(date, actual, notes, actor_id)                            │
//! │     │                                                                   │
//! │     ├── 1. directory.role_of(actor_id)      unknown → Unauthorized      │
//! │     ├── 2. db.drawers().get(date)           None → Unopened             │
//! │     ├── 3. sales.cash_sales_total(date)     live, never cached          │
//! │     ├── 4. reconcile::close_drawer(...)     pure rules                  │
//! │     ├── 5. db.drawers().persist(&t)         one transaction, CAS        │
//! │     └── 6. DrawerView (record + totals read in step 3)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call names its business date and actor explicitly; the engine holds
//! no "current day" or "current user" state.
//!
//! Each mutation makes all of its fallible reads before `persist`. Nothing
//! after the commit can fail, so an `Err` always means nothing was stored.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use tally_core::reconcile::{self, Transition};
use tally_core::{
    Actor, AuditEntry, CoreError, DrawerRecord, DrawerState, DrawerView, HistoryOrder, HistoryRow,
    Money, NewExpense,
};
use tally_db::Database;

use crate::collaborators::{ActorDirectory, Clock, SalesAggregator, StaticActorDirectory};
use crate::config::{HistorySettings, RegisterConfig};
use crate::error::{RegisterError, RegisterResult};
use crate::history::HistoryAggregator;

/// The drawer reconciliation service.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine<S, D, C> {
    db: Database,
    sales: S,
    actors: D,
    clock: C,
    history: HistorySettings,
}

impl<S, C> ReconciliationEngine<S, StaticActorDirectory, C>
where
    S: SalesAggregator,
    C: Clock,
{
    /// Opens the configured database and builds the actor table from
    /// the `[[actors]]` entries.
    pub async fn from_config(config: &RegisterConfig, sales: S, clock: C) -> RegisterResult<Self> {
        let db = Database::new(config.database.to_db_config()).await?;
        let actors = StaticActorDirectory::from_config(&config.actors);

        info!(actors = actors.len(), "Reconciliation engine configured");

        Ok(ReconciliationEngine::new(db, sales, actors, clock).with_history_settings(config.history.clone()))
    }
}

impl<S, D, C> ReconciliationEngine<S, D, C>
where
    S: SalesAggregator,
    D: ActorDirectory,
    C: Clock,
{
    pub fn new(db: Database, sales: S, actors: D, clock: C) -> Self {
        ReconciliationEngine {
            db,
            sales,
            actors,
            clock,
            history: HistorySettings::default(),
        }
    }

    /// Replaces the history defaults (ordering, maximum span).
    pub fn with_history_settings(mut self, history: HistorySettings) -> Self {
        self.history = history;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Opens the drawer for `date` with a counted float.
    pub async fn open_drawer(
        &self,
        date: NaiveDate,
        opening_balance: Money,
        actor_id: &str,
    ) -> RegisterResult<DrawerView> {
        let actor = self.resolve_actor(actor_id).await?;
        let existing = self.load(date).await?;
        let cash_sales = self.sales.cash_sales_total(date).await?;

        let transition =
            reconcile::open_drawer(existing.as_ref(), date, opening_balance, &actor, self.clock.now())?;
        self.commit(date, &transition).await?;

        info!(
            date = %date,
            actor = %actor.id,
            opening_balance = %opening_balance,
            "Drawer opened"
        );

        Ok(DrawerView::new(transition.record, cash_sales))
    }

    /// Records a cash outflow against an open or reopened drawer.
    pub async fn add_expense(
        &self,
        date: NaiveDate,
        expense: NewExpense,
        actor_id: &str,
    ) -> RegisterResult<DrawerView> {
        let actor = self.resolve_actor(actor_id).await?;
        let existing = self.load(date).await?;
        let cash_sales = self.sales.cash_sales_total(date).await?;

        let transition =
            reconcile::add_expense(existing.as_ref(), date, expense, &actor, self.clock.now())?;
        self.commit(date, &transition).await?;

        if let Some(expense) = &transition.expense {
            info!(
                date = %date,
                actor = %actor.id,
                sequence = expense.sequence,
                amount = %expense.amount,
                category = %expense.category,
                "Expense recorded"
            );
        }

        Ok(DrawerView::new(transition.record, cash_sales))
    }

    /// Closes the drawer against a physical count.
    ///
    /// The difference is computed from the live cash-sales total at this
    /// moment and then frozen in the record and the audit entry.
    pub async fn close_drawer(
        &self,
        date: NaiveDate,
        actual_cash: Money,
        notes: Option<&str>,
        actor_id: &str,
    ) -> RegisterResult<DrawerView> {
        let actor = self.resolve_actor(actor_id).await?;
        let existing = self.load(date).await?;
        let cash_sales = self.sales.cash_sales_total(date).await?;

        let transition = reconcile::close_drawer(
            existing.as_ref(),
            date,
            actual_cash,
            notes,
            cash_sales,
            &actor,
            self.clock.now(),
        )?;
        self.commit(date, &transition).await?;

        let view = DrawerView::new(transition.record, cash_sales);
        info!(
            date = %date,
            actor = %actor.id,
            expected = %view.expected_cash,
            actual = %actual_cash,
            difference = %view.record.difference.unwrap_or_default(),
            "Drawer closed"
        );

        Ok(view)
    }

    /// Reopens a closed day. Privileged.
    pub async fn reopen_drawer(
        &self,
        date: NaiveDate,
        reason: &str,
        actor_id: &str,
    ) -> RegisterResult<DrawerView> {
        let actor = self.resolve_actor(actor_id).await?;
        let existing = self.load(date).await?;
        let cash_sales = self.sales.cash_sales_total(date).await?;

        let transition = reconcile::reopen_drawer(existing.as_ref(), date, reason, &actor, self.clock.now())
            .inspect_err(|err| {
                if matches!(err, CoreError::Unauthorized { .. }) {
                    warn!(date = %date, actor = %actor.id, role = %actor.role, "Reopen denied");
                }
            })?;
        self.commit(date, &transition).await?;

        info!(
            date = %date,
            actor = %actor.id,
            reason = transition.record.reopen_reason.as_deref().unwrap_or_default(),
            "Drawer reopened"
        );

        Ok(DrawerView::new(transition.record, cash_sales))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state of `date`. A day with no record is `Unopened`, not an error.
    pub async fn get_status(&self, date: NaiveDate) -> RegisterResult<DrawerState> {
        match self.load(date).await? {
            None => Ok(DrawerState::Unopened { date }),
            Some(record) => {
                let cash_sales = self.sales.cash_sales_total(date).await?;
                Ok(DrawerState::Recorded(DrawerView::new(record, cash_sales)))
            }
        }
    }

    /// The day's audit entries, oldest first.
    ///
    /// ## Errors
    /// * `NotFound` - nothing was ever recorded for `date`
    pub async fn get_audit_log(&self, date: NaiveDate) -> RegisterResult<Vec<AuditEntry>> {
        let entries = self
            .db
            .audit()
            .query(date)
            .await
            .map_err(|e| RegisterError::storage(date, e))?;

        if entries.is_empty() {
            return Err(RegisterError::not_found("Drawer audit log", date.to_string()));
        }

        Ok(entries)
    }

    /// One summary row per recorded day in `[start, end]`.
    ///
    /// `order` falls back to the configured default.
    pub async fn get_history(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        order: Option<HistoryOrder>,
    ) -> RegisterResult<Vec<HistoryRow>> {
        HistoryAggregator::new(&self.db, &self.sales, &self.history)
            .get_history(start, end, order)
            .await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn resolve_actor(&self, actor_id: &str) -> RegisterResult<Actor> {
        match self.actors.role_of(actor_id).await? {
            Some(role) => Ok(Actor::new(actor_id, role)),
            None => {
                warn!(actor = %actor_id, "Unknown actor rejected");
                Err(RegisterError::unauthorized(actor_id, "unknown actor"))
            }
        }
    }

    async fn load(&self, date: NaiveDate) -> RegisterResult<Option<DrawerRecord>> {
        self.db
            .drawers()
            .get(date)
            .await
            .map_err(|e| RegisterError::storage(date, e))
    }

    async fn commit(&self, date: NaiveDate, transition: &Transition) -> RegisterResult<AuditEntry> {
        let entry = self
            .db
            .drawers()
            .persist(transition)
            .await
            .map_err(|e| RegisterError::storage(date, e))?;

        debug!(
            date = %date,
            sequence = entry.sequence,
            action = ?entry.action,
            "Audit entry appended"
        );

        Ok(entry)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FixedClock, InMemorySales};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tally_core::{
        AuditAction, DrawerStatus, ExpenseCategory, Role, ValidationError, MAX_AMOUNT_CENTS,
    };
    use tally_db::DbConfig;

    /// Sales source whose upstream can be switched off.
    #[derive(Clone, Default)]
    struct UnreliableSales {
        inner: InMemorySales,
        down: Arc<AtomicBool>,
    }

    impl UnreliableSales {
        fn set_down(&self, down: bool) {
            self.down.store(down, Ordering::SeqCst);
        }
    }

    impl SalesAggregator for UnreliableSales {
        async fn cash_sales_total(&self, date: NaiveDate) -> RegisterResult<Money> {
            if self.down.load(Ordering::SeqCst) {
                return Err(RegisterError::Collaborator("point of sale unreachable".to_string()));
            }
            self.inner.cash_sales_total(date).await
        }
    }

    type TestEngine = ReconciliationEngine<InMemorySales, StaticActorDirectory, FixedClock>;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn rupees(major: i64) -> Money {
        Money::from_major_minor(major, 0)
    }

    async fn setup() -> (TestEngine, InMemorySales, FixedClock) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sales = InMemorySales::new();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap());
        let actors = StaticActorDirectory::new()
            .with_actor("cashier-1", Role::Cashier)
            .with_actor("manager-1", Role::Manager)
            .with_actor("admin-1", Role::Admin);

        let engine = ReconciliationEngine::new(db, sales.clone(), actors, clock.clone());
        (engine, sales, clock)
    }

    #[tokio::test]
    async fn test_status_of_unopened_day() {
        let (engine, _, _) = setup().await;
        let state = engine.get_status(day()).await.unwrap();
        assert_eq!(state, DrawerState::Unopened { date: day() });
    }

    #[tokio::test]
    async fn test_open_then_status() {
        let (engine, sales, clock) = setup().await;

        let view = engine.open_drawer(day(), rupees(5000), "cashier-1").await.unwrap();
        assert_eq!(view.record.status, DrawerStatus::Open);
        assert_eq!(view.record.opened_at, clock.now());
        assert_eq!(view.expected_cash, rupees(5000));

        sales.set_total(day(), rupees(1200)).unwrap();
        let state = engine.get_status(day()).await.unwrap();
        assert_eq!(state.status(), DrawerStatus::Open);
        assert_eq!(state.view().unwrap().expected_cash, rupees(6200));
    }

    #[tokio::test]
    async fn test_unknown_actor_is_unauthorized() {
        let (engine, _, _) = setup().await;
        let err = engine.open_drawer(day(), rupees(5000), "ghost").await.unwrap_err();
        assert!(matches!(err, RegisterError::Unauthorized { ref actor, .. } if actor == "ghost"));
        assert!(engine.get_status(day()).await.unwrap().is_unopened());
    }

    #[tokio::test]
    async fn test_open_twice_is_invalid_state() {
        let (engine, _, _) = setup().await;
        engine.open_drawer(day(), rupees(5000), "cashier-1").await.unwrap();

        let err = engine.open_drawer(day(), rupees(10), "manager-1").await.unwrap_err();
        assert!(matches!(
            err,
            RegisterError::InvalidState {
                status: DrawerStatus::Open,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_expense_on_unopened_day_is_invalid_state() {
        let (engine, _, _) = setup().await;
        let err = engine
            .add_expense(
                day(),
                NewExpense::new(rupees(10), ExpenseCategory::Other, "tea"),
                "cashier-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_close_uses_live_sales_at_close_time() {
        let (engine, sales, clock) = setup().await;
        engine.open_drawer(day(), rupees(5000), "cashier-1").await.unwrap();

        sales.set_total(day(), rupees(2000)).unwrap();
        clock.advance(Duration::hours(12));
        let view = engine.close_drawer(day(), rupees(7000), None, "cashier-1").await.unwrap();
        assert_eq!(view.record.difference, Some(Money::zero()));
        assert_eq!(view.record.closed_at, Some(clock.now()));

        // A late sale moves expected cash but not the frozen difference
        sales.record_sale(day(), rupees(100)).unwrap();
        let state = engine.get_status(day()).await.unwrap();
        let view = state.view().unwrap();
        assert_eq!(view.expected_cash, rupees(7100));
        assert_eq!(view.record.difference, Some(Money::zero()));
    }

    #[tokio::test]
    async fn test_reopen_by_manager_is_denied_without_side_effects() {
        let (engine, _, _) = setup().await;
        engine.open_drawer(day(), rupees(5000), "cashier-1").await.unwrap();
        engine.close_drawer(day(), rupees(5000), None, "cashier-1").await.unwrap();

        let err = engine.reopen_drawer(day(), "recount", "manager-1").await.unwrap_err();
        assert!(matches!(err, RegisterError::Unauthorized { .. }));

        let log = engine.get_audit_log(day()).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(engine.get_status(day()).await.unwrap().status(), DrawerStatus::Closed);
    }

    #[tokio::test]
    async fn test_reopen_with_blank_reason_is_validation() {
        let (engine, _, _) = setup().await;
        engine.open_drawer(day(), rupees(5000), "cashier-1").await.unwrap();
        engine.close_drawer(day(), rupees(5000), None, "cashier-1").await.unwrap();

        let err = engine.reopen_drawer(day(), "   ", "admin-1").await.unwrap_err();
        assert!(matches!(err, RegisterError::Validation(_)));
    }

    #[tokio::test]
    async fn test_audit_log_for_unknown_day_is_not_found() {
        let (engine, _, _) = setup().await;
        let err = engine.get_audit_log(day()).await.unwrap_err();
        assert!(matches!(err, RegisterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_audit_log_reads_are_stable() {
        let (engine, _, clock) = setup().await;
        engine.open_drawer(day(), rupees(5000), "cashier-1").await.unwrap();
        clock.advance(Duration::minutes(5));
        engine
            .add_expense(
                day(),
                NewExpense::new(rupees(50), ExpenseCategory::StaffAdvance, "lunch"),
                "cashier-1",
            )
            .await
            .unwrap();

        let first = engine.get_audit_log(day()).await.unwrap();
        let second = engine.get_audit_log(day()).await.unwrap();
        assert_eq!(first, second);

        let actions: Vec<AuditAction> = first.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Open, AuditAction::ExpenseAdded]);
        assert!(first[0].recorded_at < first[1].recorded_at);
    }

    #[tokio::test]
    async fn test_sales_outage_leaves_nothing_stored() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sales = UnreliableSales::default();
        let actors = StaticActorDirectory::new()
            .with_actor("cashier-1", Role::Cashier)
            .with_actor("admin-1", Role::Admin);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap());
        let engine = ReconciliationEngine::new(db, sales.clone(), actors, clock);

        sales.set_down(true);
        let err = engine.open_drawer(day(), rupees(5000), "cashier-1").await.unwrap_err();
        assert!(matches!(err, RegisterError::Collaborator(_)));
        assert!(err.is_retryable());
        assert!(engine.get_status(day()).await.unwrap().is_unopened());
        assert!(matches!(
            engine.get_audit_log(day()).await,
            Err(RegisterError::NotFound { .. })
        ));

        // Retrying once the source is back must succeed, not hit InvalidState
        sales.set_down(false);
        engine.open_drawer(day(), rupees(5000), "cashier-1").await.unwrap();

        sales.set_down(true);
        let expense = NewExpense::new(rupees(50), ExpenseCategory::Other, "tea");
        let err = engine.add_expense(day(), expense, "cashier-1").await.unwrap_err();
        assert!(err.is_retryable());
        engine.close_drawer(day(), rupees(5000), None, "cashier-1").await.unwrap_err();
        sales.set_down(false);
        engine.close_drawer(day(), rupees(5000), None, "cashier-1").await.unwrap();

        sales.set_down(true);
        engine.reopen_drawer(day(), "recount", "admin-1").await.unwrap_err();
        sales.set_down(false);

        let log = engine.get_audit_log(day()).await.unwrap();
        let actions: Vec<AuditAction> = log.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Open, AuditAction::Close]);
        assert_eq!(engine.get_status(day()).await.unwrap().status(), DrawerStatus::Closed);
    }

    #[tokio::test]
    async fn test_oversized_amounts_are_rejected() {
        let (engine, sales, _) = setup().await;

        let err = engine
            .open_drawer(day(), Money::from_cents(i64::MAX), "cashier-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Validation(ValidationError::OutOfRange { .. })));
        assert!(engine.get_status(day()).await.unwrap().is_unopened());

        let cap = Money::from_cents(MAX_AMOUNT_CENTS);
        engine.open_drawer(day(), cap, "cashier-1").await.unwrap();

        let err = engine
            .add_expense(
                day(),
                NewExpense::new(cap + Money::from_cents(1), ExpenseCategory::Other, "typo"),
                "cashier-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Validation(_)));

        // An unvalidated sales total still cannot overflow the expected cash
        sales.set_total(day(), Money::from_cents(i64::MAX)).unwrap();
        let state = engine.get_status(day()).await.unwrap();
        assert_eq!(state.view().unwrap().expected_cash, Money::from_cents(i64::MAX));

        let err = engine
            .close_drawer(day(), Money::from_cents(i64::MAX), None, "cashier-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Validation(_)));
    }

    #[tokio::test]
    async fn test_engine_from_config() {
        let mut config = RegisterConfig::default();
        config.database.path = ":memory:".into();
        config.actors = vec![crate::config::ActorEntry {
            id: "owner-1".to_string(),
            role: "Owner".to_string(),
        }];

        let engine = ReconciliationEngine::from_config(
            &config,
            InMemorySales::new(),
            FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()),
        )
        .await
        .unwrap();

        engine.open_drawer(day(), rupees(100), "owner-1").await.unwrap();
        engine.close_drawer(day(), rupees(100), None, "owner-1").await.unwrap();
        let view = engine.reopen_drawer(day(), "typo", "owner-1").await.unwrap();
        assert_eq!(view.record.status, DrawerStatus::Reopened);
    }
}
