//! End-to-end reconciliation of one business day against an in-memory database.

use chrono::{Duration, NaiveDate, TimeZone, Utc};

use tally_core::reconcile;
use tally_core::{
    Actor, AuditAction, AuditSnapshot, DrawerStatus, ExpenseCategory, HistoryOrder, Money,
    NewExpense, Role,
};
use tally_db::{Database, DbConfig};
use tally_register::{
    Clock, ErrorCode, FixedClock, InMemorySales, ReconciliationEngine, RegisterError,
    StaticActorDirectory,
};

type Engine = ReconciliationEngine<InMemorySales, StaticActorDirectory, FixedClock>;

fn jan(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn rupees(major: i64) -> Money {
    Money::from_major_minor(major, 0)
}

async fn engine() -> (Engine, InMemorySales, FixedClock) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let sales = InMemorySales::new();
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 10, 8, 30, 0).unwrap());
    let actors = StaticActorDirectory::new()
        .with_actor("cashier-1", Role::Cashier)
        .with_actor("manager-1", Role::Manager)
        .with_actor("admin-1", Role::Admin);

    let engine = ReconciliationEngine::new(db, sales.clone(), actors, clock.clone());
    (engine, sales, clock)
}

#[tokio::test]
async fn test_full_day_with_reopen_and_recount() {
    let (engine, sales, clock) = engine().await;
    let day = jan(10);

    assert!(engine.get_status(day).await.unwrap().is_unopened());

    let view = engine.open_drawer(day, rupees(5000), "cashier-1").await.unwrap();
    assert_eq!(view.record.status, DrawerStatus::Open);
    assert_eq!(view.record.opening_balance, rupees(5000));

    clock.advance(Duration::hours(3));
    let view = engine
        .add_expense(
            day,
            NewExpense::new(rupees(500), ExpenseCategory::ShopExpense, "Cleaning supplies"),
            "cashier-1",
        )
        .await
        .unwrap();
    assert_eq!(view.cash_expenses, rupees(500));

    sales.set_total(day, rupees(2000)).unwrap();
    let state = engine.get_status(day).await.unwrap();
    assert_eq!(state.view().unwrap().expected_cash, rupees(6500));

    clock.advance(Duration::hours(9));
    let view = engine
        .close_drawer(day, rupees(6450), Some("Short after evening count"), "cashier-1")
        .await
        .unwrap();
    assert_eq!(view.record.status, DrawerStatus::Closed);
    assert_eq!(view.record.difference, Some(rupees(-50)));

    // Cashiers and managers cannot undo a close
    let err = engine
        .reopen_drawer(day, "Counting mistake", "manager-1")
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);

    clock.advance(Duration::minutes(20));
    let view = engine
        .reopen_drawer(day, "Counting mistake", "admin-1")
        .await
        .unwrap();
    assert_eq!(view.record.status, DrawerStatus::Reopened);
    assert_eq!(view.record.reopened_by.as_deref(), Some("admin-1"));
    assert_eq!(view.record.difference, Some(rupees(-50)));

    clock.advance(Duration::minutes(10));
    let view = engine.close_drawer(day, rupees(6500), None, "cashier-1").await.unwrap();
    assert_eq!(view.record.status, DrawerStatus::Closed);
    assert_eq!(view.record.difference, Some(Money::zero()));
    assert_eq!(view.record.closed_at, Some(clock.now()));

    let log = engine.get_audit_log(day).await.unwrap();
    let actions: Vec<AuditAction> = log.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Open,
            AuditAction::ExpenseAdded,
            AuditAction::Close,
            AuditAction::Reopen,
            AuditAction::Close,
        ]
    );
    let sequences: Vec<i64> = log.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);

    match &log[2].snapshot {
        AuditSnapshot::Close {
            expected_cash,
            actual_cash,
            difference,
            ..
        } => {
            assert_eq!(*expected_cash, rupees(6500));
            assert_eq!(*actual_cash, rupees(6450));
            assert_eq!(*difference, rupees(-50));
        }
        other => panic!("expected a close snapshot, got {other:?}"),
    }
    match &log[3].snapshot {
        AuditSnapshot::Reopen {
            reason,
            previous_difference,
            ..
        } => {
            assert_eq!(reason, "Counting mistake");
            assert_eq!(*previous_difference, Some(rupees(-50)));
        }
        other => panic!("expected a reopen snapshot, got {other:?}"),
    }
    assert_eq!(log[3].actor, "admin-1");
    match &log[4].snapshot {
        AuditSnapshot::Close { difference, .. } => assert_eq!(*difference, Money::zero()),
        other => panic!("expected a close snapshot, got {other:?}"),
    }

    assert_eq!(engine.get_audit_log(day).await.unwrap(), log);
}

#[tokio::test]
async fn test_expense_on_reopened_day_counts_toward_recount() {
    let (engine, sales, clock) = engine().await;
    let day = jan(15);

    engine.open_drawer(day, rupees(5000), "cashier-1").await.unwrap();
    engine
        .add_expense(
            day,
            NewExpense::new(rupees(500), ExpenseCategory::ShopExpense, "Cleaning supplies"),
            "cashier-1",
        )
        .await
        .unwrap();
    sales.set_total(day, rupees(2000)).unwrap();
    engine.close_drawer(day, rupees(6500), None, "cashier-1").await.unwrap();

    clock.advance(Duration::minutes(15));
    engine.reopen_drawer(day, "Forgot the electricity bill", "admin-1").await.unwrap();

    clock.advance(Duration::minutes(5));
    let view = engine
        .add_expense(
            day,
            NewExpense::new(rupees(300), ExpenseCategory::UtilityBill, "Electricity"),
            "cashier-1",
        )
        .await
        .unwrap();
    assert_eq!(view.record.status, DrawerStatus::Reopened);
    assert_eq!(view.cash_expenses, rupees(800));
    assert_eq!(view.expected_cash, rupees(6200));

    let view = engine.close_drawer(day, rupees(6200), None, "cashier-1").await.unwrap();
    assert_eq!(view.record.difference, Some(Money::zero()));

    let log = engine.get_audit_log(day).await.unwrap();
    let actions: Vec<AuditAction> = log.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Open,
            AuditAction::ExpenseAdded,
            AuditAction::Close,
            AuditAction::Reopen,
            AuditAction::ExpenseAdded,
            AuditAction::Close,
        ]
    );
    match &log[4].snapshot {
        AuditSnapshot::ExpenseAdded {
            expense_sequence,
            amount,
            cash_expenses,
            ..
        } => {
            assert_eq!(*expense_sequence, 2);
            assert_eq!(*amount, rupees(300));
            assert_eq!(*cash_expenses, rupees(800));
        }
        other => panic!("expected an expense snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_closed_day_rejects_further_changes() {
    let (engine, _, _) = engine().await;
    let day = jan(11);
    engine.open_drawer(day, rupees(1000), "cashier-1").await.unwrap();
    engine.close_drawer(day, rupees(1000), None, "cashier-1").await.unwrap();

    let err = engine.open_drawer(day, rupees(1000), "admin-1").await.unwrap_err();
    assert!(matches!(err, RegisterError::InvalidState { .. }));

    let err = engine
        .add_expense(
            day,
            NewExpense::new(rupees(10), ExpenseCategory::Other, "late"),
            "cashier-1",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegisterError::InvalidState { .. }));

    let err = engine.close_drawer(day, rupees(900), None, "cashier-1").await.unwrap_err();
    assert!(matches!(err, RegisterError::InvalidState { .. }));
    assert!(!err.is_retryable());

    assert_eq!(engine.get_audit_log(day).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_negative_count_is_rejected_without_side_effects() {
    let (engine, _, _) = engine().await;
    let day = jan(12);
    engine.open_drawer(day, rupees(1000), "cashier-1").await.unwrap();

    let err = engine.close_drawer(day, Money::from_cents(-1), None, "cashier-1").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let err = engine.open_drawer(jan(13), Money::from_cents(-1), "cashier-1").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert!(engine.get_status(jan(13)).await.unwrap().is_unopened());

    assert_eq!(engine.get_status(day).await.unwrap().status(), DrawerStatus::Open);
    assert_eq!(engine.get_audit_log(day).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_stale_write_is_a_retryable_conflict() {
    let (engine, _, clock) = engine().await;
    let day = jan(14);
    engine.open_drawer(day, rupees(1000), "cashier-1").await.unwrap();

    let snapshot = engine.database().drawers().get(day).await.unwrap().unwrap();
    let actor = Actor::new("cashier-1", Role::Cashier);

    let first = reconcile::add_expense(
        Some(&snapshot),
        day,
        NewExpense::new(rupees(20), ExpenseCategory::Other, "milk"),
        &actor,
        clock.now(),
    )
    .unwrap();
    let second = reconcile::add_expense(
        Some(&snapshot),
        day,
        NewExpense::new(rupees(30), ExpenseCategory::Other, "sugar"),
        &actor,
        clock.now(),
    )
    .unwrap();

    engine.database().drawers().persist(&first).await.unwrap();
    let err: RegisterError = engine
        .database()
        .drawers()
        .persist(&second)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.code(), ErrorCode::ConcurrentModification);
    assert!(err.is_retryable());

    // The losing write left nothing behind
    let log = engine.get_audit_log(day).await.unwrap();
    assert_eq!(log.len(), 2);
    let state = engine.get_status(day).await.unwrap();
    assert_eq!(state.view().unwrap().cash_expenses, rupees(20));

    // A retry after re-reading succeeds
    let view = engine
        .add_expense(
            day,
            NewExpense::new(rupees(30), ExpenseCategory::Other, "sugar"),
            "cashier-1",
        )
        .await
        .unwrap();
    assert_eq!(view.cash_expenses, rupees(50));
}

#[tokio::test]
async fn test_history_over_several_days() {
    let (engine, sales, _) = engine().await;

    engine.open_drawer(jan(8), rupees(1000), "cashier-1").await.unwrap();
    sales.set_total(jan(8), rupees(400)).unwrap();
    engine.close_drawer(jan(8), rupees(1400), None, "cashier-1").await.unwrap();

    engine.open_drawer(jan(10), rupees(2000), "cashier-1").await.unwrap();

    let rows = engine.get_history(jan(1), jan(31), None).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, jan(10));
    assert_eq!(rows[0].status, DrawerStatus::Open);
    assert_eq!(rows[1].difference, Some(Money::zero()));

    let rows = engine
        .get_history(jan(1), jan(31), Some(HistoryOrder::Ascending))
        .await
        .unwrap();
    assert_eq!(rows[0].date, jan(8));

    let err = engine.get_history(jan(31), jan(1), None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}
