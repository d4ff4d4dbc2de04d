//! # Drawer Repository
//!
//! Storage for per-day drawer records and their expenses.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  persist(&Transition)                    ONE SQLite transaction         │
//! │                                                                         │
//! │  expected_version = None                                               │
//! │     └── INSERT drawer_records            PK clash → Conflict           │
//! │  expected_version = Some(v)                                            │
//! │     └── UPDATE ... WHERE date=? AND version=v                          │
//! │                            0 rows       → Conflict                     │
//! │  expense = Some(e)                                                     │
//! │     └── INSERT drawer_expenses           PK clash → Conflict           │
//! │  audit                                                                 │
//! │     └── audit::append_in                                               │
//! │                                                                         │
//! │  COMMIT  (any error above rolls everything back)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::audit::append_in;
use tally_core::{AuditEntry, DrawerRecord, DrawerStatus, Expense, ExpenseCategory, Money, Transition};

const RECORD_COLUMNS: &str = r#"
    business_date, status, opening_balance_cents, opened_by, opened_at,
    actual_cash_cents, difference_cents, closed_at, closed_by, notes,
    reopened_at, reopened_by, reopen_reason, version
"#;

#[derive(Debug, sqlx::FromRow)]
struct DrawerRow {
    business_date: NaiveDate,
    status: DrawerStatus,
    opening_balance_cents: i64,
    opened_by: String,
    opened_at: DateTime<Utc>,
    actual_cash_cents: Option<i64>,
    difference_cents: Option<i64>,
    closed_at: Option<DateTime<Utc>>,
    closed_by: Option<String>,
    notes: Option<String>,
    reopened_at: Option<DateTime<Utc>>,
    reopened_by: Option<String>,
    reopen_reason: Option<String>,
    version: i64,
}

impl DrawerRow {
    fn into_record(self, expenses: Vec<Expense>) -> DrawerRecord {
        DrawerRecord {
            date: self.business_date,
            status: self.status,
            opening_balance: Money::from_cents(self.opening_balance_cents),
            opened_by: self.opened_by,
            opened_at: self.opened_at,
            expenses,
            actual_cash: self.actual_cash_cents.map(Money::from_cents),
            difference: self.difference_cents.map(Money::from_cents),
            closed_at: self.closed_at,
            closed_by: self.closed_by,
            notes: self.notes,
            reopened_at: self.reopened_at,
            reopened_by: self.reopened_by,
            reopen_reason: self.reopen_reason,
            version: self.version,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    business_date: NaiveDate,
    sequence: i64,
    amount_cents: i64,
    category: ExpenseCategory,
    description: String,
    recorded_by: String,
    recorded_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            date: row.business_date,
            sequence: row.sequence,
            amount: Money::from_cents(row.amount_cents),
            category: row.category,
            description: row.description,
            recorded_by: row.recorded_by,
            recorded_at: row.recorded_at,
        }
    }
}

/// Repository for drawer records.
#[derive(Debug, Clone)]
pub struct DrawerRepository {
    pool: SqlitePool,
}

impl DrawerRepository {
    /// Creates a new DrawerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DrawerRepository { pool }
    }

    /// Loads the record for `date`, with its expenses in sequence order.
    ///
    /// ## Returns
    /// * `Ok(None)` - the day was never opened
    pub async fn get(&self, date: NaiveDate) -> DbResult<Option<DrawerRecord>> {
        let row: Option<DrawerRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM drawer_records WHERE business_date = ?1"
        ))
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expenses: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT business_date, sequence, amount_cents, category, description,
                   recorded_by, recorded_at
            FROM drawer_expenses
            WHERE business_date = ?1
            ORDER BY sequence ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        let expenses = expenses.into_iter().map(Expense::from).collect();
        Ok(Some(row.into_record(expenses)))
    }

    /// Loads every record with `start <= date <= end`, oldest first.
    pub async fn list_range(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<DrawerRecord>> {
        let rows: Vec<DrawerRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM drawer_records
             WHERE business_date BETWEEN ?1 AND ?2
             ORDER BY business_date ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let expense_rows: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT business_date, sequence, amount_cents, category, description,
                   recorded_by, recorded_at
            FROM drawer_expenses
            WHERE business_date BETWEEN ?1 AND ?2
            ORDER BY business_date ASC, sequence ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut by_date: HashMap<NaiveDate, Vec<Expense>> = HashMap::new();
        for row in expense_rows {
            by_date.entry(row.business_date).or_default().push(row.into());
        }

        debug!(%start, %end, count = rows.len(), "Loaded drawer records");

        Ok(rows
            .into_iter()
            .map(|row| {
                let expenses = by_date.remove(&row.business_date).unwrap_or_default();
                row.into_record(expenses)
            })
            .collect())
    }

    /// Writes a transition atomically and returns the stored audit entry.
    ///
    /// ## Errors
    /// * `DbError::Conflict` - another writer changed the day first; nothing
    ///   was written and the caller may retry from a fresh read
    pub async fn persist(&self, transition: &Transition) -> DbResult<AuditEntry> {
        let record = &transition.record;
        let key = record.date.to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        match transition.expected_version {
            None => insert_record(&mut *tx, record).await?,
            Some(expected) => update_record(&mut *tx, record, expected).await?,
        }

        if let Some(expense) = &transition.expense {
            insert_expense(&mut *tx, expense).await?;
        }

        let entry = append_in(&mut *tx, &transition.audit).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            date = %key,
            status = %record.status,
            version = record.version,
            audit_sequence = entry.sequence,
            "Drawer transition persisted"
        );

        Ok(entry)
    }
}

/// Maps a primary-key clash to `Conflict` for the given key.
fn conflict_on_duplicate<'a>(
    entity: &'static str,
    key: &'a str,
) -> impl FnOnce(sqlx::Error) -> DbError + 'a {
    move |err| match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::conflict(entity, key),
        other => other,
    }
}

async fn insert_record(conn: &mut SqliteConnection, record: &DrawerRecord) -> DbResult<()> {
    let key = record.date.to_string();

    sqlx::query(
        r#"
        INSERT INTO drawer_records (
            business_date, status, opening_balance_cents, opened_by, opened_at,
            actual_cash_cents, difference_cents, closed_at, closed_by, notes,
            reopened_at, reopened_by, reopen_reason, version
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(record.date)
    .bind(record.status)
    .bind(record.opening_balance.cents())
    .bind(&record.opened_by)
    .bind(record.opened_at)
    .bind(record.actual_cash.map(|m| m.cents()))
    .bind(record.difference.map(|m| m.cents()))
    .bind(record.closed_at)
    .bind(&record.closed_by)
    .bind(&record.notes)
    .bind(record.reopened_at)
    .bind(&record.reopened_by)
    .bind(&record.reopen_reason)
    .bind(record.version)
    .execute(&mut *conn)
    .await
    .map_err(conflict_on_duplicate("drawer", &key))?;

    Ok(())
}

async fn update_record(
    conn: &mut SqliteConnection,
    record: &DrawerRecord,
    expected_version: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE drawer_records SET
            status = ?2,
            actual_cash_cents = ?3,
            difference_cents = ?4,
            closed_at = ?5,
            closed_by = ?6,
            notes = ?7,
            reopened_at = ?8,
            reopened_by = ?9,
            reopen_reason = ?10,
            version = ?11
        WHERE business_date = ?1 AND version = ?12
        "#,
    )
    .bind(record.date)
    .bind(record.status)
    .bind(record.actual_cash.map(|m| m.cents()))
    .bind(record.difference.map(|m| m.cents()))
    .bind(record.closed_at)
    .bind(&record.closed_by)
    .bind(&record.notes)
    .bind(record.reopened_at)
    .bind(&record.reopened_by)
    .bind(&record.reopen_reason)
    .bind(record.version)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(
            date = %record.date,
            expected_version,
            "Drawer version changed under us"
        );
        return Err(DbError::conflict("drawer", record.date.to_string()));
    }

    Ok(())
}

async fn insert_expense(conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
    let key = format!("{}#{}", expense.date, expense.sequence);

    sqlx::query(
        r#"
        INSERT INTO drawer_expenses (
            business_date, sequence, amount_cents, category, description,
            recorded_by, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(expense.date)
    .bind(expense.sequence)
    .bind(expense.amount.cents())
    .bind(expense.category)
    .bind(&expense.description)
    .bind(&expense.recorded_by)
    .bind(expense.recorded_at)
    .execute(&mut *conn)
    .await
    .map_err(conflict_on_duplicate("expense", &key))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
