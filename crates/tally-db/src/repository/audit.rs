//! # Audit Repository
//!
//! The append-only log of drawer state changes.
//!
//! ## Append Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  append_in(tx, entry)                                                   │
//! │     │                                                                   │
//! │     ├── sequence = MAX(sequence) + 1 for the date (inside the tx)       │
//! │     ├── INSERT; PK (date, sequence) rejects a racing duplicate          │
//! │     └── returns the stored AuditEntry                                   │
//! │                                                                         │
//! │  UPDATE / DELETE  ──► rejected by triggers (drawer_audit_log_no_*)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are normally appended by [`DrawerRepository::persist`] in the same
//! transaction as the record change they describe.
//!
//! [`DrawerRepository::persist`]: crate::repository::drawer::DrawerRepository::persist

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{AuditAction, AuditEntry, AuditSnapshot, NewAuditEntry};

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    business_date: NaiveDate,
    sequence: i64,
    action: AuditAction,
    actor: String,
    recorded_at: DateTime<Utc>,
    note: Option<String>,
    snapshot: String,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = DbError;

    fn try_from(row: AuditRow) -> DbResult<Self> {
        let snapshot: AuditSnapshot = serde_json::from_str(&row.snapshot)?;
        if snapshot.action() != row.action {
            return Err(DbError::corrupt(
                "audit entry",
                format!(
                    "{} #{} is {:?} but its snapshot is {:?}",
                    row.business_date,
                    row.sequence,
                    row.action,
                    snapshot.action()
                ),
            ));
        }

        Ok(AuditEntry {
            date: row.business_date,
            sequence: row.sequence,
            action: row.action,
            actor: row.actor,
            recorded_at: row.recorded_at,
            note: row.note,
            snapshot,
        })
    }
}

/// Repository for the drawer audit log.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends an entry in its own transaction.
    ///
    /// The day's drawer record must already exist.
    pub async fn record(&self, entry: &NewAuditEntry) -> DbResult<AuditEntry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let stored = append_in(&mut *tx, entry).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(stored)
    }

    /// Returns every entry for `date` in append order.
    pub async fn query(&self, date: NaiveDate) -> DbResult<Vec<AuditEntry>> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT business_date, sequence, action, actor, recorded_at, note, snapshot
            FROM drawer_audit_log
            WHERE business_date = ?1
            ORDER BY sequence ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEntry::try_from).collect()
    }

    /// Number of entries recorded for `date`.
    pub async fn count(&self, date: NaiveDate) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM drawer_audit_log WHERE business_date = ?1")
                .bind(date)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Appends an entry using an open connection or transaction.
pub(crate) async fn append_in(
    conn: &mut SqliteConnection,
    entry: &NewAuditEntry,
) -> DbResult<AuditEntry> {
    let sequence: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(sequence), 0) + 1 FROM drawer_audit_log WHERE business_date = ?1",
    )
    .bind(entry.date)
    .fetch_one(&mut *conn)
    .await?;

    let snapshot = serde_json::to_string(&entry.snapshot)
        .map_err(|e| DbError::Internal(format!("Failed to encode audit snapshot: {e}")))?;

    debug!(date = %entry.date, sequence, action = ?entry.action, "Appending audit entry");

    sqlx::query(
        r#"
        INSERT INTO drawer_audit_log (
            business_date, sequence, action, actor, recorded_at, note, snapshot
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(entry.date)
    .bind(sequence)
    .bind(entry.action)
    .bind(&entry.actor)
    .bind(entry.recorded_at)
    .bind(&entry.note)
    .bind(snapshot)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => {
            DbError::conflict("audit log", format!("{}#{}", entry.date, sequence))
        }
        other => other,
    })?;

    Ok(AuditEntry::from_new(entry.clone(), sequence))
}

// =============================================================================
// Unit Tests
// =============================================================================
