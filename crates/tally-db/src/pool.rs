//! # Database Pool
//!
//! Opens the drawer database and hands out repositories.
//!
//! ## Access Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reads  (get_status, audit log, history)   many, short, concurrent      │
//! │  Writes (open, expense, close, reopen)     rare, one transaction each   │
//! │                                                                         │
//! │  Database::new(DbConfig)                                                │
//! │     ├── DbLocation::File(path)  WAL, pool of N, busy_timeout on writes  │
//! │     └── DbLocation::Memory      one pinned connection (tests, demos)    │
//! │     │                                                                   │
//! │     ├── migrations::run_migrations                                      │
//! │     └── db.drawers() / db.audit()  (repositories share the pool)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL keeps status reads from blocking behind a close. Two writers on the
//! same file still serialize; the loser waits `busy_timeout` and then
//! surfaces `DbError::Busy`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::audit::AuditRepository;
use crate::repository::drawer::DrawerRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    /// Private to the pool; gone when the pool closes.
    Memory,
}

/// Pool settings for the drawer database.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/tally/tally.db")
///     .max_connections(4)
///     .busy_timeout(Duration::from_millis(500));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: DbLocation,
    pub max_connections: u32,
    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,
    /// How long a writer waits on a locked file before `DbError::Busy`.
    pub busy_timeout: Duration,
    pub idle_timeout: Duration,
    pub migrate: bool,
}

impl DbConfig {
    /// File-backed database at `path`, created on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: DbLocation::File(path.into()),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            migrate: true,
        }
    }

    /// Private in-memory database with a single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            location: DbLocation::Memory,
            max_connections: 1,
            ..DbConfig::new(PathBuf::new())
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Skips embedded migrations on connect.
    pub fn without_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == DbLocation::Memory
    }

    /// File path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            DbLocation::File(path) => Some(path),
            DbLocation::Memory => None,
        }
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.location {
            DbLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            DbLocation::Memory => SqliteConnectOptions::new().in_memory(true),
        };

        options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(1)
            .acquire_timeout(self.acquire_timeout);

        match self.location {
            // The database dies with its last connection, so never recycle it.
            DbLocation::Memory => options.idle_timeout(None).max_lifetime(None),
            DbLocation::File(_) => options.idle_timeout(Some(self.idle_timeout)),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the drawer database. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and, unless disabled, applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        match config.path() {
            Some(path) => info!(path = %path.display(), "Opening drawer database"),
            None => info!("Opening in-memory drawer database"),
        }

        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Drawer database pool ready"
        );

        let db = Database { pool };
        if config.migrate {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Drawer records and their expenses.
    pub fn drawers(&self) -> DrawerRepository {
        DrawerRepository::new(self.pool.clone())
    }

    /// The append-only audit log.
    pub fn audit(&self) -> AuditRepository {
        AuditRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        debug!("Closing drawer database");
        self.pool.close().await;
    }

    /// True if a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
