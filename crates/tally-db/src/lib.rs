//! # tally-db: Drawer Storage
//!
//! Everything that touches SQLite lives here. Callers get typed records
//! from `tally-core` back and never see SQL.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-register engine                                                  │
//! │       │ Transition (from tally-core::reconcile)                         │
//! │       ▼                                                                 │
//! │  Database ──► drawers() ──► DrawerRepository::persist                   │
//! │     │                          ├── drawer_records   (version CAS)       │
//! │     │                          ├── drawer_expenses  (insert only)       │
//! │     │                          └── drawer_audit_log (via append_in)     │
//! │     └──────► audit()   ──► AuditRepository::query                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tally.db")).await?;
//! let day = db.drawers().get(date).await?;
//! let trail = db.audit().query(date).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig, DbLocation};

pub use repository::audit::AuditRepository;
pub use repository::drawer::DrawerRepository;
