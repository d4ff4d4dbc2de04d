//! # Repository Module
//!
//! Database repository implementations for drawer reconciliation.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ReconciliationEngine (tally-register)                                 │
//! │       │                                                                 │
//! │       │  db.drawers().get(date)                                        │
//! │       │  db.drawers().persist(&transition)                             │
//! │       │  db.audit().query(date)                                        │
//! │       ▼                                                                 │
//! │  DrawerRepository                 AuditRepository                      │
//! │  ├── get(date)                    ├── record(entry)                    │
//! │  ├── list_range(start, end)       ├── query(date)                      │
//! │  └── persist(transition) ───────► └── count(date)                      │
//! │       │        (append_in, same transaction)                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`DrawerRepository`] - Drawer records and expenses
//! - [`AuditRepository`] - Append-only audit log
//!
//! [`DrawerRepository`]: drawer::DrawerRepository
//! [`AuditRepository`]: audit::AuditRepository

pub mod audit;
pub mod drawer;
