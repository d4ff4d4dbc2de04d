//! # tally-register: Daily Drawer Reconciliation
//!
//! The service a POS terminal talks to at the start and end of a business day.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Register screen / seed binary                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               tally-register (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │  ReconciliationEngine ──► HistoryAggregator                     │   │
//! │  │       │                                                         │   │
//! │  │       ├── collaborators: SalesAggregator, ActorDirectory, Clock │   │
//! │  │       ├── config: RegisterConfig (TOML + env)                   │   │
//! │  │       └── error: RegisterError + ErrorCode                      │   │
//! │  └───────┬──────────────────────────────────┬──────────────────────┘   │
//! │          ▼                                  ▼                           │
//! │    tally-core (rules)                 tally-db (SQLite)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use tally_register::{ReconciliationEngine, RegisterConfig, InMemorySales, SystemClock};
//!
//! let config = RegisterConfig::load(None)?;
//! tally_register::telemetry::init_tracing(&config.logging);
//!
//! let engine = ReconciliationEngine::from_config(&config, InMemorySales::new(), SystemClock).await?;
//! engine.open_drawer(date, Money::from_cents(500_000), "ali").await?;
//! ```

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod telemetry;

pub use collaborators::{
    ActorDirectory, Clock, FixedClock, InMemorySales, SalesAggregator, StaticActorDirectory,
    SystemClock,
};
pub use config::{ActorEntry, RegisterConfig};
pub use engine::ReconciliationEngine;
pub use error::{ErrorCode, ErrorResponse, RegisterError, RegisterResult};
pub use history::HistoryAggregator;
