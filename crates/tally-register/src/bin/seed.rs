//! # Reconciliation Seed
//!
//! Replays a full business day into a database for development.
//!
//! ## Usage
//! ```bash
//! # Seed 2024-01-10 into the configured database
//! cargo run -p tally-register --bin seed
//!
//! # Choose database, date and config file
//! cargo run -p tally-register --bin seed -- --db ./tally_dev.db --date 2024-02-01
//! cargo run -p tally-register --bin seed -- --config ./register.toml --opening 7500.00
//! ```
//!
//! ## Scenario
//! open (default 5000.00) → expense 500.00 → cash sales 2000.00 → close
//! 50.00 short → reopen by admin → close balanced

use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;

use tally_core::{ExpenseCategory, Money, NewExpense, Role};
use tally_db::Database;
use tally_register::telemetry::init_tracing;
use tally_register::{
    InMemorySales, ReconciliationEngine, RegisterConfig, StaticActorDirectory, SystemClock,
};

const CASHIER: &str = "seed-cashier";
const ADMIN: &str = "seed-admin";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut date = NaiveDate::from_ymd_opt(2024, 1, 10).ok_or("invalid default date")?;
    let mut opening = Money::from_major_minor(5000, 0);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--date" => {
                if i + 1 < args.len() {
                    date = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--opening" => {
                if i + 1 < args.len() {
                    opening = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Register Seed");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: from config)");
                println!("      --date <DATE>     Business date, YYYY-MM-DD (default: 2024-01-10)");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("      --opening <AMOUNT> Opening float (default: 5000.00)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = RegisterConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.logging);

    println!("🌱 Tally Register Seed");
    println!("======================");
    println!("Database: {}", config.database.path.display());
    println!("Date:     {}", date);
    println!();

    let db = Database::new(config.database.to_db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let actors = StaticActorDirectory::from_config(&config.actors)
        .with_actor(CASHIER, Role::Cashier)
        .with_actor(ADMIN, Role::Admin);
    let sales = InMemorySales::new();
    let engine = ReconciliationEngine::new(db, sales.clone(), actors, SystemClock)
        .with_history_settings(config.history.clone());

    let state = engine.get_status(date).await?;
    if !state.is_unopened() {
        println!("⚠ {} is already {}", date, state.status());
        println!("  Skipping seed to avoid mixing with existing data.");
        return Ok(());
    }

    let rupees = |major: i64| Money::from_major_minor(major, 0);

    engine.open_drawer(date, opening, CASHIER).await?;
    println!("✓ Opened with {}", opening);

    engine
        .add_expense(
            date,
            NewExpense::new(rupees(500), ExpenseCategory::ShopExpense, "Cleaning supplies"),
            CASHIER,
        )
        .await?;
    println!("✓ Recorded expense of {}", rupees(500));

    sales.set_total(date, rupees(2000))?;
    println!("✓ Cash sales total {}", rupees(2000));

    let expected = engine
        .get_status(date)
        .await?
        .view()
        .map(|v| v.expected_cash)
        .ok_or("drawer disappeared after opening")?;
    let short_count = expected - rupees(50);

    let view = engine
        .close_drawer(date, short_count, Some("Short after evening count"), CASHIER)
        .await?;
    println!(
        "✓ Closed: expected {}, counted {}, difference {}",
        view.expected_cash,
        short_count,
        view.record.difference.unwrap_or_default()
    );

    engine.reopen_drawer(date, "Counting mistake", ADMIN).await?;
    println!("✓ Reopened by {}", ADMIN);

    let view = engine.close_drawer(date, expected, None, CASHIER).await?;
    println!(
        "✓ Closed again: difference {}",
        view.record.difference.unwrap_or_default()
    );

    println!();
    println!("Audit log:");
    for entry in engine.get_audit_log(date).await? {
        let snapshot = serde_json::to_string(&entry.snapshot)?;
        println!(
            "  #{} {} {:?} by {} {}",
            entry.sequence,
            entry.recorded_at.format("%H:%M:%S"),
            entry.action,
            entry.actor,
            snapshot
        );
    }

    engine.database().close().await;
    println!();
    println!("✓ Seed complete");

    Ok(())
}
