//! # History Aggregator
//!
//! Read-only summaries over a range of business days.
//!
//! ```text
//! get_history(2024-01-01, 2024-01-31, None)
//!    │
//!    ├── validate range (start ≤ end, span ≤ max_days)
//!    ├── drawers().list_range(start, end)     only days with a record
//!    ├── per day: live cash sales → DrawerView → HistoryRow
//!    └── sort by date (configured default: newest first)
//! ```

use chrono::NaiveDate;
use tracing::debug;

use tally_core::validation::validate_date_range;
use tally_core::{DrawerView, HistoryOrder, HistoryRow};
use tally_db::Database;

use crate::collaborators::SalesAggregator;
use crate::config::HistorySettings;
use crate::error::{RegisterError, RegisterResult};

/// Builds history rows from stored records and live sales totals.
pub struct HistoryAggregator<'a, S> {
    db: &'a Database,
    sales: &'a S,
    settings: &'a HistorySettings,
}

impl<'a, S: SalesAggregator> HistoryAggregator<'a, S> {
    pub fn new(db: &'a Database, sales: &'a S, settings: &'a HistorySettings) -> Self {
        HistoryAggregator {
            db,
            sales,
            settings,
        }
    }

    /// One row per recorded date in `[start, end]`. Dates without a record
    /// are skipped, not zero-filled.
    ///
    /// ## Errors
    /// * `Validation` - `start > end`, or the span exceeds `max_days`
    pub async fn get_history(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        order: Option<HistoryOrder>,
    ) -> RegisterResult<Vec<HistoryRow>> {
        validate_date_range(start, end, self.settings.max_days)?;

        let records = self
            .db
            .drawers()
            .list_range(start, end)
            .await
            .map_err(RegisterError::from)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let cash_sales = self.sales.cash_sales_total(record.date).await?;
            rows.push(HistoryRow::from(&DrawerView::new(record, cash_sales)));
        }

        // list_range returns oldest first
        if order.unwrap_or(self.settings.default_order) == HistoryOrder::Descending {
            rows.reverse();
        }

        debug!(%start, %end, rows = rows.len(), "History assembled");
        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
