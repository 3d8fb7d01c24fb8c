//! Store seam the orchestrator writes through.
//!
//! The warehouse crate speaks string-keyed rows; this module maps domain
//! bars onto them and exposes the narrow interface the sync path needs, so
//! tests can swap in an in-memory store.

use time::Date;

use momenta_warehouse::{BarRow, Warehouse, WarehouseError};

use crate::{Bar, Symbol};

/// Durable, idempotent bar persistence keyed by `(symbol, date)`.
pub trait BarStore: Send + Sync {
    /// Insert-if-absent. Rows whose key already exists are left untouched;
    /// returns the number of rows actually inserted.
    fn upsert_many(&self, bars: &[Bar]) -> Result<usize, WarehouseError>;

    fn exists(&self, symbol: &Symbol, date: Date) -> Result<bool, WarehouseError>;

    /// Rows stored for `date` across all tickers; drives the coverage
    /// short-circuit.
    fn count_for_date(&self, date: Date) -> Result<usize, WarehouseError>;
}

impl BarStore for Warehouse {
    fn upsert_many(&self, bars: &[Bar]) -> Result<usize, WarehouseError> {
        let rows = bars.iter().map(bar_to_row).collect::<Vec<_>>();
        self.insert_missing(&rows)
    }

    fn exists(&self, symbol: &Symbol, date: Date) -> Result<bool, WarehouseError> {
        self.has_bar(symbol.as_str(), &date.to_string())
    }

    fn count_for_date(&self, date: Date) -> Result<usize, WarehouseError> {
        self.count_bars_on(&date.to_string())
    }
}

fn bar_to_row(bar: &Bar) -> BarRow {
    BarRow {
        ticker: bar.symbol.as_str().to_owned(),
        date: bar.date.to_string(),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        volume: bar.volume as i64,
    }
}
