//! `DuckDB`-backed daily bar store.
//!
//! One table, `daily_bars`, keyed by `(ticker, date)`. Writes are
//! insert-if-absent so re-syncs are idempotent and the first-seen adjusted
//! values stay frozen; a provider re-publishing slightly different adjusted
//! prices never silently shifts stored history.

pub mod migrations;
pub mod pool;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use duckdb::params;
use thiserror::Error;

pub use pool::{ConnectionPool, PooledConnection};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let home = resolve_momenta_home();
        Self {
            db_path: home.join("data").join("market.duckdb"),
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    #[must_use]
    pub fn at_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

fn resolve_momenta_home() -> PathBuf {
    if let Ok(home) = env::var("MOMENTA_HOME") {
        if !home.trim().is_empty() {
            return PathBuf::from(home);
        }
    }

    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".momenta"))
        .unwrap_or_else(|_| PathBuf::from(".momenta"))
}

/// One stored row. Dates are ISO `YYYY-MM-DD` strings, which compare and
/// sort the same as the calendar dates they encode.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRow {
    pub ticker: String,
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Clone)]
pub struct Warehouse {
    pool: ConnectionPool,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::new(config.db_path, config.max_pool_size);
        let warehouse = Self { pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.pool.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Insert rows whose `(ticker, date)` key is not yet present; existing
    /// rows are left untouched. Returns the number actually inserted.
    pub fn insert_missing(&self, rows: &[BarRow]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "INSERT OR IGNORE INTO daily_bars (ticker, date, open, high, low, close, volume) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )?;

        let mut inserted = 0;
        for row in rows {
            inserted += statement.execute(params![
                row.ticker,
                row.date,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume,
            ])?;
        }
        Ok(inserted)
    }

    pub fn has_bar(&self, ticker: &str, date: &str) -> Result<bool, WarehouseError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection
            .prepare("SELECT 1 FROM daily_bars WHERE ticker = ? AND date = ? LIMIT 1")?;
        let mut rows = statement.query(params![ticker, date])?;
        Ok(rows.next()?.is_some())
    }

    /// Rows stored for one date across all tickers.
    pub fn count_bars_on(&self, date: &str) -> Result<usize, WarehouseError> {
        let connection = self.pool.acquire()?;
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM daily_bars WHERE date = ?",
            params![date],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// Read path for the downstream ranking layer: one ticker's bars over
    /// an inclusive date range, oldest first.
    pub fn bars_in_range(
        &self,
        ticker: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<BarRow>, WarehouseError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT ticker, date, open, high, low, close, volume FROM daily_bars \
             WHERE ticker = ? AND date >= ? AND date <= ? ORDER BY date",
        )?;
        let rows = statement.query_map(params![ticker, start, end], |row| {
            Ok(BarRow {
                ticker: row.get(0)?,
                date: row.get(1)?,
                open: row.get(2)?,
                high: row.get(3)?,
                low: row.get(4)?,
                close: row.get(5)?,
                volume: row.get(6)?,
            })
        })?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row?);
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_warehouse() -> (Warehouse, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let warehouse = Warehouse::open(WarehouseConfig::at_path(dir.path().join("test.duckdb")))
            .expect("warehouse opens");
        (warehouse, dir)
    }

    fn row(ticker: &str, date: &str, close: f64) -> BarRow {
        BarRow {
            ticker: ticker.to_owned(),
            date: date.to_owned(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 42_000,
        }
    }

    #[test]
    fn insert_missing_is_idempotent() {
        let (warehouse, _dir) = temp_warehouse();
        let rows = vec![row("AAA", "2025-06-04", 10.0), row("BBB", "2025-06-04", 20.0)];

        assert_eq!(warehouse.insert_missing(&rows).expect("insert"), 2);
        assert_eq!(warehouse.insert_missing(&rows).expect("re-insert"), 0);
        assert_eq!(warehouse.count_bars_on("2025-06-04").expect("count"), 2);
    }

    #[test]
    fn conflicting_insert_freezes_first_seen_values() {
        let (warehouse, _dir) = temp_warehouse();
        warehouse
            .insert_missing(&[row("AAA", "2025-06-04", 10.0)])
            .expect("insert");

        // A later fetch with shifted adjusted values must not overwrite.
        let inserted = warehouse
            .insert_missing(&[row("AAA", "2025-06-04", 99.0)])
            .expect("insert");
        assert_eq!(inserted, 0);

        let stored = warehouse
            .bars_in_range("AAA", "2025-06-04", "2025-06-04")
            .expect("query");
        assert_eq!(stored.len(), 1);
        assert!((stored[0].close - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn has_bar_checks_exact_key() {
        let (warehouse, _dir) = temp_warehouse();
        warehouse
            .insert_missing(&[row("VOO", "2025-06-05", 510.0)])
            .expect("insert");

        assert!(warehouse.has_bar("VOO", "2025-06-05").expect("query"));
        assert!(!warehouse.has_bar("VOO", "2025-06-04").expect("query"));
        assert!(!warehouse.has_bar("SPY", "2025-06-05").expect("query"));
    }

    #[test]
    fn count_is_scoped_to_one_date() {
        let (warehouse, _dir) = temp_warehouse();
        warehouse
            .insert_missing(&[
                row("AAA", "2025-06-04", 10.0),
                row("BBB", "2025-06-04", 20.0),
                row("AAA", "2025-06-05", 11.0),
            ])
            .expect("insert");

        assert_eq!(warehouse.count_bars_on("2025-06-04").expect("count"), 2);
        assert_eq!(warehouse.count_bars_on("2025-06-05").expect("count"), 1);
        assert_eq!(warehouse.count_bars_on("2025-06-06").expect("count"), 0);
    }

    #[test]
    fn range_query_orders_by_date() {
        let (warehouse, _dir) = temp_warehouse();
        warehouse
            .insert_missing(&[
                row("AAA", "2025-06-05", 11.0),
                row("AAA", "2025-06-03", 9.0),
                row("AAA", "2025-06-04", 10.0),
                row("BBB", "2025-06-04", 20.0),
            ])
            .expect("insert");

        let bars = warehouse
            .bars_in_range("AAA", "2025-06-03", "2025-06-05")
            .expect("query");
        let dates = bars.iter().map(|bar| bar.date.as_str()).collect::<Vec<_>>();
        assert_eq!(dates, vec!["2025-06-03", "2025-06-04", "2025-06-05"]);
    }

    #[test]
    fn reopening_preserves_rows() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("persist.duckdb");
        {
            let warehouse =
                Warehouse::open(WarehouseConfig::at_path(&path)).expect("warehouse opens");
            warehouse
                .insert_missing(&[row("AAA", "2025-06-04", 10.0)])
                .expect("insert");
        }

        let reopened = Warehouse::open(WarehouseConfig::at_path(&path)).expect("reopen");
        assert!(reopened.has_bar("AAA", "2025-06-04").expect("query"));
    }
}
