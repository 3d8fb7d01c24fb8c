//! Top-level sync orchestration.
//!
//! Resolves the target trading day, pulls the grouped market snapshot,
//! filters it to the caller's universe, persists it idempotently, and keeps
//! the benchmark ETF bar alongside when the provider has one.

use std::sync::Arc;

use time::Date;

use crate::cancel::CancelToken;
use crate::domain::calendar::last_thursday_on_or_before;
use crate::error::SyncError;
use crate::polygon::BarFetcher;
use crate::resolver::DateResolver;
use crate::store::BarStore;
use crate::{Bar, Symbol, Universe};

const DEFAULT_BENCHMARK: &str = "VOO";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Index/ETF ticker kept alongside the equity universe for downstream
    /// comparison. Not part of the universe.
    pub benchmark: Symbol,
    /// Weekday attempts beyond the anchor before a grouped resolve fails.
    pub max_weekday_lookback: u32,
    /// Fraction of the universe already stored for a date above which the
    /// grouped fetch is skipped. Quota optimization, not correctness.
    pub coverage_threshold: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            benchmark: Symbol::parse(DEFAULT_BENCHMARK).expect("default benchmark is valid"),
            max_weekday_lookback: 5,
            coverage_threshold: 0.9,
        }
    }
}

pub struct SyncOrchestrator {
    resolver: DateResolver,
    store: Arc<dyn BarStore>,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(fetcher: Arc<dyn BarFetcher>, store: Arc<dyn BarStore>, config: SyncConfig) -> Self {
        Self {
            resolver: DateResolver::new(fetcher),
            store,
            config,
        }
    }

    /// Sync the anchor implied by `as_of`: the most recent Thursday on or
    /// before it. Returns the resolved trading date actually used.
    pub async fn sync(
        &self,
        as_of: Date,
        universe: &Universe,
        cancel: &CancelToken,
    ) -> Result<Date, SyncError> {
        let anchor = last_thursday_on_or_before(as_of);
        self.sync_from_anchor(anchor, universe, cancel).await
    }

    /// Sync a caller-chosen anchor directly.
    ///
    /// Idempotent: repeated calls neither duplicate rows nor re-issue
    /// upstream calls once coverage is satisfied.
    pub async fn sync_from_anchor(
        &self,
        anchor: Date,
        universe: &Universe,
        cancel: &CancelToken,
    ) -> Result<Date, SyncError> {
        tracing::info!(%anchor, universe = universe.len(), "starting grouped bar sync");

        if self.coverage_satisfied(anchor, universe)? {
            tracing::info!(%anchor, "store already covers anchor date; skipping grouped fetch");
            self.ensure_benchmark(anchor, cancel).await?;
            return Ok(anchor);
        }

        let (resolved, bars) = self
            .resolver
            .resolve_grouped(anchor, self.config.max_weekday_lookback, cancel)
            .await?;

        // The resolver may have landed on an earlier date that a previous
        // run already populated.
        if resolved != anchor && self.coverage_satisfied(resolved, universe)? {
            tracing::info!(%resolved, "store already covers resolved date; skipping write");
        } else {
            let kept = bars
                .into_iter()
                .filter(|bar| universe.contains(&bar.symbol))
                .collect::<Vec<Bar>>();
            let inserted = self.store.upsert_many(&kept)?;
            tracing::info!(
                %resolved,
                kept = kept.len(),
                inserted,
                "persisted universe bars"
            );
        }

        self.ensure_benchmark(resolved, cancel).await?;
        Ok(resolved)
    }

    fn coverage_satisfied(&self, date: Date, universe: &Universe) -> Result<bool, SyncError> {
        if universe.is_empty() {
            return Ok(false);
        }
        let count = self.store.count_for_date(date)?;
        Ok(count as f64 > self.config.coverage_threshold * universe.len() as f64)
    }

    /// A benchmark bar absent within the lookback window is non-fatal; a
    /// failed fetch is not, and aborts the sync like any other fetch error.
    async fn ensure_benchmark(&self, near: Date, cancel: &CancelToken) -> Result<(), SyncError> {
        let benchmark = &self.config.benchmark;
        if self.store.exists(benchmark, near)? {
            return Ok(());
        }

        match self
            .resolver
            .resolve_single(benchmark, near, self.config.max_weekday_lookback, cancel)
            .await?
        {
            Some((date, bar)) => {
                self.store.upsert_many(std::slice::from_ref(&bar))?;
                tracing::info!(%benchmark, %date, close = bar.close, "stored benchmark bar");
            }
            None => {
                tracing::warn!(%benchmark, %near, "no benchmark bar within lookback window");
            }
        }
        Ok(())
    }
}
