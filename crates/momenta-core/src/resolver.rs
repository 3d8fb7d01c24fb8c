//! Backtracking date resolution.
//!
//! Reconciles the calendar date a sync targets with the nearest date the
//! provider actually has data for. Weekend days are stepped over for free;
//! only weekdays that come back with zero rows consume lookback budget.

use std::sync::Arc;

use time::Date;

use crate::cancel::CancelToken;
use crate::domain::calendar::{last_weekday_on_or_before, previous_day};
use crate::error::{FetchError, SyncError};
use crate::polygon::BarFetcher;
use crate::{Bar, Symbol};

pub struct DateResolver {
    fetcher: Arc<dyn BarFetcher>,
}

impl DateResolver {
    pub fn new(fetcher: Arc<dyn BarFetcher>) -> Self {
        Self { fetcher }
    }

    /// Find the nearest trading date at or before `anchor` for which the
    /// grouped endpoint returns rows.
    ///
    /// Attempts are strictly sequential: each result decides whether to step
    /// back another weekday. After the anchor attempt, up to
    /// `max_weekday_lookback` further weekdays are tried before the search
    /// fails with `NoDataFound`.
    pub async fn resolve_grouped(
        &self,
        anchor: Date,
        max_weekday_lookback: u32,
        cancel: &CancelToken,
    ) -> Result<(Date, Vec<Bar>), SyncError> {
        let mut candidate = last_weekday_on_or_before(anchor);
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            tracing::debug!(%candidate, "fetching grouped bars");
            let bars = self
                .fetcher
                .fetch_grouped(candidate, cancel)
                .await
                .map_err(fetch_to_sync)?;
            tracing::info!(%candidate, rows = bars.len(), "grouped fetch complete");

            if !bars.is_empty() {
                return Ok((candidate, bars));
            }

            attempts += 1;
            if attempts > max_weekday_lookback {
                return Err(SyncError::NoDataFound { anchor, attempts });
            }
            candidate = last_weekday_on_or_before(previous_day(candidate));
        }
    }

    /// Single-ticker variant with its own independent budget.
    ///
    /// Best effort: an exhausted budget yields `Ok(None)` rather than an
    /// error, because one missing index/ETF bar must not abort the sync.
    pub async fn resolve_single(
        &self,
        symbol: &Symbol,
        anchor: Date,
        max_weekday_lookback: u32,
        cancel: &CancelToken,
    ) -> Result<Option<(Date, Bar)>, SyncError> {
        let mut candidate = last_weekday_on_or_before(anchor);
        let mut attempts = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let bars = self
                .fetcher
                .fetch_range(symbol.clone(), candidate, candidate, cancel)
                .await
                .map_err(fetch_to_sync)?;

            if let Some(bar) = bars.into_iter().next() {
                return Ok(Some((candidate, bar)));
            }

            attempts += 1;
            if attempts > max_weekday_lookback {
                tracing::warn!(
                    %symbol,
                    %anchor,
                    attempts,
                    "no single-ticker bar within lookback window"
                );
                return Ok(None);
            }
            candidate = last_weekday_on_or_before(previous_day(candidate));
        }
    }
}

fn fetch_to_sync(error: FetchError) -> SyncError {
    match error {
        FetchError::Cancelled => SyncError::Cancelled,
        other => SyncError::Fetch(other),
    }
}
