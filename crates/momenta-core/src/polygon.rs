//! Polygon.io daily-bar fetcher.
//!
//! Two endpoint shapes are consumed: grouped daily bars for every ticker on
//! one date, and single-ticker daily bars over a range. Each HTTP attempt
//! holds exactly one throttle grant, 429s are retried transparently after
//! the server-requested delay, and an absent or empty `results` list is a
//! normal zero-row outcome, not an error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use time::Date;

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::domain::calendar::date_from_unix_millis;
use crate::error::{FetchError, ValidationError};
use crate::http_client::{ApiKey, HttpClient, HttpRequest, HttpResponse};
use crate::throttling::ThrottleGate;
use crate::{Bar, Symbol};

const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Fallback backoff when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(15);

/// Cap on consecutive 429 responses for one logical request.
const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Daily-bar source consumed by the resolver and orchestrator.
pub trait BarFetcher: Send + Sync {
    /// Bars for every ticker on one trading date. Empty means the provider
    /// has no data for that date.
    fn fetch_grouped<'a>(
        &'a self,
        date: Date,
        cancel: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bar>, FetchError>> + Send + 'a>>;

    /// Daily bars for one ticker between `start` and `end` inclusive.
    fn fetch_range<'a>(
        &'a self,
        symbol: Symbol,
        start: Date,
        end: Date,
        cancel: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bar>, FetchError>> + Send + 'a>>;
}

/// Production [`BarFetcher`] for the Polygon aggregates API.
#[derive(Clone)]
pub struct PolygonFetcher {
    http: Arc<dyn HttpClient>,
    gate: ThrottleGate,
    clock: Arc<dyn Clock>,
    api_key: ApiKey,
    base_url: String,
}

impl PolygonFetcher {
    pub fn new(
        http: Arc<dyn HttpClient>,
        gate: ThrottleGate,
        clock: Arc<dyn Clock>,
        api_key: ApiKey,
    ) -> Self {
        Self {
            http,
            gate,
            clock,
            api_key,
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// One logical request: acquire a throttle grant per attempt, retry on
    /// 429 after the indicated delay, up to the retry cap. A bounded loop,
    /// so runaway 429 streams terminate with `RateLimitExhausted`.
    async fn get_with_backoff(
        &self,
        url: &str,
        cancel: &CancelToken,
    ) -> Result<HttpResponse, FetchError> {
        let mut rate_limited = 0u32;
        loop {
            self.gate.acquire(cancel).await?;

            let request = HttpRequest::get(url).with_api_key(&self.api_key);
            let response = self.http.execute(request).await?;

            if response.status != 429 {
                return Ok(response);
            }

            rate_limited += 1;
            if rate_limited > MAX_RATE_LIMIT_RETRIES {
                return Err(FetchError::RateLimitExhausted {
                    attempts: rate_limited,
                });
            }

            let delay = response.retry_after().unwrap_or(DEFAULT_RETRY_AFTER);
            tracing::warn!(
                attempt = rate_limited,
                delay_secs = delay.as_secs(),
                "upstream rate limited; backing off"
            );
            self.clock.sleep(delay).await;
        }
    }

    async fn fetch_and_parse(
        &self,
        url: String,
        fallback_symbol: Option<Symbol>,
        cancel: &CancelToken,
    ) -> Result<Vec<Bar>, FetchError> {
        let response = self.get_with_backoff(&url, cancel).await?;

        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status,
                body: response.body,
            });
        }

        let envelope: AggEnvelope = serde_json::from_str(&response.body)?;
        let rows = envelope.results.unwrap_or_default();

        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            match bar_from_row(row, fallback_symbol.as_ref()) {
                Ok(bar) => bars.push(bar),
                Err(error) => {
                    tracing::warn!(%error, "skipping malformed provider row");
                }
            }
        }
        Ok(bars)
    }
}

impl BarFetcher for PolygonFetcher {
    fn fetch_grouped<'a>(
        &'a self,
        date: Date,
        cancel: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bar>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/v2/aggs/grouped/locale/us/market/stocks/{date}?adjusted=true",
                self.base_url
            );
            self.fetch_and_parse(url, None, cancel).await
        })
    }

    fn fetch_range<'a>(
        &'a self,
        symbol: Symbol,
        start: Date,
        end: Date,
        cancel: &'a CancelToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bar>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/v2/aggs/ticker/{}/range/1/day/{start}/{end}?adjusted=true",
                self.base_url,
                urlencoding::encode(symbol.as_str())
            );
            self.fetch_and_parse(url, Some(symbol), cancel).await
        })
    }
}

/// Aggregates response envelope. `results` is omitted entirely when the
/// provider has nothing for the requested date or range.
#[derive(Debug, Deserialize)]
struct AggEnvelope {
    #[serde(default)]
    results: Option<Vec<RawAggRow>>,
}

/// Raw aggregate row. Grouped responses carry the ticker in `T`; range
/// responses omit it because the ticker is in the request path.
#[derive(Debug, Deserialize)]
struct RawAggRow {
    #[serde(rename = "T", default)]
    ticker: Option<String>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
    t: i64,
}

fn bar_from_row(row: RawAggRow, fallback_symbol: Option<&Symbol>) -> Result<Bar, ValidationError> {
    let symbol = match row.ticker {
        Some(raw) => Symbol::parse(&raw)?,
        None => fallback_symbol
            .cloned()
            .ok_or(ValidationError::EmptySymbol)?,
    };
    let date = date_from_unix_millis(row.t)?;

    // The wire type for volume is a JSON number that may print as a float.
    if !row.v.is_finite() || row.v < 0.0 {
        return Err(ValidationError::NegativeValue { field: "volume" });
    }
    let volume = row.v as u64;

    Bar::new(symbol, date, row.o, row.h, row.l, row.c, volume)
}
