use thiserror::Error;
use time::Date;

use crate::http_client::HttpError;
use momenta_warehouse::WarehouseError;

/// Validation and contract errors for `momenta-core` domain types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,

    #[error("epoch timestamp {millis}ms is out of range for a calendar date")]
    TimestampOutOfRange { millis: i64 },
}

/// Failure of a single fetch request, after transparent 429 handling.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure; the request never produced a status code.
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// Non-2xx status other than 429. 429 is retried internally and never
    /// surfaces under this variant.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The server kept answering 429 past the retry cap.
    #[error("gave up after {attempts} rate-limited attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("upstream response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,
}

/// Failure of a sync run, surfaced to the calling pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The lookback budget ran out without finding a trading day that has
    /// grouped data. Implies systemic unavailability, so the whole anchor
    /// is aborted rather than partially written.
    #[error("no grouped data within {attempts} weekday attempts at or before {anchor}")]
    NoDataFound { anchor: Date, attempts: u32 },

    #[error("sync cancelled")]
    Cancelled,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] WarehouseError),
}
