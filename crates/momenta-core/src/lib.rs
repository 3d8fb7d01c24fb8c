//! Core sync engine for momenta.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The process-wide throttle gate for the upstream provider
//! - The Polygon daily-bar fetcher with transparent 429 backoff
//! - Backtracking date resolution and the sync orchestrator

pub mod cancel;
pub mod clock;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod polygon;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod throttling;

pub use cancel::CancelToken;
pub use clock::{Clock, SystemClock};
pub use domain::calendar;
pub use domain::{Bar, Symbol, Universe};
pub use error::{FetchError, SyncError, ValidationError};
pub use http_client::{
    ApiKey, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use momenta_warehouse::{BarRow, Warehouse, WarehouseConfig, WarehouseError};
pub use polygon::{BarFetcher, PolygonFetcher};
pub use resolver::DateResolver;
pub use store::BarStore;
pub use sync::{SyncConfig, SyncOrchestrator};
pub use throttling::ThrottleGate;
