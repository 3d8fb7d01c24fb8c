use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] momenta_core::ValidationError),

    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("universe file {path}: line {line}: {source}")]
    UniverseEntry {
        path: String,
        line: usize,
        source: momenta_core::ValidationError,
    },

    #[error("MOMENTA_POLYGON_API_KEY is not set")]
    MissingApiKey,

    #[error(transparent)]
    Sync(#[from] momenta_core::SyncError),

    #[error(transparent)]
    Warehouse(#[from] momenta_core::WarehouseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_)
            | Self::InvalidDate { .. }
            | Self::UniverseEntry { .. }
            | Self::MissingApiKey => 2,
            Self::Sync(_) => 3,
            Self::Warehouse(_) | Self::Io(_) => 10,
        }
    }
}
