use connectors::{
    document::error::DocumentStoreError, error::AdapterError, sql::base::error::DbError,
};
use engine_config::settings::error::SettingsError;
use engine_core::error::{ImportError, WatermarkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to connect to the source: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Analytics store error: {0}")]
    Store(#[from] DocumentStoreError),

    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Watermark error: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("Source error: {0}")]
    Source(#[from] DbError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid connection format provided: {0}")]
    InvalidConnectionFormat(String),

    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    MySql(#[from] mysql_async::Error),

    /// PostgreSQL driver error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
