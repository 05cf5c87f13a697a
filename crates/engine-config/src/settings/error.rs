use connectors::error::AdapterError;
use model::execution::errors::RequestError;
use thiserror::Error;

/// Errors raised while loading or validating importer configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required setting was not provided by any layer.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// The source timezone is not a known IANA identifier.
    #[error("Invalid source timezone: {0}")]
    InvalidTimezone(String),

    /// The relational source connection string is unusable.
    #[error("Invalid source connection: {0}")]
    InvalidSource(#[from] AdapterError),

    /// The sink connection string is unusable.
    #[error("Invalid sink connection: {0}")]
    InvalidSink(String),

    /// A timestamp setting could not be parsed as RFC 3339.
    #[error("Invalid timestamp for {key}: {value}")]
    InvalidTimestamp { key: String, value: String },

    /// Reading a configuration file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A `.env` file has a malformed line.
    #[error("Invalid env file: {0}")]
    EnvFile(String),

    /// A job file is not valid TOML or does not match the job schema.
    #[error("Invalid job file: {0}")]
    JobFile(#[from] toml::de::Error),

    /// An import entry of a job file is inconsistent.
    #[error("Invalid import #{index}: {source}")]
    InvalidImport {
        index: usize,
        #[source]
        source: RequestError,
    },

    /// Two imports of one job file checkpoint under the same job name.
    #[error("Duplicate job name in job file: {0}")]
    DuplicateJob(String),
}
