use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// MongoDB driver error.
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A field value has no document representation.
    #[error("Failed to encode field '{field}': {message}")]
    Encode { field: String, message: String },

    /// The store refused the document.
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// A stored watermark could not be read back.
    #[error("Corrupt watermark for '{0}'")]
    CorruptWatermark(String),

    #[error("Invalid sink configuration: {0}")]
    InvalidConfig(String),
}
