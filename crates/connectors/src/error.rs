use crate::{document::error::DocumentStoreError, sql::base::error::ConnectorError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// The connection descriptor names a scheme no connector handles.
    #[error("Unsupported connection scheme: {0}")]
    UnsupportedScheme(String),

    /// The connection descriptor could not be parsed.
    #[error("Malformed connection string: {0}")]
    MalformedUrl(String),

    /// Failed to initialize a relational connector.
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Failed to initialize the document store.
    #[error("Document store error: {0}")]
    DocumentStore(#[from] DocumentStoreError),
}
