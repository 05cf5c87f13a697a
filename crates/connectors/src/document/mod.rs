use crate::document::error::DocumentStoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{core::value::Value, records::record::Record};

pub mod error;
pub mod memory;
pub mod mongo;

/// The analytics store the importer replicates into.
///
/// Every write is a single best-effort call; the store decides whether a
/// malformed document is rejected or dropped. Timestamps are UTC.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Last successfully imported timestamp of a job, if one was ever recorded.
    async fn get_last_update(
        &self,
        query_name: &str,
    ) -> Result<Option<DateTime<Utc>>, DocumentStoreError>;

    async fn set_last_update(
        &self,
        query_name: &str,
        last_update: DateTime<Utc>,
    ) -> Result<(), DocumentStoreError>;

    async fn create_user(&self, record: &Record) -> Result<(), DocumentStoreError>;

    async fn update_profile(
        &self,
        identity: &Value,
        record: &Record,
    ) -> Result<(), DocumentStoreError>;

    async fn insert_action(
        &self,
        identity: &Value,
        record: &Record,
        unique: bool,
    ) -> Result<(), DocumentStoreError>;

    async fn tag_abtest(&self, identity: &Value, record: &Record)
    -> Result<(), DocumentStoreError>;
}
