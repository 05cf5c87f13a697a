use connectors::document::{DocumentStore, error::DocumentStoreError};
use engine_processing::transform::SinkRecord;
use model::{core::value::Value, entity::EntityKind};
use std::sync::Arc;

/// Forwards each transformed record to the matching document store operation.
///
/// One call, one write: no buffering and no retries.
#[derive(Clone)]
pub struct SinkWriter {
    store: Arc<dyn DocumentStore>,
}

impl SinkWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn write(&self, record: &SinkRecord, unique: bool) -> Result<(), DocumentStoreError> {
        match record.kind {
            EntityKind::User => self.store.create_user(&record.payload).await,
            EntityKind::Profile => {
                self.store
                    .update_profile(identity(record)?, &record.payload)
                    .await
            }
            EntityKind::Action => {
                self.store
                    .insert_action(identity(record)?, &record.payload, unique)
                    .await
            }
            EntityKind::AbTest => {
                self.store
                    .tag_abtest(identity(record)?, &record.payload)
                    .await
            }
        }
    }
}

fn identity(record: &SinkRecord) -> Result<&Value, DocumentStoreError> {
    record.identity.as_ref().ok_or_else(|| {
        DocumentStoreError::Rejected(format!("{} record without identity", record.kind))
    })
}
