use crate::document::{DocumentStore, error::DocumentStoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{core::value::Value, records::record::Record};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

/// A write the in-memory store received, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    CreateUser {
        record: Record,
    },
    UpdateProfile {
        identity: Value,
        record: Record,
    },
    InsertAction {
        identity: Value,
        record: Record,
        unique: bool,
    },
    TagAbTest {
        identity: Value,
        record: Record,
    },
}

#[derive(Default)]
struct MemoryState {
    calls: Vec<SinkCall>,
    watermarks: HashMap<String, DateTime<Utc>>,
    watermark_writes: usize,
    fail_write_at: Option<usize>,
    fail_set_last_update: bool,
    fail_get_last_update: bool,
}

/// Document store kept in process memory.
///
/// Clones share state, so a test can hand one clone to the importer and
/// inspect another. Failures can be injected to exercise abort paths.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_watermark(self, query_name: &str, at: DateTime<Utc>) -> Self {
        self.state
            .lock()
            .await
            .watermarks
            .insert(query_name.to_string(), at);
        self
    }

    /// Makes the write with this zero-based index fail (and every later one).
    pub async fn fail_write_at(&self, index: usize) {
        self.state.lock().await.fail_write_at = Some(index);
    }

    pub async fn fail_set_last_update(&self) {
        self.state.lock().await.fail_set_last_update = true;
    }

    pub async fn fail_get_last_update(&self) {
        self.state.lock().await.fail_get_last_update = true;
    }

    pub async fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn watermark(&self, query_name: &str) -> Option<DateTime<Utc>> {
        self.state.lock().await.watermarks.get(query_name).copied()
    }

    /// How many times `set_last_update` succeeded.
    pub async fn watermark_writes(&self) -> usize {
        self.state.lock().await.watermark_writes
    }

    async fn record(&self, call: SinkCall) -> Result<(), DocumentStoreError> {
        let mut state = self.state.lock().await;
        if state
            .fail_write_at
            .is_some_and(|index| state.calls.len() >= index)
        {
            return Err(DocumentStoreError::Rejected(format!(
                "injected failure at write {}",
                state.calls.len()
            )));
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_last_update(
        &self,
        query_name: &str,
    ) -> Result<Option<DateTime<Utc>>, DocumentStoreError> {
        let state = self.state.lock().await;
        if state.fail_get_last_update {
            return Err(DocumentStoreError::Rejected(
                "injected watermark read failure".to_string(),
            ));
        }
        Ok(state.watermarks.get(query_name).copied())
    }

    async fn set_last_update(
        &self,
        query_name: &str,
        last_update: DateTime<Utc>,
    ) -> Result<(), DocumentStoreError> {
        let mut state = self.state.lock().await;
        if state.fail_set_last_update {
            return Err(DocumentStoreError::Rejected(
                "injected watermark write failure".to_string(),
            ));
        }
        state
            .watermarks
            .insert(query_name.to_string(), last_update);
        state.watermark_writes += 1;
        Ok(())
    }

    async fn create_user(&self, record: &Record) -> Result<(), DocumentStoreError> {
        self.record(SinkCall::CreateUser {
            record: record.clone(),
        })
        .await
    }

    async fn update_profile(
        &self,
        identity: &Value,
        record: &Record,
    ) -> Result<(), DocumentStoreError> {
        self.record(SinkCall::UpdateProfile {
            identity: identity.clone(),
            record: record.clone(),
        })
        .await
    }

    async fn insert_action(
        &self,
        identity: &Value,
        record: &Record,
        unique: bool,
    ) -> Result<(), DocumentStoreError> {
        self.record(SinkCall::InsertAction {
            identity: identity.clone(),
            record: record.clone(),
            unique,
        })
        .await
    }

    async fn tag_abtest(
        &self,
        identity: &Value,
        record: &Record,
    ) -> Result<(), DocumentStoreError> {
        self.record(SinkCall::TagAbTest {
            identity: identity.clone(),
            record: record.clone(),
        })
        .await
    }
}
