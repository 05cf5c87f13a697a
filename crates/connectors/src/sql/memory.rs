use crate::sql::base::{
    error::DbError,
    source::{RecordStream, RelationalSource},
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use model::records::record::Record;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared view of the statements a [`MemorySource`] executed.
#[derive(Clone, Default)]
pub struct QueryLog(Arc<Mutex<Vec<String>>>);

impl QueryLog {
    pub async fn entries(&self) -> Vec<String> {
        self.0.lock().await.clone()
    }

    async fn push(&self, sql: &str) {
        self.0.lock().await.push(sql.to_string());
    }
}

/// In-memory relational source: every query returns the same fixed rows.
///
/// Used for dry runs and tests; `fail_after` makes the stream error after a
/// number of rows to simulate a connection dropping mid-read.
pub struct MemorySource {
    rows: Vec<Record>,
    open: bool,
    fail_after: Option<usize>,
    log: QueryLog,
}

impl MemorySource {
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            open: true,
            fail_after: None,
            log: QueryLog::default(),
        }
    }

    /// A source that reports itself closed from the start.
    pub fn closed() -> Self {
        Self {
            open: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn fail_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    pub fn query_log(&self) -> QueryLog {
        self.log.clone()
    }
}

#[async_trait]
impl RelationalSource for MemorySource {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn query<'a>(&'a mut self, sql: &str) -> Result<RecordStream<'a>, DbError> {
        if !self.open {
            return Ok(stream::empty().boxed());
        }
        self.log.push(sql).await;

        let limit = self.fail_after;
        let rows = self
            .rows
            .iter()
            .cloned()
            .enumerate()
            .map(move |(idx, row)| match limit {
                Some(limit) if idx >= limit => Err(DbError::Unknown(format!(
                    "connection lost after {limit} rows"
                ))),
                _ => Ok(row),
            });

        Ok(stream::iter(rows).boxed())
    }

    async fn close(&mut self) -> Result<(), DbError> {
        self.open = false;
        Ok(())
    }
}
