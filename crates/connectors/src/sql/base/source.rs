use crate::sql::base::error::DbError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use model::records::record::Record;

/// Rows of one query, pulled from the server one at a time.
///
/// The stream borrows the connection, so a source can only run one query at a time.
pub type RecordStream<'a> = BoxStream<'a, Result<Record, DbError>>;

/// A relational connection the importer reads windows from.
///
/// Implementations must not buffer the whole result set: rows are decoded as
/// the stream is polled so callers can drain results larger than memory.
#[async_trait]
pub trait RelationalSource: Send {
    /// Whether the connection is usable. A closed source never errors on `query`.
    fn is_open(&self) -> bool;

    /// Executes `sql` and streams its rows in server order.
    async fn query<'a>(&'a mut self, sql: &str) -> Result<RecordStream<'a>, DbError>;

    /// Releases the connection. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), DbError>;
}
