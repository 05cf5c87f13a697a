use crate::sql::{
    base::{
        error::{ConnectorError, DbError},
        row::DbRow,
        source::{RecordStream, RelationalSource},
    },
    postgres::utils::connect_client,
};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, types::ToSql};
use tracing::{debug, info};

/// A single PostgreSQL connection owned by one importer.
pub struct PgSource {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
}

impl PgSource {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let (client, connection) = connect_client(url).await?;
        info!("Connected to Postgres source");
        Ok(Self {
            client: Some(client),
            connection: Some(connection),
        })
    }
}

#[async_trait]
impl RelationalSource for PgSource {
    fn is_open(&self) -> bool {
        self.client.as_ref().is_some_and(|client| !client.is_closed())
    }

    async fn query<'a>(&'a mut self, sql: &str) -> Result<RecordStream<'a>, DbError> {
        let Some(client) = self.client.as_ref().filter(|client| !client.is_closed()) else {
            return Ok(stream::empty().boxed());
        };

        debug!("Executing Postgres query: {}", sql);
        // query_raw hands back a row stream instead of collecting the result set.
        let rows = client
            .query_raw(sql, std::iter::empty::<&(dyn ToSql + Sync)>())
            .await?;

        Ok(rows
            .map_ok(|row| DbRow::PostgresRow(&row).to_record())
            .map_err(DbError::from)
            .boxed())
    }

    async fn close(&mut self) -> Result<(), DbError> {
        // Dropping the client ends the connection task.
        if self.client.take().is_some() {
            info!("Postgres source connection closed");
        }
        if let Some(connection) = self.connection.take() {
            connection
                .await
                .map_err(|e| DbError::Unknown(format!("connection task failed: {e}")))?;
        }
        Ok(())
    }
}
