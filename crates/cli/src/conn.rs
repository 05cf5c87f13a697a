use crate::error::CliError;
use async_trait::async_trait;
use connectors::{
    adapter::{SourceKind, redact_url},
    sql::{base::error::ConnectorError, postgres::utils::connect_client},
};
use mysql_async::prelude::*;
use tracing::{error, info};

/// Trait for "pinging" a relational source
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

pub fn pinger_for(kind: SourceKind, conn_str: String) -> Box<dyn ConnectionPinger + Send + Sync> {
    match kind {
        SourceKind::MySql => Box::new(MySqlConnectionPinger { conn_str }),
        SourceKind::Postgres => Box::new(PostgresConnectionPinger { conn_str }),
    }
}

/// MySQL/MariaDB pinger
pub struct MySqlConnectionPinger {
    pub conn_str: String,
}

/// Postgres pinger
pub struct PostgresConnectionPinger {
    pub conn_str: String,
}

#[async_trait]
impl ConnectionPinger for MySqlConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        let target = redact_url(&self.conn_str);
        info!("Pinging MySQL at '{}'", target);

        let opts = mysql_async::Opts::from_url(&self.conn_str).map_err(|e| {
            error!("MySQL connection string parse failed: {}", e);
            CliError::MySql(mysql_async::Error::Url(e))
        })?;
        let pool = mysql_async::Pool::new(opts);
        let mut conn = pool.get_conn().await.map_err(|e| {
            error!("MySQL connection to '{}' failed: {}", target, e);
            CliError::MySql(e)
        })?;

        let val: i32 = conn
            .query_first("SELECT 1")
            .await
            .map_err(|e| {
                error!("MySQL ping query on '{}' failed: {}", target, e);
                CliError::MySql(e)
            })?
            .ok_or_else(|| {
                let msg = format!("MySQL ping to '{target}' returned no result");
                error!("{}", msg);
                CliError::Unexpected(msg)
            })?;

        if val != 1 {
            let msg = format!("MySQL ping to '{target}' returned unexpected result: {val}");
            error!("{}", msg);
            return Err(CliError::Unexpected(msg));
        }

        info!("MySQL ping to '{}' succeeded", target);
        drop(conn);
        pool.disconnect().await.ok();
        Ok(())
    }
}

#[async_trait]
impl ConnectionPinger for PostgresConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        let target = redact_url(&self.conn_str);
        info!("Pinging Postgres at '{}'", target);

        let (client, connection) = connect_client(&self.conn_str).await.map_err(|e| {
            error!("Postgres connection to '{}' failed: {}", target, e);
            match e {
                ConnectorError::Postgres(e) => CliError::Postgres(e),
                other => CliError::Unexpected(other.to_string()),
            }
        })?;

        let row = client.query_one("SELECT 1", &[]).await.map_err(|e| {
            error!("Postgres ping query on '{}' failed: {}", target, e);
            CliError::Postgres(e)
        })?;

        let val: i32 = row.try_get(0)?;
        if val != 1 {
            let msg = format!("Postgres ping to '{target}' returned unexpected result: {val}");
            error!("{}", msg);
            return Err(CliError::Unexpected(msg));
        }

        info!("Postgres ping to '{}' succeeded", target);
        drop(client);
        connection.await.ok();
        Ok(())
    }
}
