use crate::sql::base::{
    error::{ConnectorError, DbError},
    row::DbRow,
    source::{RecordStream, RelationalSource},
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use mysql_async::{Conn, Opts, prelude::Queryable};
use std::borrow::Cow;
use tracing::{debug, info};

const MARIADB_SCHEME: &str = "mariadb://";

/// A single MySQL connection owned by one importer.
pub struct MySqlSource {
    conn: Option<Conn>,
}

impl MySqlSource {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(&driver_url(url))
            .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;
        let conn = Conn::new(opts).await?;
        info!("Connected to MySQL source");
        Ok(Self { conn: Some(conn) })
    }
}

/// The driver only understands `mysql://`; MariaDB URLs speak the same protocol.
fn driver_url(url: &str) -> Cow<'_, str> {
    match url.get(..MARIADB_SCHEME.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(MARIADB_SCHEME) => {
            Cow::Owned(format!("mysql://{}", &url[MARIADB_SCHEME.len()..]))
        }
        _ => Cow::Borrowed(url),
    }
}

#[async_trait]
impl RelationalSource for MySqlSource {
    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    async fn query<'a>(&'a mut self, sql: &str) -> Result<RecordStream<'a>, DbError> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(stream::empty().boxed());
        };

        debug!("Executing MySQL query: {}", sql);
        // Text protocol result: rows are read off the socket as the stream is polled.
        let result = conn.query_iter(sql.to_string()).await?;

        let rows = stream::try_unfold(result, |mut result| async move {
            match result.next().await? {
                Some(row) => {
                    let record = DbRow::MySqlRow(&row).to_record();
                    Ok::<_, DbError>(Some((record, result)))
                }
                None => Ok(None),
            }
        });

        Ok(rows.boxed())
    }

    async fn close(&mut self) -> Result<(), DbError> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
            info!("MySQL source connection closed");
        }
        Ok(())
    }
}
