use crate::window::FormattedWindow;
use connectors::sql::base::{
    error::DbError,
    source::{RecordStream, RelationalSource},
};
use futures::{StreamExt, stream};
use tracing::{debug, warn};

pub const START_TOKEN: &str = "{start}";
pub const END_TOKEN: &str = "{end}";

/// Runs windowed query templates against the relational source.
///
/// Rows are pulled one at a time from the driver, so result sets larger than
/// memory can be processed.
pub struct SourceReader {
    source: Box<dyn RelationalSource>,
}

impl SourceReader {
    pub fn new(source: Box<dyn RelationalSource>) -> Self {
        Self { source }
    }

    pub fn is_open(&self) -> bool {
        self.source.is_open()
    }

    /// Streams the rows of `template` for `window`. A closed source yields nothing.
    pub async fn read(
        &mut self,
        template: &str,
        window: &FormattedWindow,
    ) -> Result<RecordStream<'_>, DbError> {
        if !self.source.is_open() {
            return Ok(stream::empty().boxed());
        }
        let sql = render_query(template, window);
        debug!("Executing source query: {}", sql);
        self.source.query(&sql).await
    }

    /// Releases the connection. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<(), DbError> {
        if !self.source.is_open() {
            return Ok(());
        }
        self.source.close().await
    }
}

/// Replaces every `{start}` and `{end}` token; other braces are left alone.
pub fn render_query(template: &str, window: &FormattedWindow) -> String {
    for token in [START_TOKEN, END_TOKEN] {
        if !template.contains(token) {
            warn!("Query template has no {} token; the window will not bound it", token);
        }
    }
    template
        .replace(START_TOKEN, &window.start)
        .replace(END_TOKEN, &window.end)
}
