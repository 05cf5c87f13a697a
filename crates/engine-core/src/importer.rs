use crate::{
    clock::{Clock, SystemClock},
    error::ImportError,
    reader::SourceReader,
    report::{RowOutcome, RunReport, RunStage},
    watermark::WatermarkStore,
    window::WindowBuilder,
    writer::SinkWriter,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use connectors::{
    document::DocumentStore,
    sql::base::{error::DbError, source::RelationalSource},
};
use engine_processing::{
    tracker::MaxTimestamp,
    transform::{
        Transformer, abtest::AbTestTransform, action::ActionTransform,
        profile::ProfileTransform, user::UserTransform,
    },
};
use futures::StreamExt;
use model::{
    entity::EntityKind, execution::request::ImportRequest, records::record::Record,
};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy)]
pub struct ImporterOptions {
    /// Timezone the source records its naive timestamps in.
    pub timezone: Tz,
    /// Starting point for jobs that have never completed a run.
    pub initial_watermark: Option<DateTime<Utc>>,
}

impl Default for ImporterOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            initial_watermark: None,
        }
    }
}

/// Moves rows created since a job's watermark from the relational source
/// into the document store, then advances the watermark.
///
/// Runs are strictly sequential: one row is transformed and written before the
/// next is pulled, and the watermark is written only after the whole result
/// set was handled. A failure at any point leaves the watermark untouched, so
/// the next run re-reads the same window (at-least-once delivery).
///
/// The watermark is not locked. Callers must not run the same job from two
/// importers at once.
pub struct Importer {
    reader: SourceReader,
    writer: SinkWriter,
    windows: WindowBuilder,
    watermarks: WatermarkStore,
}

impl Importer {
    pub fn new(
        source: Box<dyn RelationalSource>,
        store: Arc<dyn DocumentStore>,
        options: ImporterOptions,
    ) -> Self {
        let watermarks = WatermarkStore::new(store.clone(), options.initial_watermark);
        Self {
            reader: SourceReader::new(source),
            writer: SinkWriter::new(store),
            windows: WindowBuilder::new(watermarks.clone(), Arc::new(SystemClock), options.timezone),
            watermarks,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.windows.set_clock(clock);
        self
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_open()
    }

    pub fn timezone(&self) -> Tz {
        self.windows.timezone()
    }

    pub fn watermarks(&self) -> &WatermarkStore {
        &self.watermarks
    }

    pub async fn import_users(
        &mut self,
        query_name: Option<&str>,
        query: &str,
    ) -> Result<RunReport, ImportError> {
        self.run(&with_query_name(ImportRequest::users(query), query_name))
            .await
    }

    pub async fn import_profiles(
        &mut self,
        query_name: Option<&str>,
        query: &str,
    ) -> Result<RunReport, ImportError> {
        self.run(&with_query_name(ImportRequest::profiles(query), query_name))
            .await
    }

    pub async fn import_actions(
        &mut self,
        action_name: &str,
        query_name: Option<&str>,
        query: &str,
        unique: bool,
    ) -> Result<RunReport, ImportError> {
        let request = ImportRequest::actions(action_name, query).with_unique(unique);
        self.run(&with_query_name(request, query_name)).await
    }

    pub async fn import_abtests(
        &mut self,
        abtest: &str,
        query_name: Option<&str>,
        query: &str,
    ) -> Result<RunReport, ImportError> {
        self.run(&with_query_name(ImportRequest::abtests(abtest, query), query_name))
            .await
    }

    /// Executes one import run for `request`.
    pub async fn run(&mut self, request: &ImportRequest) -> Result<RunReport, ImportError> {
        let job = request.job_name();
        request
            .validate()
            .map_err(|source| ImportError::InvalidRequest {
                job: job.clone(),
                source,
            })?;

        if !self.reader.is_open() {
            info!("Source connection closed; skipping '{}'", job);
            return Ok(RunReport::source_closed(job, request.kind));
        }

        let result = self.execute(&job, request).await;
        if let Err(err) = &result {
            error!("[{}] Import '{}' aborted: {}", err.stage(), job, err);
        }
        result
    }

    /// Releases the source connection; later imports become no-ops.
    pub async fn close(&mut self) -> Result<(), DbError> {
        self.reader.close().await
    }

    async fn execute(&mut self, job: &str, request: &ImportRequest) -> Result<RunReport, ImportError> {
        let timezone = self.windows.timezone();
        let transformer = transformer_for(request, timezone);

        let window = self.windows.build_window(job).await?;
        let formatted = window.format_for_query();
        if window.is_inverted() {
            return Err(ImportError::InvertedWindow {
                job: job.to_string(),
                start: formatted.start,
                end: formatted.end,
            });
        }
        let previous = window.start_utc();
        info!(
            "[{}] Import '{}' ({}) window [{}, {}) {}",
            RunStage::WindowBuilt,
            job,
            request.kind,
            formatted.start,
            formatted.end,
            timezone
        );

        let mut report = RunReport::started(job.to_string(), request.kind, window);
        let mut tracker = MaxTimestamp::new(window.start);

        let mut rows = self
            .reader
            .read(&request.query, &formatted)
            .await
            .map_err(|source| reading_failed(job, source))?;

        let mut index = 0;
        while let Some(row) = rows.next().await {
            let row = row.map_err(|source| reading_failed(job, source))?;
            let outcome = import_row(&self.writer, &transformer, row, request.unique)
                .await
                .map_err(|source| ImportError::Sink {
                    job: job.to_string(),
                    row: index,
                    source,
                })?;

            match &outcome {
                RowOutcome::Written { created_at } => tracker = tracker.observe(*created_at),
                RowOutcome::Skipped(reason) => debug!("Skipping row {} of '{}': {}", index, job, reason),
            }
            report.record(index, outcome);
            index += 1;
        }
        drop(rows);

        let next = tracker.to_utc();
        self.watermarks.advance(job, previous, next).await?;
        report.watermark = Some(next);

        info!(
            "[{}] Import '{}' done: {} read, {} written, {} skipped; watermark {}",
            RunStage::Checkpoint,
            job,
            report.rows_read,
            report.written,
            report.skipped_count(),
            next
        );
        Ok(report)
    }
}

async fn import_row(
    writer: &SinkWriter,
    transformer: &Transformer,
    row: Record,
    unique: bool,
) -> Result<RowOutcome, connectors::document::error::DocumentStoreError> {
    match transformer.apply(row) {
        Ok(record) => {
            writer.write(&record, unique).await?;
            Ok(RowOutcome::Written {
                created_at: record.created_at,
            })
        }
        Err(reason) => Ok(RowOutcome::Skipped(reason)),
    }
}

fn transformer_for(request: &ImportRequest, timezone: Tz) -> Transformer {
    let name = request.name.clone().unwrap_or_default();
    match request.kind {
        EntityKind::User => Transformer::new(timezone, UserTransform),
        EntityKind::Profile => Transformer::new(timezone, ProfileTransform),
        EntityKind::Action => Transformer::new(timezone, ActionTransform::new(name)),
        EntityKind::AbTest => Transformer::new(timezone, AbTestTransform::new(name)),
    }
}

fn with_query_name(request: ImportRequest, query_name: Option<&str>) -> ImportRequest {
    match query_name {
        Some(query_name) => request.with_query_name(query_name),
        None => request,
    }
}

fn reading_failed(job: &str, source: DbError) -> ImportError {
    ImportError::Source {
        job: job.to_string(),
        stage: RunStage::Reading,
        source,
    }
}
