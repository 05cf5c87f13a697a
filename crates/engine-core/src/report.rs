use crate::window::Window;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use engine_processing::transform::error::SkipReason;
use model::entity::EntityKind;
use serde::Serialize;
use std::fmt;

/// Steps of a single run, used to tag aborts in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    WindowBuilt,
    Reading,
    Writing,
    Checkpoint,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::WindowBuilt => "WINDOW_BUILT",
            RunStage::Reading => "READING",
            RunStage::Writing => "WRITING",
            RunStage::Checkpoint => "CHECKPOINT",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every row was handled and the watermark was written.
    Completed,
    /// The source connection was closed; nothing was read or written.
    SourceClosed,
}

/// What happened to one source row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Written { created_at: DateTime<Tz> },
    Skipped(SkipReason),
}

/// Skipped rows kept verbatim in a report; the rest are only counted.
pub const SKIP_SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// Zero-based position of the row in the result set.
    pub index: usize,
    pub reason: SkipReason,
}

/// Skipped rows per reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub missing_field: usize,
    pub invalid_timestamp: usize,
    pub malformed_meta: usize,
}

impl SkipCounts {
    fn add(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::MissingField(_) => self.missing_field += 1,
            SkipReason::InvalidTimestamp(_) => self.invalid_timestamp += 1,
            SkipReason::MalformedMeta(_) => self.malformed_meta += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_field + self.invalid_timestamp + self.malformed_meta
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub job: String,
    pub kind: EntityKind,
    pub outcome: RunOutcome,
    pub window: Option<Window>,
    pub rows_read: usize,
    pub written: usize,
    pub skipped: SkipCounts,
    /// The first skipped rows of the run, at most [`SKIP_SAMPLE_LIMIT`].
    pub skip_samples: Vec<SkippedRow>,
    pub previous_watermark: Option<DateTime<Utc>>,
    pub watermark: Option<DateTime<Utc>>,
}

impl RunReport {
    pub(crate) fn started(job: String, kind: EntityKind, window: Window) -> Self {
        let previous = window.start_utc();
        Self {
            job,
            kind,
            outcome: RunOutcome::Completed,
            window: Some(window),
            rows_read: 0,
            written: 0,
            skipped: SkipCounts::default(),
            skip_samples: Vec::new(),
            previous_watermark: Some(previous),
            watermark: None,
        }
    }

    pub(crate) fn source_closed(job: String, kind: EntityKind) -> Self {
        Self {
            job,
            kind,
            outcome: RunOutcome::SourceClosed,
            window: None,
            rows_read: 0,
            written: 0,
            skipped: SkipCounts::default(),
            skip_samples: Vec::new(),
            previous_watermark: None,
            watermark: None,
        }
    }

    pub(crate) fn record(&mut self, index: usize, outcome: RowOutcome) {
        self.rows_read += 1;
        match outcome {
            RowOutcome::Written { .. } => self.written += 1,
            RowOutcome::Skipped(reason) => {
                self.skipped.add(&reason);
                if self.skip_samples.len() < SKIP_SAMPLE_LIMIT {
                    self.skip_samples.push(SkippedRow { index, reason });
                }
            }
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.total()
    }

    /// Whether the run moved the watermark forward.
    pub fn advanced(&self) -> bool {
        match (self.previous_watermark, self.watermark) {
            (Some(previous), Some(current)) => current > previous,
            _ => false,
        }
    }
}
