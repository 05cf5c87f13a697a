use crate::report::RunStage;
use chrono::{DateTime, Utc};
use connectors::{document::error::DocumentStoreError, sql::base::error::DbError};
use model::execution::errors::RequestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("Failed to read watermark for '{job}': {source}")]
    Read {
        job: String,
        #[source]
        source: DocumentStoreError,
    },

    #[error("Failed to write watermark for '{job}': {source}")]
    Write {
        job: String,
        #[source]
        source: DocumentStoreError,
    },

    #[error("Refusing to move watermark for '{job}' back from {current} to {requested}")]
    Regression {
        job: String,
        current: DateTime<Utc>,
        requested: DateTime<Utc>,
    },
}

/// Failures that abort a run. The watermark is never advanced when one is returned.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    #[error("Job '{0}' has no watermark and no initial watermark is configured")]
    MissingWatermark(String),

    #[error("Window for '{job}' is inverted: start {start} is after end {end}")]
    InvertedWindow {
        job: String,
        start: String,
        end: String,
    },

    #[error("Source failed during {stage} for '{job}': {source}")]
    Source {
        job: String,
        stage: RunStage,
        #[source]
        source: DbError,
    },

    #[error("Sink write for '{job}' failed at row {row}: {source}")]
    Sink {
        job: String,
        row: usize,
        #[source]
        source: DocumentStoreError,
    },

    #[error("Invalid import request '{job}': {source}")]
    InvalidRequest {
        job: String,
        #[source]
        source: RequestError,
    },
}

impl WatermarkError {
    pub fn job(&self) -> &str {
        match self {
            WatermarkError::Read { job, .. }
            | WatermarkError::Write { job, .. }
            | WatermarkError::Regression { job, .. } => job,
        }
    }
}

impl ImportError {
    pub fn job(&self) -> &str {
        match self {
            ImportError::Watermark(err) => err.job(),
            ImportError::MissingWatermark(job)
            | ImportError::InvertedWindow { job, .. }
            | ImportError::Source { job, .. }
            | ImportError::Sink { job, .. }
            | ImportError::InvalidRequest { job, .. } => job,
        }
    }

    /// The run step that was executing when the error occurred.
    pub fn stage(&self) -> RunStage {
        match self {
            ImportError::Watermark(WatermarkError::Read { .. })
            | ImportError::MissingWatermark(_)
            | ImportError::InvertedWindow { .. }
            | ImportError::InvalidRequest { .. } => RunStage::WindowBuilt,
            ImportError::Watermark(_) => RunStage::Checkpoint,
            ImportError::Source { stage, .. } => *stage,
            ImportError::Sink { .. } => RunStage::Writing,
        }
    }
}
