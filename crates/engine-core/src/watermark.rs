use crate::error::{ImportError, WatermarkError};
use chrono::{DateTime, Utc};
use connectors::document::DocumentStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Single accessor for persisted job checkpoints.
///
/// Watermarks are stored in UTC and only ever move forward through this type.
/// There is no locking: at most one run per job may be in flight at a time.
#[derive(Clone)]
pub struct WatermarkStore {
    store: Arc<dyn DocumentStore>,
    initial: Option<DateTime<Utc>>,
}

impl WatermarkStore {
    pub fn new(store: Arc<dyn DocumentStore>, initial: Option<DateTime<Utc>>) -> Self {
        Self { store, initial }
    }

    /// The persisted watermark, if the job ever completed a run.
    pub async fn get(&self, job: &str) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        self.store
            .get_last_update(job)
            .await
            .map_err(|source| WatermarkError::Read {
                job: job.to_string(),
                source,
            })
    }

    /// The watermark a run starts from, falling back to the configured initial value.
    pub async fn last_update(&self, job: &str) -> Result<DateTime<Utc>, ImportError> {
        match self.get(job).await? {
            Some(at) => Ok(at),
            None => {
                let initial = self
                    .initial
                    .ok_or_else(|| ImportError::MissingWatermark(job.to_string()))?;
                info!("No watermark for '{}'; starting from {}", job, initial);
                Ok(initial)
            }
        }
    }

    /// Persists `next` after a completed run that started from `prior`.
    pub async fn advance(
        &self,
        job: &str,
        prior: DateTime<Utc>,
        next: DateTime<Utc>,
    ) -> Result<(), WatermarkError> {
        if next < prior {
            return Err(WatermarkError::Regression {
                job: job.to_string(),
                current: prior,
                requested: next,
            });
        }
        self.write(job, next).await?;
        debug!("Watermark for '{}' advanced {} -> {}", job, prior, next);
        Ok(())
    }

    /// Sets a watermark by hand. Moving it backwards requires `force`.
    ///
    /// Returns the value that was replaced.
    pub async fn set(
        &self,
        job: &str,
        at: DateTime<Utc>,
        force: bool,
    ) -> Result<Option<DateTime<Utc>>, WatermarkError> {
        let current = self.get(job).await?;
        if let Some(current) = current {
            if at < current && !force {
                return Err(WatermarkError::Regression {
                    job: job.to_string(),
                    current,
                    requested: at,
                });
            }
        }
        self.write(job, at).await?;
        info!("Watermark for '{}' set to {}", job, at);
        Ok(current)
    }

    async fn write(&self, job: &str, at: DateTime<Utc>) -> Result<(), WatermarkError> {
        self.store
            .set_last_update(job, at)
            .await
            .map_err(|source| WatermarkError::Write {
                job: job.to_string(),
                source,
            })
    }
}
