use crate::{clock::Clock, error::ImportError, watermark::WatermarkStore};
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;
use engine_processing::timestamp;
use serde::Serialize;
use std::sync::Arc;

/// Half-open interval `[start, end)` in the source timezone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Window {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Window boundaries rendered as source timestamp text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedWindow {
    pub start: String,
    pub end: String,
}

impl Window {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    /// The window from `last_update` up to the last full hour before `now`.
    pub fn between(last_update: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            start: last_update.with_timezone(&tz),
            end: truncate_to_hour(now, tz),
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn format_for_query(&self) -> FormattedWindow {
        FormattedWindow {
            start: timestamp::format_source(&self.start),
            end: timestamp::format_source(&self.end),
        }
    }
}

/// `now` in `tz` with the local minutes, seconds and fractions removed.
pub fn truncate_to_hour(now: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    let local = now.with_timezone(&tz);
    let past_hour = TimeDelta::seconds(i64::from(local.minute() * 60 + local.second()))
        + TimeDelta::nanoseconds(i64::from(local.nanosecond()));
    local - past_hour
}

pub struct WindowBuilder {
    watermarks: WatermarkStore,
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl WindowBuilder {
    pub fn new(watermarks: WatermarkStore, clock: Arc<dyn Clock>, timezone: Tz) -> Self {
        Self {
            watermarks,
            clock,
            timezone,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Reads the job's watermark and pairs it with the current truncated hour.
    pub async fn build_window(&self, query_name: &str) -> Result<Window, ImportError> {
        let last_update = self.watermarks.last_update(query_name).await?;
        Ok(Window::between(
            last_update,
            self.clock.now(),
            self.timezone,
        ))
    }
}
