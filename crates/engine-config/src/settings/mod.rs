use crate::{env::EnvManager, settings::error::SettingsError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use connectors::adapter::SourceKind;
use serde::{Deserialize, Serialize};
use validated::ValidatedSettings;

pub mod error;
pub mod validated;

pub const ENV_SOURCE_URI: &str = "TRICKLE_SOURCE_URI";
pub const ENV_SINK_URI: &str = "TRICKLE_SINK_URI";
pub const ENV_SINK_DB: &str = "TRICKLE_SINK_DB";
pub const ENV_SOURCE_TZ: &str = "TRICKLE_SOURCE_TZ";
pub const ENV_INITIAL_WATERMARK: &str = "TRICKLE_INITIAL_WATERMARK";

const DEFAULT_TIMEZONE: &str = "UTC";

/// Construction-time configuration of an importer, as supplied by the caller.
///
/// Every field is optional so that several layers (environment, job file,
/// command line) can be merged before [`ImporterSettings::validate`] runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterSettings {
    pub source_uri: Option<String>,
    pub sink_uri: Option<String>,
    pub sink_database: Option<String>,
    pub source_timezone: Option<String>,
    /// RFC 3339; first watermark for jobs that were never run.
    pub initial_watermark: Option<String>,
}

impl ImporterSettings {
    pub fn from_env(env: &EnvManager) -> Self {
        let get = |key| env.get(key).map(str::to_string);
        Self {
            source_uri: get(ENV_SOURCE_URI),
            sink_uri: get(ENV_SINK_URI),
            sink_database: get(ENV_SINK_DB),
            source_timezone: get(ENV_SOURCE_TZ),
            initial_watermark: get(ENV_INITIAL_WATERMARK),
        }
    }

    /// Layers `overrides` on top of `self`; set fields of `overrides` win.
    pub fn merge(self, overrides: ImporterSettings) -> Self {
        Self {
            source_uri: overrides.source_uri.or(self.source_uri),
            sink_uri: overrides.sink_uri.or(self.sink_uri),
            sink_database: overrides.sink_database.or(self.sink_database),
            source_timezone: overrides.source_timezone.or(self.source_timezone),
            initial_watermark: overrides.initial_watermark.or(self.initial_watermark),
        }
    }

    pub fn validate(&self) -> Result<ValidatedSettings, SettingsError> {
        let source_uri = required(&self.source_uri, "source_uri")?;
        let source_kind = SourceKind::from_url(&source_uri)?;

        let (sink_uri, sink_database) = self.validate_sink()?;

        let timezone = parse_timezone(
            self.source_timezone
                .as_deref()
                .map(str::trim)
                .filter(|tz| !tz.is_empty())
                .unwrap_or(DEFAULT_TIMEZONE),
        )?;

        let initial_watermark = self
            .initial_watermark
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|value| parse_rfc3339("initial_watermark", value))
            .transpose()?;

        Ok(ValidatedSettings {
            source_uri,
            source_kind,
            sink_uri,
            sink_database,
            timezone,
            initial_watermark,
        })
    }

    /// Checks only the sink settings; returns `(sink_uri, sink_database)`.
    pub fn validate_sink(&self) -> Result<(String, String), SettingsError> {
        let sink_uri = required(&self.sink_uri, "sink_uri")?;
        if !(sink_uri.starts_with("mongodb://") || sink_uri.starts_with("mongodb+srv://")) {
            return Err(SettingsError::InvalidSink(format!(
                "expected a mongodb:// or mongodb+srv:// URI, got '{}'",
                connectors::adapter::redact_url(&sink_uri)
            )));
        }
        let sink_database = required(&self.sink_database, "sink_database")?;
        Ok((sink_uri, sink_database))
    }
}

fn required(value: &Option<String>, key: &'static str) -> Result<String, SettingsError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(SettingsError::Missing(key))
}

pub fn parse_timezone(name: &str) -> Result<Tz, SettingsError> {
    name.parse::<Tz>()
        .map_err(|_| SettingsError::InvalidTimezone(name.to_string()))
}

pub fn parse_rfc3339(key: &str, value: &str) -> Result<DateTime<Utc>, SettingsError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| SettingsError::InvalidTimestamp {
            key: key.to_string(),
            value: value.to_string(),
        })
}
