use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use connectors::adapter::SourceKind;

/// Immutable, validated configuration; nothing connects before this exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings {
    pub source_uri: String,
    /// Driver selected from the source URI scheme
    pub source_kind: SourceKind,
    pub sink_uri: String,
    pub sink_database: String,
    /// Timezone the source stores its naive timestamps in
    pub timezone: Tz,
    /// Default watermark for jobs with no checkpoint yet
    pub initial_watermark: Option<DateTime<Utc>>,
}

impl ValidatedSettings {
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }
}
