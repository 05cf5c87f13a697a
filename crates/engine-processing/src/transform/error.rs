use serde::Serialize;
use thiserror::Error;

/// Why a row was skipped instead of written.
///
/// Skips never abort a run; the row simply does not reach the sink and does
/// not move the watermark.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("invalid created_at value: {0}")]
    InvalidTimestamp(String),

    #[error("malformed meta: {0}")]
    MalformedMeta(String),
}
