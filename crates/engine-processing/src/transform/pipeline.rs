use crate::{
    timestamp,
    transform::{CREATED_AT, error::SkipReason},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use model::{core::value::Value, entity::EntityKind, records::record::Record};

/// Per-kind rules that turn a source row into a sink payload.
pub trait EntityTransform: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Identity columns in order of preference. The chosen one is removed from
    /// the payload and handed to the sink separately. Empty when the sink
    /// operation takes no identity.
    fn identity_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Columns besides identity and `created_at` that must be present and non-NULL.
    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Shapes the payload once required fields were checked and the identity removed.
    fn shape(&self, payload: &mut Record, created_at: DateTime<Utc>) -> Result<(), SkipReason>;
}

/// A row ready for the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    pub kind: EntityKind,
    pub identity: Option<Value>,
    pub payload: Record,
    /// Localized `created_at`, used to advance the watermark.
    pub created_at: DateTime<Tz>,
}

/// Applies an [`EntityTransform`] to rows of a source in a given timezone.
pub struct Transformer {
    timezone: Tz,
    entity: Box<dyn EntityTransform>,
}

impl Transformer {
    pub fn new<T: EntityTransform + 'static>(timezone: Tz, entity: T) -> Self {
        Self {
            timezone,
            entity: Box::new(entity),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.entity.kind()
    }

    pub fn apply(&self, row: Record) -> Result<SinkRecord, SkipReason> {
        let identity_field = self.identity_field(&row)?;

        let raw_created_at = row
            .get(CREATED_AT)
            .filter(|v| !v.is_null())
            .ok_or_else(|| SkipReason::MissingField(CREATED_AT.to_string()))?;

        if let Some(missing) = self
            .entity
            .required_fields()
            .iter()
            .find(|field| !row.has_value(field))
        {
            return Err(SkipReason::MissingField(missing.to_string()));
        }

        let created_at = timestamp::localize_value(raw_created_at, self.timezone)?;

        let mut payload = row;
        let identity = identity_field.and_then(|field| payload.remove(field));
        self.entity
            .shape(&mut payload, created_at.with_timezone(&Utc))?;

        Ok(SinkRecord {
            kind: self.entity.kind(),
            identity,
            payload,
            created_at,
        })
    }

    fn identity_field(&self, row: &Record) -> Result<Option<&'static str>, SkipReason> {
        let candidates = self.entity.identity_fields();
        if candidates.is_empty() {
            return Ok(None);
        }
        candidates
            .iter()
            .copied()
            .find(|field| row.has_value(field))
            .map(Some)
            .ok_or_else(|| SkipReason::MissingField(candidates.join(" or ")))
    }
}
