use crate::transform::{CREATED_AT, error::SkipReason, pipeline::EntityTransform};
use chrono::{DateTime, Utc};
use model::{entity::EntityKind, records::record::Record};

/// Profile rows update an existing user keyed by `_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileTransform;

impl EntityTransform for ProfileTransform {
    fn kind(&self) -> EntityKind {
        EntityKind::Profile
    }

    fn identity_fields(&self) -> &'static [&'static str] {
        &["_id"]
    }

    fn shape(&self, payload: &mut Record, _created_at: DateTime<Utc>) -> Result<(), SkipReason> {
        payload.remove(CREATED_AT);
        Ok(())
    }
}
