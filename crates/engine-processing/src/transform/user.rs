use crate::transform::{CREATED_AT, error::SkipReason, pipeline::EntityTransform};
use chrono::{DateTime, Utc};
use model::{core::value::Value, entity::EntityKind, records::record::Record};

/// Users are created as-is; `user_id` stays in the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserTransform;

impl EntityTransform for UserTransform {
    fn kind(&self) -> EntityKind {
        EntityKind::User
    }

    fn shape(&self, payload: &mut Record, created_at: DateTime<Utc>) -> Result<(), SkipReason> {
        payload.insert(CREATED_AT, Value::Timestamp(created_at));
        Ok(())
    }
}
