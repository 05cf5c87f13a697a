use crate::transform::{CREATED_AT, error::SkipReason, pipeline::EntityTransform};
use chrono::{DateTime, Utc};
use model::{core::value::Value, entity::EntityKind, records::record::Record};

pub const ABTEST: &str = "abtest";

/// Tags a user with the variation they were assigned in an A/B test.
#[derive(Debug, Clone)]
pub struct AbTestTransform {
    abtest: String,
}

impl AbTestTransform {
    pub fn new(abtest: impl Into<String>) -> Self {
        Self {
            abtest: abtest.into(),
        }
    }
}

impl EntityTransform for AbTestTransform {
    fn kind(&self) -> EntityKind {
        EntityKind::AbTest
    }

    fn identity_fields(&self) -> &'static [&'static str] {
        &["_id", "user_id"]
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["variation"]
    }

    fn shape(&self, payload: &mut Record, _created_at: DateTime<Utc>) -> Result<(), SkipReason> {
        payload.remove(CREATED_AT);
        payload.insert(ABTEST, Value::String(self.abtest.clone()));
        Ok(())
    }
}
