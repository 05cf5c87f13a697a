use crate::transform::{
    CREATED_AT,
    error::SkipReason,
    meta::{self, META},
    pipeline::EntityTransform,
};
use chrono::{DateTime, Utc};
use model::{core::value::Value, entity::EntityKind, records::record::Record};

/// Actions are appended to a user; `meta` JSON is flattened into the action.
#[derive(Debug, Clone)]
pub struct ActionTransform {
    name: String,
}

impl ActionTransform {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EntityTransform for ActionTransform {
    fn kind(&self) -> EntityKind {
        EntityKind::Action
    }

    fn identity_fields(&self) -> &'static [&'static str] {
        &["_id", "user_id"]
    }

    fn shape(&self, payload: &mut Record, created_at: DateTime<Utc>) -> Result<(), SkipReason> {
        payload.insert(CREATED_AT, Value::Timestamp(created_at));
        payload.insert("name", Value::String(self.name.clone()));

        // Meta keys win over columns, `name` included.
        if let Some(raw) = payload.remove(META) {
            if let Some(fields) = meta::decode(&raw)? {
                payload.merge(fields);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::Transformer;
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    fn row(meta: Value) -> Record {
        Record::from_fields([
            ("user_id", Value::Int(42)),
            ("created_at", Value::from("2020-01-01 10:00:00")),
            ("meta", meta),
        ])
    }

    #[test]
    fn merges_meta_at_top_level() {
        let record = Transformer::new(Los_Angeles, ActionTransform::new("purchase"))
            .apply(row(Value::from(r#"{"score": 5}"#)))
            .unwrap();

        assert_eq!(record.identity, Some(Value::Int(42)));
        assert_eq!(
            record.payload,
            Record::from_fields([
                (
                    "created_at",
                    Value::Timestamp(Utc.with_ymd_and_hms(2020, 1, 1, 18, 0, 0).unwrap())
                ),
                ("name", Value::from("purchase")),
                ("score", Value::Int(5)),
            ])
        );
    }

    #[test]
    fn meta_overwrites_injected_name() {
        let record = Transformer::new(Los_Angeles, ActionTransform::new("purchase"))
            .apply(row(Value::from(r#"{"name": "refund"}"#)))
            .unwrap();

        assert_eq!(record.payload.get("name"), Some(&Value::from("refund")));
    }

    #[test]
    fn prefers_underscore_id_identity() {
        let mut source = row(Value::Null);
        source.insert("_id", Value::Int(7));

        let record = Transformer::new(Los_Angeles, ActionTransform::new("login"))
            .apply(source)
            .unwrap();

        assert_eq!(record.identity, Some(Value::Int(7)));
        assert_eq!(record.payload.get("user_id"), Some(&Value::Int(42)));
        assert!(!record.payload.contains("meta"));
    }

    #[test]
    fn malformed_meta_skips_the_row() {
        let result = Transformer::new(Los_Angeles, ActionTransform::new("purchase"))
            .apply(row(Value::from("{score: 5")));

        assert!(matches!(result, Err(SkipReason::MalformedMeta(_))));
    }
}
