use crate::document::{DocumentStore, error::DocumentStoreError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use model::{core::value::Value, execution::request::is_field_name, records::record::Record};
use mongodb::{
    Client, Collection, Database,
    bson::{self, Binary, Bson, DateTime as BsonDateTime, Document, doc, spec::BinarySubtype},
};
use tracing::{debug, info};

const USERS_COLLECTION: &str = "users";
const IMPORTS_COLLECTION: &str = "imports";

/// MongoDB-backed analytics store.
///
/// Users are documents keyed by `user_id`; actions are appended to their
/// embedded `actions` list, A/B assignments live under `ab.<test>`. Job
/// watermarks are kept in the `imports` collection, one document per job.
#[derive(Clone)]
pub struct MongoDocumentStore {
    users: Collection<Document>,
    imports: Collection<Document>,
}

impl MongoDocumentStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, DocumentStoreError> {
        if database.trim().is_empty() {
            return Err(DocumentStoreError::InvalidConfig(
                "database name is empty".to_string(),
            ));
        }
        let client = Client::with_uri_str(uri).await?;
        info!("Connected to MongoDB sink, database '{}'", database);
        Ok(Self::with_database(&client.database(database)))
    }

    pub fn with_database(db: &Database) -> Self {
        Self {
            users: db.collection(USERS_COLLECTION),
            imports: db.collection(IMPORTS_COLLECTION),
        }
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn get_last_update(
        &self,
        query_name: &str,
    ) -> Result<Option<DateTime<Utc>>, DocumentStoreError> {
        let Some(job) = self.imports.find_one(doc! { "_id": query_name }).await? else {
            return Ok(None);
        };
        let stored = job
            .get_datetime("last_update")
            .map_err(|_| DocumentStoreError::CorruptWatermark(query_name.to_string()))?;
        DateTime::<Utc>::from_timestamp_millis(stored.timestamp_millis())
            .map(Some)
            .ok_or_else(|| DocumentStoreError::CorruptWatermark(query_name.to_string()))
    }

    async fn set_last_update(
        &self,
        query_name: &str,
        last_update: DateTime<Utc>,
    ) -> Result<(), DocumentStoreError> {
        let at = BsonDateTime::from_millis(last_update.timestamp_millis());
        self.imports
            .update_one(
                doc! { "_id": query_name },
                doc! { "$set": { "last_update": at } },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn create_user(&self, record: &Record) -> Result<(), DocumentStoreError> {
        let mut user = record_to_document(record)?;

        // Users are inserted once; re-imports of the same user_id leave it untouched.
        match user.remove("user_id") {
            Some(user_id) => {
                self.users
                    .update_one(
                        doc! { "user_id": user_id },
                        doc! { "$setOnInsert": user },
                    )
                    .upsert(true)
                    .await?;
            }
            None => {
                self.users.insert_one(user).await?;
            }
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        identity: &Value,
        record: &Record,
    ) -> Result<(), DocumentStoreError> {
        let profile = record_to_document(record)?;
        if profile.is_empty() {
            return Ok(());
        }
        let result = self
            .users
            .update_one(
                doc! { "user_id": value_to_bson("_id", identity)? },
                doc! { "$set": profile },
            )
            .await?;
        if result.matched_count == 0 {
            debug!("No user {} to update profile for", identity);
        }
        Ok(())
    }

    async fn insert_action(
        &self,
        identity: &Value,
        record: &Record,
        unique: bool,
    ) -> Result<(), DocumentStoreError> {
        let action = record_to_document(record)?;
        let mut filter = doc! { "user_id": value_to_bson("user_id", identity)? };
        if unique {
            let name = action
                .get("name")
                .cloned()
                .ok_or_else(|| DocumentStoreError::Rejected("action has no name".to_string()))?;
            filter.insert("actions.name", doc! { "$ne": name });
        }

        let result = self
            .users
            .update_one(filter, doc! { "$push": { "actions": action } })
            .await?;
        if result.matched_count == 0 {
            debug!(
                "Action for user {} not inserted (unknown user or duplicate)",
                identity
            );
        }
        Ok(())
    }

    async fn tag_abtest(
        &self,
        identity: &Value,
        record: &Record,
    ) -> Result<(), DocumentStoreError> {
        let mut assignment = record_to_document(record)?;
        let abtest = match assignment.remove("abtest") {
            Some(Bson::String(name)) if is_field_name(&name) => name,
            _ => {
                return Err(DocumentStoreError::Rejected(
                    "abtest name must be a plain field name".to_string(),
                ));
            }
        };

        let mut set = Document::new();
        set.insert(format!("ab.{abtest}"), assignment);
        self.users
            .update_one(
                doc! { "user_id": value_to_bson("user_id", identity)? },
                doc! { "$set": set },
            )
            .await?;
        Ok(())
    }
}

pub fn record_to_document(record: &Record) -> Result<Document, DocumentStoreError> {
    let mut document = Document::new();
    for (name, value) in record.iter() {
        document.insert(name, value_to_bson(name, value)?);
    }
    Ok(document)
}

/// Maps a field value onto BSON. Naive datetimes are stored as if they were UTC.
pub fn value_to_bson(field: &str, value: &Value) -> Result<Bson, DocumentStoreError> {
    let bson = match value {
        Value::Int(v) => Bson::Int64(*v),
        Value::Uint(v) => match i64::try_from(*v) {
            Ok(v) => Bson::Int64(v),
            Err(_) => Bson::String(v.to_string()),
        },
        Value::Float(v) => Bson::Double(*v),
        Value::String(v) => Bson::String(v.clone()),
        Value::Boolean(v) => Bson::Boolean(*v),
        Value::Json(v) => bson::to_bson(v).map_err(|e| DocumentStoreError::Encode {
            field: field.to_string(),
            message: e.to_string(),
        })?,
        Value::Bytes(v) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: v.clone(),
        }),
        Value::Date(v) => Bson::DateTime(BsonDateTime::from_millis(
            v.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
        )),
        Value::DateTime(v) => Bson::DateTime(BsonDateTime::from_millis(
            v.and_utc().timestamp_millis(),
        )),
        Value::Timestamp(v) => Bson::DateTime(BsonDateTime::from_millis(v.timestamp_millis())),
        Value::Null => Bson::Null,
    };
    Ok(bson)
}
