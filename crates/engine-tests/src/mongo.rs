#[cfg(test)]
mod tests {
    use crate::{
        TEST_MONGO_DB, TEST_MONGO_URL,
        utils::{ABTESTS_QUERY, ACTIONS_QUERY, naive, row, utc},
    };
    use chrono::TimeDelta;
    use connectors::{
        document::{DocumentStore, mongo::MongoDocumentStore},
        sql::memory::MemorySource,
    };
    use engine_core::{
        clock::FixedClock,
        importer::{Importer, ImporterOptions},
    };
    use model::{core::value::Value, records::record::Record};
    use mongodb::{
        Client, Database,
        bson::{Document, doc},
    };
    use std::sync::Arc;

    async fn fresh_database() -> Database {
        let client = Client::with_uri_str(TEST_MONGO_URL)
            .await
            .expect("connect mongodb");
        let db = client.database(TEST_MONGO_DB);
        db.drop().await.unwrap();
        db
    }

    fn importer(store: &MongoDocumentStore, rows: Vec<Record>) -> Importer {
        Importer::new(
            Box::new(MemorySource::new(rows)),
            Arc::new(store.clone()),
            ImporterOptions {
                timezone: chrono_tz::UTC,
                initial_watermark: None,
            },
        )
        .with_clock(Arc::new(FixedClock::new(utc(2020, 1, 2, 0, 0, 0))))
    }

    async fn user(db: &Database, user_id: i64) -> Document {
        db.collection::<Document>("users")
            .find_one(doc! { "user_id": user_id })
            .await
            .unwrap()
            .expect("user document")
    }

    fn action_rows(user_id: i64) -> Vec<Record> {
        vec![
            row([
                ("user_id", Value::Int(user_id)),
                ("created_at", Value::DateTime(naive(2020, 1, 1, 10, 0, 0))),
            ]),
            row([
                ("user_id", Value::Int(user_id)),
                ("created_at", Value::DateTime(naive(2020, 1, 1, 11, 0, 0))),
            ]),
        ]
    }

    // Test Settings: live MongoDB sink.
    // Scenario: the same user is created twice, then a job watermark is written,
    // read back and moved forward.
    // Expected Outcome:
    // - The second create leaves the first user document untouched.
    // - Watermarks round-trip through the `imports` collection.
    #[tokio::test]
    #[ignore = "requires a running MongoDB server"]
    async fn users_are_created_once_and_watermarks_round_trip() {
        let db = fresh_database().await;
        let store = MongoDocumentStore::with_database(&db);

        store
            .create_user(&row([
                ("user_id", Value::Int(1)),
                ("email", Value::from("first@example.com")),
            ]))
            .await
            .unwrap();
        store
            .create_user(&row([
                ("user_id", Value::Int(1)),
                ("email", Value::from("second@example.com")),
            ]))
            .await
            .unwrap();

        let users = db.collection::<Document>("users");
        assert_eq!(users.count_documents(doc! {}).await.unwrap(), 1);
        assert_eq!(user(&db, 1).await.get_str("email").unwrap(), "first@example.com");

        assert_eq!(store.get_last_update("signup_users").await.unwrap(), None);
        let at = utc(2020, 1, 2, 9, 30, 0);
        store.set_last_update("signup_users", at).await.unwrap();
        assert_eq!(store.get_last_update("signup_users").await.unwrap(), Some(at));

        let later = at + TimeDelta::hours(1);
        store.set_last_update("signup_users", later).await.unwrap();
        assert_eq!(
            store.get_last_update("signup_users").await.unwrap(),
            Some(later)
        );
    }

    // Test Settings: live MongoDB sink, in-memory source returning two rows of the
    // same action per user.
    // Scenario: "signup" is imported with `unique` twice (a reprocessed window),
    // "login" is imported without it, then an A/B test assignment is tagged.
    // Expected Outcome:
    // - Unique actions are pushed once per user and name, even across runs.
    // - Non-unique actions keep every row.
    // - The assignment lands under `ab.<test>`.
    #[tokio::test]
    #[ignore = "requires a running MongoDB server"]
    async fn unique_actions_are_pushed_once() {
        let db = fresh_database().await;
        let store = MongoDocumentStore::with_database(&db);
        for user_id in [1, 2] {
            store
                .create_user(&row([("user_id", Value::Int(user_id))]))
                .await
                .unwrap();
        }
        for job in ["actions.signup", "actions.login", "abtests.checkout"] {
            store
                .set_last_update(job, utc(2020, 1, 1, 0, 0, 0))
                .await
                .unwrap();
        }

        for _ in 0..2 {
            let report = importer(&store, action_rows(1))
                .import_actions("signup", None, ACTIONS_QUERY, true)
                .await
                .unwrap();
            assert_eq!(report.written, 2);
        }
        assert_eq!(user(&db, 1).await.get_array("actions").unwrap().len(), 1);

        importer(&store, action_rows(2))
            .import_actions("login", None, ACTIONS_QUERY, false)
            .await
            .unwrap();
        assert_eq!(user(&db, 2).await.get_array("actions").unwrap().len(), 2);

        importer(
            &store,
            vec![row([
                ("user_id", Value::Int(1)),
                ("created_at", Value::DateTime(naive(2020, 1, 1, 12, 0, 0))),
                ("variation", Value::from("B")),
            ])],
        )
        .import_abtests("checkout", None, ABTESTS_QUERY)
        .await
        .unwrap();
        let assignment = user(&db, 1)
            .await
            .get_document("ab")
            .unwrap()
            .get_document("checkout")
            .unwrap()
            .clone();
        assert_eq!(assignment.get_str("variation").unwrap(), "B");
        assert!(!assignment.contains_key("abtest"));
        assert!(!assignment.contains_key("created_at"));
    }
}
