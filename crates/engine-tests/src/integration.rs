#[cfg(test)]
mod tests {
    use crate::utils::{
        ABTESTS_QUERY, ACTIONS_QUERY, PROFILES_QUERY, USERS_QUERY, created_users, importer_at,
        inserted_actions, local, memory_source, naive, row, utc,
    };
    use chrono::{TimeDelta, Utc};
    use chrono_tz::{America::Los_Angeles, Asia::Kolkata, Australia::Sydney, Europe::Berlin};
    use connectors::{
        document::memory::{MemoryDocumentStore, SinkCall},
        sql::memory::MemorySource,
    };
    use engine_config::job::JobFile;
    use engine_core::{
        clock::FixedClock,
        error::{ImportError, WatermarkError},
        importer::{Importer, ImporterOptions},
        report::{RunOutcome, RunStage},
        window::Window,
    };
    use engine_processing::transform::error::SkipReason;
    use model::{core::value::Value, records::record::Record};
    use std::sync::Arc;
    use tracing_test::traced_test;

    // Scenario: job "signup_users" last ran up to 2020-01-01T00:00Z, the source keeps
    // Los Angeles wall-clock times and it is now 2020-01-02 03:00 in Los Angeles.
    // Three rows come back, one of them without `created_at`.
    // Expected Outcome:
    // - The query is bounded by [2019-12-31 16:00:00, 2020-01-02 03:00:00).
    // - Two users are created, the third row is skipped.
    // - The watermark moves to the latest written `created_at`, in UTC.
    #[tokio::test]
    async fn signup_users_in_los_angeles() {
        let store = MemoryDocumentStore::new()
            .with_watermark("signup_users", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let source = memory_source(vec![
            row([
                ("user_id", Value::Int(1)),
                ("created_at", Value::DateTime(naive(2020, 1, 1, 10, 0, 0))),
            ]),
            row([("user_id", Value::Int(2)), ("created_at", Value::Null)]),
            row([
                ("user_id", Value::Int(3)),
                ("created_at", Value::DateTime(naive(2020, 1, 2, 1, 30, 0))),
            ]),
        ]);
        let log = source.query_log();
        let now = local(Los_Angeles, 2020, 1, 2, 3, 0, 0).with_timezone(&Utc);
        let mut importer = importer_at(source, &store, Los_Angeles, now);

        let report = importer
            .import_users(Some("signup_users"), USERS_QUERY)
            .await
            .unwrap();

        assert_eq!(
            report.window,
            Some(Window::new(
                local(Los_Angeles, 2019, 12, 31, 16, 0, 0),
                local(Los_Angeles, 2020, 1, 2, 3, 0, 0),
            ))
        );
        assert_eq!(
            log.entries().await,
            vec![
                "SELECT * FROM users WHERE created_at >= '2019-12-31 16:00:00' AND created_at < '2020-01-02 03:00:00'"
                    .to_string()
            ]
        );

        let users = created_users(&store.calls().await);
        assert_eq!(users.len(), 2);
        assert_eq!(
            users[0].get("created_at"),
            Some(&Value::Timestamp(utc(2020, 1, 1, 18, 0, 0)))
        );

        assert_eq!(report.rows_read, 3);
        assert_eq!(report.written, 2);
        assert_eq!(
            report.skip_samples[0].reason,
            SkipReason::MissingField("created_at".to_string())
        );
        assert_eq!(
            store.watermark("signup_users").await,
            Some(utc(2020, 1, 2, 9, 30, 0))
        );
    }

    // Scenario: an action row carries `meta = '{"score": 5}'`.
    // Expected Outcome: `score` is merged at top level as an integer and `meta` is gone.
    #[tokio::test]
    async fn action_meta_is_flattened() {
        let store = MemoryDocumentStore::new()
            .with_watermark("actions.level_up", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let source = memory_source(vec![row([
            ("user_id", Value::Int(42)),
            ("created_at", Value::from("2020-01-01 12:00:00")),
            ("meta", Value::from(r#"{"score": 5}"#)),
        ])]);
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        importer
            .import_actions("level_up", None, ACTIONS_QUERY, false)
            .await
            .unwrap();

        let actions = inserted_actions(&store.calls().await);
        assert_eq!(actions.len(), 1);
        let (identity, payload) = &actions[0];
        assert_eq!(identity, &Value::Int(42));
        assert_eq!(payload.get("score"), Some(&Value::Int(5)));
        assert_eq!(payload.get("name"), Some(&Value::from("level_up")));
        assert!(!payload.contains("meta"));
        assert!(!payload.contains("user_id"));
    }

    // Scenario: the source connection reports itself closed.
    // Expected Outcome: no reads, no sink writes, the watermark is neither read nor written.
    #[tokio::test]
    async fn closed_source_is_a_no_op() {
        let store = MemoryDocumentStore::new()
            .with_watermark("actions.login", utc(2020, 1, 1, 0, 0, 0))
            .await;
        store.fail_get_last_update().await;
        let mut importer =
            importer_at(MemorySource::closed(), &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        let report = importer
            .import_actions("login", None, ACTIONS_QUERY, false)
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::SourceClosed);
        assert_eq!(report.rows_read, 0);
        assert!(store.calls().await.is_empty());
        assert_eq!(store.watermark_writes().await, 0);
        assert_eq!(
            store.watermark("actions.login").await,
            Some(utc(2020, 1, 1, 0, 0, 0))
        );
    }

    // Scenario: the caller releases the connection, then keeps calling import methods.
    // Expected Outcome: close is idempotent and every later import is inert.
    #[tokio::test]
    async fn imports_after_close_are_inert() {
        let store = MemoryDocumentStore::new()
            .with_watermark("users", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let source = memory_source(vec![row([
            ("user_id", Value::Int(1)),
            ("created_at", Value::from("2020-01-01 12:00:00")),
        ])]);
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        importer.close().await.unwrap();
        importer.close().await.unwrap();

        assert!(!importer.is_open());
        for report in [
            importer.import_users(None, USERS_QUERY).await.unwrap(),
            importer.import_profiles(None, PROFILES_QUERY).await.unwrap(),
            importer
                .import_abtests("checkout", None, ABTESTS_QUERY)
                .await
                .unwrap(),
        ] {
            assert_eq!(report.outcome, RunOutcome::SourceClosed);
        }
        assert!(store.calls().await.is_empty());
        assert_eq!(store.watermark_writes().await, 0);
    }

    // Scenario: the second of three sink writes fails.
    // Expected Outcome:
    // - The run aborts with a sink error pointing at row 1; row 2 is never written.
    // - The watermark stays where it was.
    // - The next run re-reads exactly the same window.
    #[traced_test]
    #[tokio::test]
    async fn sink_failure_aborts_without_checkpoint() {
        let store = MemoryDocumentStore::new()
            .with_watermark("users", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let rows: Vec<Record> = (1..=3)
            .map(|id| {
                row([
                    ("user_id", Value::Int(id)),
                    ("created_at", Value::from(format!("2020-01-01 0{id}:00:00"))),
                ])
            })
            .collect();
        let source = memory_source(rows);
        let log = source.query_log();
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        store.fail_write_at(1).await;
        let err = importer.import_users(None, USERS_QUERY).await.unwrap_err();

        assert!(matches!(err, ImportError::Sink { row: 1, .. }));
        assert_eq!(err.stage(), RunStage::Writing);
        assert_eq!(err.job(), "users");
        assert_eq!(store.calls().await.len(), 1);
        assert_eq!(store.watermark_writes().await, 0);
        assert_eq!(
            store.watermark("users").await,
            Some(utc(2020, 1, 1, 0, 0, 0))
        );
        assert!(logs_contain("[WRITING] Import 'users' aborted"));

        let _ = importer.import_users(None, USERS_QUERY).await;
        let queries = log.entries().await;
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], queries[1]);
    }

    // Scenario: the source connection drops after the first row.
    // Expected Outcome: a READING error, one write already done, watermark unchanged.
    #[tokio::test]
    async fn source_failure_mid_stream_keeps_watermark() {
        let store = MemoryDocumentStore::new()
            .with_watermark("users", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let source = memory_source(vec![
            row([
                ("user_id", Value::Int(1)),
                ("created_at", Value::from("2020-01-01 05:00:00")),
            ]),
            row([
                ("user_id", Value::Int(2)),
                ("created_at", Value::from("2020-01-01 06:00:00")),
            ]),
        ])
        .fail_after(1);
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        let err = importer.import_users(None, USERS_QUERY).await.unwrap_err();

        assert!(matches!(
            err,
            ImportError::Source {
                stage: RunStage::Reading,
                ..
            }
        ));
        assert_eq!(store.calls().await.len(), 1);
        assert_eq!(
            store.watermark("users").await,
            Some(utc(2020, 1, 1, 0, 0, 0))
        );
    }

    // Scenario: every row is written but persisting the new watermark fails.
    // Expected Outcome: a CHECKPOINT error and the previous watermark untouched.
    #[tokio::test]
    async fn checkpoint_failure_keeps_previous_watermark() {
        let store = MemoryDocumentStore::new()
            .with_watermark("users", utc(2020, 1, 1, 0, 0, 0))
            .await;
        store.fail_set_last_update().await;
        let source = memory_source(vec![row([
            ("user_id", Value::Int(1)),
            ("created_at", Value::from("2020-01-01 05:00:00")),
        ])]);
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        let err = importer.import_users(None, USERS_QUERY).await.unwrap_err();

        assert!(matches!(
            err,
            ImportError::Watermark(WatermarkError::Write { .. })
        ));
        assert_eq!(err.stage(), RunStage::Checkpoint);
        assert_eq!(store.calls().await.len(), 1);
        assert_eq!(
            store.watermark("users").await,
            Some(utc(2020, 1, 1, 0, 0, 0))
        );
    }

    // Scenario: the watermark cannot be read.
    // Expected Outcome: the run fails before any query is executed.
    #[tokio::test]
    async fn watermark_read_failure_stops_before_querying() {
        let store = MemoryDocumentStore::new();
        store.fail_get_last_update().await;
        let source = memory_source(vec![row([("user_id", Value::Int(1))])]);
        let log = source.query_log();
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        let err = importer.import_users(None, USERS_QUERY).await.unwrap_err();

        assert!(matches!(
            err,
            ImportError::Watermark(WatermarkError::Read { .. })
        ));
        assert_eq!(err.stage(), RunStage::WindowBuilt);
        assert!(log.entries().await.is_empty());
    }

    // Scenario: a job that never ran, with and without an initial watermark configured.
    // Expected Outcome: the initial value opens the first window; without it the run fails.
    #[tokio::test]
    async fn first_run_needs_an_initial_watermark() {
        let store = MemoryDocumentStore::new();
        let source = memory_source(vec![row([
            ("user_id", Value::Int(1)),
            ("created_at", Value::from("2020-01-01 05:00:00")),
        ])]);
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));
        let err = importer.import_users(None, USERS_QUERY).await.unwrap_err();
        assert!(matches!(err, ImportError::MissingWatermark(job) if job == "users"));

        let source = memory_source(vec![row([
            ("user_id", Value::Int(1)),
            ("created_at", Value::from("2020-01-01 05:00:00")),
        ])]);
        let mut importer = Importer::new(
            Box::new(source),
            Arc::new(store.clone()),
            ImporterOptions {
                timezone: chrono_tz::UTC,
                initial_watermark: Some(utc(2019, 12, 1, 0, 0, 0)),
            },
        )
        .with_clock(Arc::new(FixedClock::new(utc(2020, 1, 2, 0, 0, 0))));

        let report = importer.import_users(None, USERS_QUERY).await.unwrap();
        assert_eq!(report.previous_watermark, Some(utc(2019, 12, 1, 0, 0, 0)));
        assert_eq!(
            store.watermark("users").await,
            Some(utc(2020, 1, 1, 5, 0, 0))
        );
    }

    // Scenario: actions with a mix of good rows, missing identity, unparseable
    // timestamps and malformed meta.
    // Expected Outcome: sink writes == rows read - rows skipped, and skipped rows
    // do not move the watermark.
    #[tokio::test]
    async fn writes_equal_rows_minus_skips() {
        let store = MemoryDocumentStore::new()
            .with_watermark("actions.purchase", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let source = memory_source(vec![
            row([
                ("user_id", Value::Int(1)),
                ("created_at", Value::from("2020-01-01 05:00:00")),
                ("meta", Value::Null),
            ]),
            row([("created_at", Value::from("2020-01-01 23:00:00"))]),
            row([
                ("user_id", Value::Int(3)),
                ("created_at", Value::from("not a time")),
            ]),
            row([
                ("user_id", Value::Int(4)),
                ("created_at", Value::from("2020-01-01 22:00:00")),
                ("meta", Value::from("[1, 2, 3]")),
            ]),
            row([
                ("_id", Value::Int(5)),
                ("created_at", Value::from("2020-01-01 07:00:00")),
                ("meta", Value::from(r#"{"amount": 12.5}"#)),
            ]),
        ]);
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        let report = importer
            .import_actions("purchase", None, ACTIONS_QUERY, true)
            .await
            .unwrap();

        let calls = store.calls().await;
        assert_eq!(calls.len(), report.rows_read - report.skipped_count());
        assert_eq!(report.written, 2);
        assert_eq!(report.skipped.missing_field, 1);
        assert_eq!(report.skipped.invalid_timestamp, 1);
        assert_eq!(report.skipped.malformed_meta, 1);
        let reasons: Vec<_> = report
            .skip_samples
            .iter()
            .map(|s| (s.index, s.reason.clone()))
            .collect();
        assert!(matches!(reasons[0], (1, SkipReason::MissingField(_))));
        assert!(matches!(reasons[1], (2, SkipReason::InvalidTimestamp(_))));
        assert!(matches!(reasons[2], (3, SkipReason::MalformedMeta(_))));
        assert_eq!(
            store.watermark("actions.purchase").await,
            Some(utc(2020, 1, 1, 7, 0, 0))
        );
        assert!(
            calls
                .iter()
                .all(|call| matches!(call, SinkCall::InsertAction { unique: true, .. }))
        );
    }

    // Scenario: the same job runs repeatedly while the clock moves forward, with
    // the source returning rows older than the current watermark.
    // Expected Outcome: windows stay ordered, each starts at the previous
    // watermark and the watermark never moves backwards.
    #[tokio::test]
    async fn watermark_is_monotonic_across_runs() {
        let store = MemoryDocumentStore::new()
            .with_watermark("users", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let source = memory_source(vec![row([
            ("user_id", Value::Int(1)),
            ("created_at", Value::from("2020-01-01 06:00:00")),
        ])]);
        let clock = Arc::new(FixedClock::new(utc(2020, 1, 2, 0, 30, 0)));
        let mut importer = Importer::new(
            Box::new(source),
            Arc::new(store.clone()),
            ImporterOptions::default(),
        )
        .with_clock(clock.clone());

        let mut previous = store.watermark("users").await.unwrap();
        for _ in 0..3 {
            let report = importer.import_users(None, USERS_QUERY).await.unwrap();
            let window = report.window.unwrap();
            assert!(window.start <= window.end);
            assert_eq!(window.start_utc(), previous);

            let current = store.watermark("users").await.unwrap();
            assert!(current >= previous);
            previous = current;
            clock.advance(TimeDelta::hours(2));
        }
        assert_eq!(previous, utc(2020, 1, 1, 6, 0, 0));
    }

    // Scenario: profile and A/B test imports for the same users.
    // Expected Outcome: profiles update by `_id` without `created_at`; A/B rows tag
    // users with the test name and their variation.
    #[tokio::test]
    async fn profiles_and_abtests_reach_their_operations() {
        let store = MemoryDocumentStore::new()
            .with_watermark("profiles", utc(2020, 1, 1, 0, 0, 0))
            .await
            .with_watermark("abtests.checkout_button", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let source = memory_source(vec![row([
            ("_id", Value::Int(8)),
            ("user_id", Value::Int(8)),
            ("created_at", Value::from("2020-01-01 03:00:00")),
            ("variation", Value::from("green")),
        ])]);
        let mut importer = importer_at(source, &store, Berlin, utc(2020, 1, 2, 0, 0, 0));

        importer.import_profiles(None, PROFILES_QUERY).await.unwrap();
        importer
            .import_abtests("checkout_button", None, ABTESTS_QUERY)
            .await
            .unwrap();

        let calls = store.calls().await;
        assert_eq!(
            calls[0],
            SinkCall::UpdateProfile {
                identity: Value::Int(8),
                record: row([
                    ("user_id", Value::Int(8)),
                    ("variation", Value::from("green")),
                ]),
            }
        );
        assert_eq!(
            calls[1],
            SinkCall::TagAbTest {
                identity: Value::Int(8),
                record: row([
                    ("user_id", Value::Int(8)),
                    ("variation", Value::from("green")),
                    ("abtest", Value::from("checkout_button")),
                ]),
            }
        );
        // 03:00 in Berlin is 02:00 UTC.
        assert_eq!(
            store.watermark("profiles").await,
            Some(utc(2020, 1, 1, 2, 0, 0))
        );
    }

    // Scenario: a job file drives several imports on one importer.
    // Expected Outcome: imports run in file order under their derived job names,
    // honoring a whitelist.
    #[tokio::test]
    async fn job_file_imports_run_in_order() {
        let job_file = JobFile::parse(
            r#"
[[import]]
kind = "user"
query = "SELECT * FROM users WHERE created_at >= '{start}' AND created_at < '{end}'"

[[import]]
kind = "action"
name = "login"
query = "SELECT * FROM logins WHERE created_at >= '{start}' AND created_at < '{end}'"

[[import]]
kind = "abtest"
name = "pricing"
query = "SELECT * FROM ab WHERE created_at >= '{start}' AND created_at < '{end}'"
"#,
        )
        .unwrap();
        let store = MemoryDocumentStore::new()
            .with_watermark("users", utc(2020, 1, 1, 0, 0, 0))
            .await
            .with_watermark("actions.login", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let source = memory_source(vec![row([
            ("user_id", Value::Int(1)),
            ("created_at", Value::from("2020-01-01 05:00:00")),
        ])]);
        let log = source.query_log();
        let mut importer = importer_at(source, &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        let only = vec!["users".to_string(), "actions.login".to_string()];
        let mut jobs = Vec::new();
        for request in job_file.selected(&only) {
            jobs.push(importer.run(request).await.unwrap().job);
        }

        assert_eq!(jobs, vec!["users", "actions.login"]);
        let queries = log.entries().await;
        assert!(queries[0].starts_with("SELECT * FROM users"));
        assert!(queries[1].starts_with("SELECT * FROM logins"));
        assert!(matches!(store.calls().await[1], SinkCall::InsertAction { .. }));
    }

    #[traced_test]
    #[tokio::test]
    async fn run_logs_window_and_completion() {
        let store = MemoryDocumentStore::new()
            .with_watermark("users", utc(2020, 1, 1, 0, 0, 0))
            .await;
        let mut importer =
            importer_at(memory_source(Vec::new()), &store, chrono_tz::UTC, utc(2020, 1, 2, 0, 0, 0));

        importer.import_users(None, USERS_QUERY).await.unwrap();

        assert!(logs_contain("[WINDOW_BUILT] Import 'users' (user)"));
        assert!(logs_contain("[CHECKPOINT] Import 'users' done: 0 read, 0 written, 0 skipped"));
    }

    #[test]
    fn local_times_round_trip_through_utc() {
        for tz in [Los_Angeles, Kolkata, Sydney, Berlin] {
            for hour in [0, 6, 12, 18, 23] {
                let original = local(tz, 2020, 6, 15, hour, 45, 10);
                let back = original.with_timezone(&Utc).with_timezone(&tz);
                assert_eq!(back.naive_local(), original.naive_local());
                assert_eq!(
                    Window::new(back, back).format_for_query().start,
                    original.format("%Y-%m-%d %H:%M:%S").to_string()
                );
            }
        }
    }
}
