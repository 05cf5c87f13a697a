#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use connectors::{
    document::memory::{MemoryDocumentStore, SinkCall},
    sql::{base::source::RelationalSource, memory::MemorySource},
};
use engine_core::{
    clock::FixedClock,
    importer::{Importer, ImporterOptions},
};
use model::{core::value::Value, records::record::Record};
use std::sync::Arc;

pub const USERS_QUERY: &str =
    "SELECT * FROM users WHERE created_at >= '{start}' AND created_at < '{end}'";
pub const ACTIONS_QUERY: &str =
    "SELECT user_id, created_at, meta FROM actions WHERE created_at >= '{start}' AND created_at < '{end}'";
pub const PROFILES_QUERY: &str =
    "SELECT user_id AS _id, created_at, city FROM profiles WHERE created_at >= '{start}' AND created_at < '{end}'";
pub const ABTESTS_QUERY: &str =
    "SELECT user_id, created_at, variation FROM ab_assignments WHERE created_at >= '{start}' AND created_at < '{end}'";

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn local(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Tz> {
    tz.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn naive(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

pub fn row<const N: usize>(fields: [(&str, Value); N]) -> Record {
    Record::from_fields(fields)
}

/// Importer over in-memory collaborators with a clock frozen at `now`.
pub fn importer_at(
    source: impl RelationalSource + 'static,
    store: &MemoryDocumentStore,
    timezone: Tz,
    now: DateTime<Utc>,
) -> Importer {
    Importer::new(
        Box::new(source),
        Arc::new(store.clone()),
        ImporterOptions {
            timezone,
            initial_watermark: None,
        },
    )
    .with_clock(Arc::new(FixedClock::new(now)))
}

pub fn memory_source(rows: Vec<Record>) -> MemorySource {
    MemorySource::new(rows)
}

/// Payloads handed to `create_user`, in call order.
pub fn created_users(calls: &[SinkCall]) -> Vec<Record> {
    calls
        .iter()
        .filter_map(|call| match call {
            SinkCall::CreateUser { record } => Some(record.clone()),
            _ => None,
        })
        .collect()
}

/// `(identity, payload)` of every `insert_action` call, in call order.
pub fn inserted_actions(calls: &[SinkCall]) -> Vec<(Value, Record)> {
    calls
        .iter()
        .filter_map(|call| match call {
            SinkCall::InsertAction {
                identity, record, ..
            } => Some((identity.clone(), record.clone())),
            _ => None,
        })
        .collect()
}
