pub mod abtest;
pub mod action;
pub mod error;
pub mod meta;
pub mod pipeline;
pub mod profile;
pub mod user;

pub use pipeline::{EntityTransform, SinkRecord, Transformer};

pub const CREATED_AT: &str = "created_at";
