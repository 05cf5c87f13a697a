pub mod core;
pub mod entity;
pub mod execution;
pub mod records;
