pub mod base;
pub mod memory;
pub mod mysql;
pub mod postgres;
