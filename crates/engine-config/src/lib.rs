pub mod env;
pub mod job;
pub mod settings;
