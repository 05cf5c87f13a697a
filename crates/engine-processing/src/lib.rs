pub mod timestamp;
pub mod tracker;
pub mod transform;
