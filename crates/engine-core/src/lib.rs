pub mod clock;
pub mod error;
pub mod importer;
pub mod reader;
pub mod report;
pub mod watermark;
pub mod window;
pub mod writer;
