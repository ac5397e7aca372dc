//! Business logic services

pub mod export_processor;
pub mod export_writer;
pub mod import_processor;
pub mod progress;
pub mod roll_export;
pub mod roll_import;
pub mod stats;
pub mod votes;
