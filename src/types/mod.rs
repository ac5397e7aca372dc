//! Type definitions

pub mod export;
pub mod import;
pub mod import_export_job;
pub mod mesa;
pub mod messages;
pub mod profile;
pub mod roll;

pub use export::*;
pub use import::*;
pub use import_export_job::*;
pub use mesa::*;
pub use messages::*;
pub use profile::*;
pub use roll::*;
