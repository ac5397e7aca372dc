//! Database queries

pub mod mesa;
pub mod reference;
pub mod roll;
