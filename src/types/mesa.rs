//! Polling table (mesa) and reference data types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Cached per-table aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TableStats {
    pub numero: i32,
    pub total_electores: i64,
    pub total_votantes: i64,
}

/// Snapshot of the keys a roll record may reference, fetched once per import run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSets {
    pub mesas: HashSet<i32>,
    pub emopicks: HashSet<i32>,
    pub users: HashSet<Uuid>,
}
