//! Storage abstraction over the hosted backend
//!
//! Every pipeline stage talks to the roll through [`RollStore`]. The worker
//! runs against [`PgRollStore`]; tests use the in-memory store.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{
    ExportFilter, ReferenceSets, RollRecord, RollRow, Session, TableStats, VoteMark,
};

pub use postgres::PgRollStore;

/// Voter search criteria, already split into document or name lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollSearch {
    pub documento: Option<i64>,
    pub name_prefix: Option<String>,
    pub mesa_numero: Option<i32>,
    pub limit: i64,
    pub offset: i64,
}

/// Capabilities the pipeline needs from the backing store: filtered queries,
/// counts, bulk upsert and session lookup.
#[async_trait]
pub trait RollStore: Send + Sync {
    /// Get the store name for logging
    fn name(&self) -> &str;

    /// Build a session for a known user profile
    async fn load_session(&self, user_id: Uuid) -> Result<Session, StoreError>;

    /// Table numbers, pick-list ids and user ids a record may reference
    async fn reference_sets(&self) -> Result<ReferenceSets, StoreError>;

    /// Subset of `documentos` already present in the roll
    async fn existing_documents(&self, documentos: &[i64]) -> Result<HashSet<i64>, StoreError>;

    /// Insert-or-update keyed by documento, as a single write
    async fn upsert_roll(&self, records: &[RollRecord]) -> Result<(), StoreError>;

    async fn list_mesas(&self) -> Result<Vec<i32>, StoreError>;

    /// Fresh enrolled/voted counts for one table, computed from the roll
    async fn count_mesa(&self, numero: i32) -> Result<TableStats, StoreError>;

    /// Overwrite one table's cached aggregates
    async fn write_mesa_stats(&self, stats: &TableStats) -> Result<(), StoreError>;

    async fn count_roll(&self, filter: &ExportFilter) -> Result<i64, StoreError>;

    /// One page of filtered rows ordered by table, order, documento
    async fn fetch_roll_page(
        &self,
        filter: &ExportFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RollRow>, StoreError>;

    /// Matching rows for the page plus the total match count
    async fn search_roll(&self, search: &RollSearch) -> Result<(Vec<RollRow>, i64), StoreError>;

    async fn get_roll(&self, documento: i64) -> Result<Option<RollRow>, StoreError>;

    /// Set (`Some`) or clear (`None`) a voter's vote; `NotFound` when absent
    async fn set_vote(&self, documento: i64, mark: Option<VoteMark>) -> Result<(), StoreError>;
}
