//! PostgreSQL-backed roll store

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{RollSearch, RollStore};
use crate::db::queries;
use crate::error::StoreError;
use crate::types::{
    ExportFilter, ReferenceSets, RollRecord, RollRow, Session, TableStats, VoteMark,
};

/// Roll store backed by a sqlx connection pool
#[derive(Clone)]
pub struct PgRollStore {
    pool: PgPool,
}

impl PgRollStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RollStore for PgRollStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn load_session(&self, user_id: Uuid) -> Result<Session, StoreError> {
        let profile = queries::reference::get_profile(&self.pool, user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("perfil {}", user_id)))?;
        Ok(profile.into())
    }

    async fn reference_sets(&self) -> Result<ReferenceSets, StoreError> {
        let mesas = queries::mesa::list_numbers(&self.pool).await?;
        let emopicks = queries::reference::emopick_ids(&self.pool).await?;
        let users = queries::reference::profile_ids(&self.pool).await?;

        debug!(
            "Reference sets loaded: {} mesas, {} emopicks, {} users",
            mesas.len(),
            emopicks.len(),
            users.len()
        );

        Ok(ReferenceSets {
            mesas: mesas.into_iter().collect(),
            emopicks: emopicks.into_iter().collect(),
            users: users.into_iter().collect(),
        })
    }

    async fn existing_documents(&self, documentos: &[i64]) -> Result<HashSet<i64>, StoreError> {
        queries::roll::existing_documents(&self.pool, documentos).await
    }

    async fn upsert_roll(&self, records: &[RollRecord]) -> Result<(), StoreError> {
        queries::roll::upsert_batch(&self.pool, records).await
    }

    async fn list_mesas(&self) -> Result<Vec<i32>, StoreError> {
        queries::mesa::list_numbers(&self.pool).await
    }

    async fn count_mesa(&self, numero: i32) -> Result<TableStats, StoreError> {
        queries::mesa::count_for(&self.pool, numero).await
    }

    async fn write_mesa_stats(&self, stats: &TableStats) -> Result<(), StoreError> {
        queries::mesa::write_stats(&self.pool, stats).await
    }

    async fn count_roll(&self, filter: &ExportFilter) -> Result<i64, StoreError> {
        queries::roll::count_filtered(&self.pool, filter).await
    }

    async fn fetch_roll_page(
        &self,
        filter: &ExportFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RollRow>, StoreError> {
        queries::roll::fetch_filtered_page(&self.pool, filter, offset, limit).await
    }

    async fn search_roll(&self, search: &RollSearch) -> Result<(Vec<RollRow>, i64), StoreError> {
        queries::roll::search(
            &self.pool,
            search.documento,
            search.name_prefix.as_deref(),
            search.mesa_numero,
            search.limit,
            search.offset,
        )
        .await
    }

    async fn get_roll(&self, documento: i64) -> Result<Option<RollRow>, StoreError> {
        queries::roll::get(&self.pool, documento).await
    }

    async fn set_vote(&self, documento: i64, mark: Option<VoteMark>) -> Result<(), StoreError> {
        if queries::roll::set_vote(&self.pool, documento, mark).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("documento {}", documento)))
        }
    }
}
