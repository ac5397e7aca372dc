//! Voter search and vote marking at polling tables

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{PipelineError, StoreError};
use crate::services::stats;
use crate::store::{RollSearch, RollStore};
use crate::types::{ListResponse, RollRow, SearchRequest, Session, VoteMark, TIER_OPERATOR};

/// Largest page a search may return.
pub const MAX_SEARCH_PAGE: i64 = 100;

pub struct VoteService {
    store: Arc<dyn RollStore>,
}

impl VoteService {
    pub fn new(store: Arc<dyn RollStore>) -> Self {
        Self { store }
    }

    /// Search by exact documento (numeric query) or surname/name prefix.
    /// Table operators only ever see their own table.
    pub async fn search(
        &self,
        request: &SearchRequest,
        session: &Session,
    ) -> Result<ListResponse<RollRow>, PipelineError> {
        let query = request.query.as_deref().map(str::trim).unwrap_or_default();
        let (documento, name_prefix) = if query.is_empty() {
            (None, None)
        } else if query.chars().all(|c| c.is_ascii_digit()) {
            match query.parse::<i64>() {
                Ok(d) => (Some(d), None),
                Err(_) => return Ok(empty_page(request)),
            }
        } else {
            (None, Some(query.to_string()))
        };

        let mesa_numero = if session.role_tier >= TIER_OPERATOR {
            match session.mesa_numero {
                Some(own) => Some(own),
                None => {
                    return Err(PipelineError::PermissionDenied(
                        "El usuario no tiene mesa asignada".to_string(),
                    ))
                }
            }
        } else {
            request.mesa_numero
        };

        let search = RollSearch {
            documento,
            name_prefix,
            mesa_numero,
            limit: request.limit.clamp(1, MAX_SEARCH_PAGE),
            offset: request.offset.max(0),
        };
        let (items, total) = self.store.search_roll(&search).await?;
        Ok(ListResponse {
            items,
            total,
            limit: search.limit,
            offset: search.offset,
        })
    }

    /// Record that the voter has voted, attributed to the caller.
    pub async fn mark_vote(&self, documento: i64, session: &Session) -> Result<RollRow, PipelineError> {
        let mark = VoteMark {
            at: Utc::now(),
            by: session.user_id,
        };
        self.set_vote(documento, Some(mark), session).await
    }

    /// Clear a recorded vote.
    pub async fn unmark_vote(&self, documento: i64, session: &Session) -> Result<RollRow, PipelineError> {
        self.set_vote(documento, None, session).await
    }

    async fn set_vote(
        &self,
        documento: i64,
        mark: Option<VoteMark>,
        session: &Session,
    ) -> Result<RollRow, PipelineError> {
        let row = self.load(documento).await?;
        let mesa = row.record.mesa_numero;
        if !session.can_mark_table(mesa) {
            return Err(PipelineError::PermissionDenied(format!(
                "No puede registrar votos en la mesa {}",
                mesa.map_or_else(|| "sin asignar".to_string(), |m| m.to_string())
            )));
        }

        self.store.set_vote(documento, mark).await?;
        info!(
            "Vote {} for documento {} by {}",
            if mark.is_some() { "marked" } else { "cleared" },
            documento,
            session.user_id
        );

        if let Some(numero) = mesa {
            if let Err(e) = stats::refresh_table(self.store.as_ref(), numero).await {
                warn!("Vote stored but table {} statistics not refreshed: {}", numero, e);
            }
        }

        self.load(documento).await
    }

    async fn load(&self, documento: i64) -> Result<RollRow, PipelineError> {
        self.store
            .get_roll(documento)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("documento {}", documento)).into())
    }
}

fn empty_page(request: &SearchRequest) -> ListResponse<RollRow> {
    ListResponse {
        items: Vec::new(),
        total: 0,
        limit: request.limit.clamp(1, MAX_SEARCH_PAGE),
        offset: request.offset.max(0),
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::types::{RollRecord, TIER_SUPERVISOR};

    fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::with_mesas([1000, 1001]));
        let mut perez = RollRecord::sample(2, Some(1000));
        perez.apellido = "PEREZ".to_string();
        let mut garcia_b = RollRecord::sample(3, Some(1001));
        garcia_b.nombre = "ANA".to_string();
        store.seed([RollRecord::sample(1, Some(1000)), perez, garcia_b]);
        store
    }

    fn search(query: &str) -> SearchRequest {
        SearchRequest {
            query: Some(query.to_string()),
            mesa_numero: None,
            limit: 50,
            offset: 0,
        }
    }

    fn supervisor() -> Session {
        Session::new(Uuid::new_v4(), TIER_SUPERVISOR, None)
    }

    #[tokio::test]
    async fn test_numeric_query_matches_documento() {
        let service = VoteService::new(store());
        let page = service.search(&search("2"), &supervisor()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].record.apellido, "PEREZ");
    }

    #[tokio::test]
    async fn test_name_prefix_case_insensitive() {
        let service = VoteService::new(store());
        let page = service.search(&search("gar"), &supervisor()).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_operator_sees_only_own_table() {
        let service = VoteService::new(store());
        let operator = Session::new(Uuid::new_v4(), TIER_OPERATOR, Some(1001));
        let mut request = search("gar");
        request.mesa_numero = Some(1000);
        let page = service.search(&request, &operator).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].record.documento, 3);
    }

    #[tokio::test]
    async fn test_page_size_capped() {
        let service = VoteService::new(store());
        let mut request = search("");
        request.limit = 5_000;
        let page = service.search(&request, &supervisor()).await.unwrap();
        assert_eq!(page.limit, MAX_SEARCH_PAGE);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_mark_and_unmark_update_table_stats() {
        let store = store();
        let service = VoteService::new(store.clone());
        let session = supervisor();

        let row = service.mark_vote(1, &session).await.unwrap();
        assert!(row.record.voto_emitido);
        assert!(row.record.fecha_voto.is_some());
        assert_eq!(row.record.voto_registrado_por, Some(session.user_id));
        assert_eq!(store.mesa_stats(1000).unwrap().total_votantes, 1);

        let row = service.unmark_vote(1, &session).await.unwrap();
        assert!(!row.record.voto_emitido);
        assert_eq!(row.record.fecha_voto, None);
        assert_eq!(row.record.voto_registrado_por, None);
        assert_eq!(store.mesa_stats(1000).unwrap().total_votantes, 0);
    }

    #[tokio::test]
    async fn test_operator_limited_to_own_table() {
        let store = store();
        let service = VoteService::new(store.clone());
        let operator = Session::new(Uuid::new_v4(), TIER_OPERATOR, Some(1000));

        assert!(service.mark_vote(1, &operator).await.is_ok());
        let err = service.mark_vote(3, &operator).await.unwrap_err();
        assert!(matches!(err, PipelineError::PermissionDenied(_)));
        assert!(!store.record(3).unwrap().voto_emitido);
    }

    #[tokio::test]
    async fn test_unknown_documento_not_found() {
        let service = VoteService::new(store());
        let err = service.mark_vote(999, &supervisor()).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
