//! In-memory roll store used by tests
//!
//! Mirrors the Postgres semantics the pipeline relies on (upsert by key,
//! filter predicates, ordering) and counts calls so tests can assert on
//! batch and page boundaries. Failures can be injected per operation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{RollSearch, RollStore};
use crate::error::StoreError;
use crate::types::{
    ExportFilter, ReferenceSets, RollRecord, RollRow, Session, TableStats, UserProfile, VoteMark,
};

#[derive(Default)]
struct State {
    roll: BTreeMap<i64, RollRecord>,
    mesas: BTreeMap<i32, TableStats>,
    emopicks: BTreeMap<i32, String>,
    profiles: HashMap<Uuid, UserProfile>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    pub upsert_calls: AtomicUsize,
    pub page_fetches: AtomicUsize,
    /// Reported by `count_roll` instead of the real count.
    pub count_override: Mutex<Option<i64>>,
    /// 1-based upsert call that fails.
    pub fail_upsert_on_call: Mutex<Option<usize>>,
    pub fail_stats_writes: Mutex<bool>,
}

fn in_range(value: Option<i32>, from: Option<i32>, to: Option<i32>) -> bool {
    match value {
        Some(v) => from.map_or(true, |f| v >= f) && to.map_or(true, |t| v <= t),
        // SQL comparisons against NULL are never true
        None => from.is_none() && to.is_none(),
    }
}

fn filter_matches(filter: &ExportFilter, record: &RollRecord) -> bool {
    if let Some(flag) = filter.vote_status.as_flag() {
        if record.voto_emitido != flag {
            return false;
        }
    }
    if let Some(id) = filter.emopick_id {
        if record.emopick_id != Some(id) {
            return false;
        }
    }
    in_range(record.mesa_numero, filter.mesa_from, filter.mesa_to)
        && in_range(record.clase, filter.clase_from, filter.clase_to)
}

/// mesa ASC NULLS LAST, orden ASC NULLS LAST, documento ASC
fn roll_order(record: &RollRecord) -> (bool, Option<i32>, bool, Option<i32>, i64) {
    (
        record.mesa_numero.is_none(),
        record.mesa_numero,
        record.orden.is_none(),
        record.orden,
        record.documento,
    )
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given tables registered and zeroed.
    pub fn with_mesas(numbers: impl IntoIterator<Item = i32>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for numero in numbers {
                state.mesas.insert(numero, TableStats { numero, total_electores: 0, total_votantes: 0 });
            }
        }
        store
    }

    pub fn add_emopick(&self, id: i32, nombre: &str) {
        self.state.lock().emopicks.insert(id, nombre.to_string());
    }

    pub fn add_profile(&self, profile: UserProfile) {
        self.state.lock().profiles.insert(profile.id, profile);
    }

    /// Insert records directly, bypassing the pipeline.
    pub fn seed(&self, records: impl IntoIterator<Item = RollRecord>) {
        let mut state = self.state.lock();
        for record in records {
            state.roll.insert(record.documento, record);
        }
    }

    pub fn roll_len(&self) -> usize {
        self.state.lock().roll.len()
    }

    pub fn record(&self, documento: i64) -> Option<RollRecord> {
        self.state.lock().roll.get(&documento).cloned()
    }

    pub fn mesa_stats(&self, numero: i32) -> Option<TableStats> {
        self.state.lock().mesas.get(&numero).copied()
    }

    pub fn upserts(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }

    fn to_row(state: &State, record: &RollRecord) -> RollRow {
        RollRow {
            record: record.clone(),
            emopick_nombre: record.emopick_id.and_then(|id| state.emopicks.get(&id).cloned()),
        }
    }
}

#[async_trait]
impl RollStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_session(&self, user_id: Uuid) -> Result<Session, StoreError> {
        self.state
            .lock()
            .profiles
            .get(&user_id)
            .cloned()
            .map(Session::from)
            .ok_or_else(|| StoreError::NotFound(format!("perfil {}", user_id)))
    }

    async fn reference_sets(&self) -> Result<ReferenceSets, StoreError> {
        let state = self.state.lock();
        Ok(ReferenceSets {
            mesas: state.mesas.keys().copied().collect(),
            emopicks: state.emopicks.keys().copied().collect(),
            users: state.profiles.keys().copied().collect(),
        })
    }

    async fn existing_documents(&self, documentos: &[i64]) -> Result<HashSet<i64>, StoreError> {
        let state = self.state.lock();
        Ok(documentos
            .iter()
            .copied()
            .filter(|d| state.roll.contains_key(d))
            .collect())
    }

    async fn upsert_roll(&self, records: &[RollRecord]) -> Result<(), StoreError> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail_upsert_on_call.lock() == Some(call) {
            return Err(StoreError::Backend(format!("injected failure on upsert {}", call)));
        }

        let mut state = self.state.lock();
        for record in records {
            if let Some(mesa) = record.mesa_numero {
                if !state.mesas.contains_key(&mesa) {
                    return Err(StoreError::Constraint {
                        code: "23503".to_string(),
                        message: format!("mesa {} does not exist", mesa),
                    });
                }
            }
        }
        for record in records {
            state.roll.insert(record.documento, record.clone());
        }
        Ok(())
    }

    async fn list_mesas(&self) -> Result<Vec<i32>, StoreError> {
        Ok(self.state.lock().mesas.keys().copied().collect())
    }

    async fn count_mesa(&self, numero: i32) -> Result<TableStats, StoreError> {
        let state = self.state.lock();
        let mut stats = TableStats { numero, total_electores: 0, total_votantes: 0 };
        for record in state.roll.values().filter(|r| r.mesa_numero == Some(numero)) {
            stats.total_electores += 1;
            if record.voto_emitido {
                stats.total_votantes += 1;
            }
        }
        Ok(stats)
    }

    async fn write_mesa_stats(&self, stats: &TableStats) -> Result<(), StoreError> {
        if *self.fail_stats_writes.lock() {
            return Err(StoreError::PermissionDenied("mesas".to_string()));
        }
        let mut state = self.state.lock();
        match state.mesas.get_mut(&stats.numero) {
            Some(existing) => {
                *existing = *stats;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("mesa {}", stats.numero))),
        }
    }

    async fn count_roll(&self, filter: &ExportFilter) -> Result<i64, StoreError> {
        if let Some(count) = *self.count_override.lock() {
            return Ok(count);
        }
        let state = self.state.lock();
        Ok(state.roll.values().filter(|r| filter_matches(filter, r)).count() as i64)
    }

    async fn fetch_roll_page(
        &self,
        filter: &ExportFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RollRow>, StoreError> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        let mut matching: Vec<&RollRecord> =
            state.roll.values().filter(|r| filter_matches(filter, r)).collect();
        matching.sort_by_key(|r| roll_order(r));
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|r| Self::to_row(&state, r))
            .collect())
    }

    async fn search_roll(&self, search: &RollSearch) -> Result<(Vec<RollRow>, i64), StoreError> {
        let state = self.state.lock();
        let prefix = search.name_prefix.as_deref().map(str::to_lowercase);
        let mut matching: Vec<&RollRecord> = state
            .roll
            .values()
            .filter(|r| search.documento.map_or(true, |d| r.documento == d))
            .filter(|r| search.mesa_numero.map_or(true, |m| r.mesa_numero == Some(m)))
            .filter(|r| {
                prefix.as_deref().map_or(true, |p| {
                    r.apellido.to_lowercase().starts_with(p) || r.nombre.to_lowercase().starts_with(p)
                })
            })
            .collect();
        matching.sort_by_key(|r| roll_order(r));
        let total = matching.len() as i64;
        let rows = matching
            .into_iter()
            .skip(search.offset.max(0) as usize)
            .take(search.limit.max(0) as usize)
            .map(|r| Self::to_row(&state, r))
            .collect();
        Ok((rows, total))
    }

    async fn get_roll(&self, documento: i64) -> Result<Option<RollRow>, StoreError> {
        let state = self.state.lock();
        Ok(state.roll.get(&documento).map(|r| Self::to_row(&state, r)))
    }

    async fn set_vote(&self, documento: i64, mark: Option<VoteMark>) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let record = state
            .roll
            .get_mut(&documento)
            .ok_or_else(|| StoreError::NotFound(format!("documento {}", documento)))?;
        record.voto_emitido = mark.is_some();
        record.fecha_voto = mark.map(|m| m.at);
        record.voto_registrado_por = mark.map(|m| m.by);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VoteStatusFilter;

    #[test]
    fn test_mesa_range_excludes_unassigned() {
        let filter = ExportFilter {
            mesa_from: Some(1000),
            mesa_to: Some(1005),
            ..Default::default()
        };
        assert!(filter_matches(&filter, &RollRecord::sample(1, Some(1000))));
        assert!(filter_matches(&filter, &RollRecord::sample(1, Some(1005))));
        assert!(!filter_matches(&filter, &RollRecord::sample(1, Some(1006))));
        assert!(!filter_matches(&filter, &RollRecord::sample(1, None)));
    }

    #[test]
    fn test_vote_status_filter() {
        let mut voted = RollRecord::sample(1, Some(1));
        voted.voto_emitido = true;
        let filter = ExportFilter {
            vote_status: VoteStatusFilter::NotVoted,
            ..Default::default()
        };
        assert!(!filter_matches(&filter, &voted));
        assert!(filter_matches(&filter, &RollRecord::sample(2, Some(1))));
    }

    #[test]
    fn test_pick_and_class_filters() {
        let mut record = RollRecord::sample(1, Some(1));
        record.emopick_id = Some(7);
        record.clase = Some(1980);

        let pick = ExportFilter { emopick_id: Some(7), ..Default::default() };
        assert!(filter_matches(&pick, &record));
        let other_pick = ExportFilter { emopick_id: Some(8), ..Default::default() };
        assert!(!filter_matches(&other_pick, &record));

        let clase = ExportFilter { clase_from: Some(1981), ..Default::default() };
        assert!(!filter_matches(&clase, &record));
        let clase = ExportFilter { clase_to: Some(1980), ..Default::default() };
        assert!(filter_matches(&clase, &record));

        record.clase = None;
        assert!(!filter_matches(&clase, &record));
    }

    #[tokio::test]
    async fn test_pages_follow_table_then_order() {
        let store = MemoryStore::with_mesas([1, 2]);
        let mut a = RollRecord::sample(30, Some(2));
        a.orden = Some(1);
        let mut b = RollRecord::sample(20, Some(1));
        b.orden = Some(2);
        let mut c = RollRecord::sample(10, Some(1));
        c.orden = Some(3);
        let d = RollRecord::sample(5, None);
        store.seed([a, b, c, d]);

        let rows = store.fetch_roll_page(&ExportFilter::default(), 0, 10).await.unwrap();
        let docs: Vec<i64> = rows.iter().map(|r| r.record.documento).collect();
        assert_eq!(docs, vec![20, 10, 30, 5]);
    }

    #[tokio::test]
    async fn test_upsert_rejects_unknown_mesa() {
        let store = MemoryStore::with_mesas([1]);
        let err = store
            .upsert_roll(&[RollRecord::sample(1, Some(99))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));
        assert_eq!(store.roll_len(), 0);
    }
}
