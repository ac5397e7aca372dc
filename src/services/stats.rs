//! Table statistics recomputation
//!
//! `mesas.total_electores` and `mesas.total_votantes` are caches over the
//! roll. They are rebuilt for every table after an import and for a single
//! table after a vote is marked or cleared.

use tracing::{debug, info};

use crate::error::{StatsRecalcError, StoreError};
use crate::store::RollStore;
use crate::types::TableStats;

/// Recount one table and overwrite its cached values.
pub async fn refresh_table(store: &dyn RollStore, numero: i32) -> Result<TableStats, StatsRecalcError> {
    let wrap = |source: StoreError| StatsRecalcError { mesa: Some(numero), source };
    let stats = store.count_mesa(numero).await.map_err(wrap)?;
    store.write_mesa_stats(&stats).await.map_err(wrap)?;
    debug!(
        "Mesa {}: {} electores, {} votantes",
        numero, stats.total_electores, stats.total_votantes
    );
    Ok(stats)
}

/// Recount every table in the store. Returns the number of tables updated.
pub async fn recalculate_table_stats(store: &dyn RollStore) -> Result<usize, StatsRecalcError> {
    let mesas = store
        .list_mesas()
        .await
        .map_err(|source| StatsRecalcError { mesa: None, source })?;

    for numero in &mesas {
        refresh_table(store, *numero).await?;
    }

    info!("Recalculated statistics for {} tables", mesas.len());
    Ok(mesas.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::types::RollRecord;

    #[tokio::test]
    async fn test_every_table_recounted() {
        let store = MemoryStore::with_mesas([1000, 1001, 1002]);
        let mut voted = RollRecord::sample(2, Some(1000));
        voted.voto_emitido = true;
        store.seed([
            RollRecord::sample(1, Some(1000)),
            voted,
            RollRecord::sample(3, Some(1001)),
            RollRecord::sample(4, None),
        ]);

        let updated = recalculate_table_stats(&store).await.unwrap();
        assert_eq!(updated, 3);

        let m1000 = store.mesa_stats(1000).unwrap();
        assert_eq!((m1000.total_electores, m1000.total_votantes), (2, 1));
        let m1001 = store.mesa_stats(1001).unwrap();
        assert_eq!((m1001.total_electores, m1001.total_votantes), (1, 0));
        let m1002 = store.mesa_stats(1002).unwrap();
        assert_eq!((m1002.total_electores, m1002.total_votantes), (0, 0));
    }

    #[tokio::test]
    async fn test_write_failure_names_table() {
        let store = MemoryStore::with_mesas([1000]);
        *store.fail_stats_writes.lock() = true;
        let err = recalculate_table_stats(&store).await.unwrap_err();
        assert_eq!(err.mesa, Some(1000));
    }
}
