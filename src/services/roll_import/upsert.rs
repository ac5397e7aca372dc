//! Sequential batched upsert of normalized records

use std::time::Duration;

use tracing::{debug, error};

use crate::error::PipelineError;
use crate::services::progress::ProgressSink;
use crate::store::RollStore;
use crate::types::{BatchProgress, RollRecord};

/// Records written per store call.
pub const BATCH_SIZE: usize = 500;
/// Default pause between batches.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(100);

/// Counts from a finished upsert run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: u32,
    pub updated: u32,
    pub batches: usize,
}

/// Write `records` in batches, one after another. Each batch first asks the
/// store which documents already exist so inserts and updates can be told
/// apart. A failing batch stops the run; earlier batches stay written.
pub async fn upsert_batches(
    store: &dyn RollStore,
    records: &[RollRecord],
    batch_size: usize,
    pause: Duration,
    progress: &dyn ProgressSink,
) -> Result<UpsertSummary, PipelineError> {
    let batch_size = batch_size.max(1);
    let total = records.len();
    let batches = total.div_ceil(batch_size);
    let mut summary = UpsertSummary { batches, ..Default::default() };
    let mut processed = 0usize;

    for (index, chunk) in records.chunks(batch_size).enumerate() {
        let batch = index + 1;
        let documentos: Vec<i64> = chunk.iter().map(|r| r.documento).collect();

        let existing = store
            .existing_documents(&documentos)
            .await
            .map_err(|source| PipelineError::Batch { batch, batches, source })?;

        if let Err(source) = store.upsert_roll(chunk).await {
            error!("Batch {}/{} failed: {}", batch, batches, source);
            return Err(PipelineError::Batch { batch, batches, source });
        }

        let updated = existing.len() as u32;
        summary.updated += updated;
        summary.inserted += chunk.len() as u32 - updated;
        processed += chunk.len();

        debug!("Batch {}/{} written ({} updated)", batch, batches, updated);
        progress
            .on_batch(&BatchProgress {
                batch,
                batches,
                processed,
                total,
                inserted: summary.inserted,
                updated: summary.updated,
            })
            .await;

        if batch < batches && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    Ok(summary)
}
