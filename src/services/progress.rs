//! Progress reporting for long-running imports and exports

use async_trait::async_trait;
use tracing::{debug, info};

use crate::types::{BatchProgress, PageProgress};

/// Pipeline step boundaries that carry no counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    Recalculating,
    Counting,
    Writing,
}

/// Receives cumulative progress after every import batch and export page.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_phase(&self, _phase: Phase) {}
    async fn on_batch(&self, progress: &BatchProgress);
    async fn on_page(&self, progress: &PageProgress);
}

/// Writes progress to the log; used by the CLI.
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn on_phase(&self, phase: Phase) {
        debug!("Phase: {:?}", phase);
    }

    async fn on_batch(&self, p: &BatchProgress) {
        info!(
            "Lote {}/{}: {}/{} filas ({}%), {} nuevas, {} actualizadas",
            p.batch, p.batches, p.processed, p.total, p.percent(), p.inserted, p.updated
        );
    }

    async fn on_page(&self, p: &PageProgress) {
        info!(
            "Página {}/{}: {}/{} filas ({}%)",
            p.page, p.pages, p.fetched, p.total, p.percent()
        );
    }
}
