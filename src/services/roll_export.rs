//! Roll export pipeline
//!
//! count -> ceiling / confirmation gate -> paged fetch -> shape -> file.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::services::export_writer::{export_filename, ExportWriter};
use crate::services::progress::{Phase, ProgressSink};
use crate::store::RollStore;
use crate::types::{
    ExportFile, ExportFilter, ExportPreflight, ExportRequest, PageProgress, Session,
    EXPORT_CONFIRM_THRESHOLD, EXPORT_HARD_CEILING, EXPORT_PAGE_SIZE, TIER_SUPERVISOR,
};

/// Produces export files from the roll
pub struct RollExporter {
    store: Arc<dyn RollStore>,
    page_size: i64,
}

impl RollExporter {
    pub fn new(store: Arc<dyn RollStore>) -> Self {
        Self {
            store,
            page_size: EXPORT_PAGE_SIZE,
        }
    }

    /// Count matching rows and report whether the export may run.
    pub async fn preflight(
        &self,
        filter: &ExportFilter,
        session: &Session,
    ) -> Result<ExportPreflight, PipelineError> {
        session.require_tier(TIER_SUPERVISOR, "Exportar el padrón")?;
        let count = self.store.count_roll(filter).await?;
        Ok(ExportPreflight {
            count,
            needs_confirmation: count > EXPORT_CONFIRM_THRESHOLD,
            ceiling: EXPORT_HARD_CEILING,
        })
    }

    /// Run an export. Nothing is fetched when the count exceeds the ceiling
    /// or needs a confirmation the request lacks.
    pub async fn export(
        &self,
        request: &ExportRequest,
        session: &Session,
        progress: &dyn ProgressSink,
    ) -> Result<ExportFile, PipelineError> {
        session.require_tier(TIER_SUPERVISOR, "Exportar el padrón")?;
        let started = Utc::now();

        progress.on_phase(Phase::Counting).await;
        let total = self.store.count_roll(&request.filter).await?;
        if total > EXPORT_HARD_CEILING {
            warn!("Export refused: {} rows exceeds ceiling {}", total, EXPORT_HARD_CEILING);
            return Err(PipelineError::ExportCeiling {
                ceiling: EXPORT_HARD_CEILING,
                actual: total,
            });
        }
        if total > EXPORT_CONFIRM_THRESHOLD && !request.confirmed {
            return Err(PipelineError::ConfirmationRequired {
                count: total,
                threshold: EXPORT_CONFIRM_THRESHOLD,
            });
        }

        info!(
            "Exporting {} rows ({} {}) for user {}",
            total,
            request.mode.as_str(),
            request.format.extension(),
            session.user_id
        );

        let mut writer = ExportWriter::new(request.mode, request.format)?;
        let pages = ((total + self.page_size - 1) / self.page_size) as usize;
        for page in 0..pages {
            let offset = page as i64 * self.page_size;
            let rows = self
                .store
                .fetch_roll_page(&request.filter, offset, self.page_size)
                .await?;
            writer.write_rows(&rows)?;

            progress
                .on_page(&PageProgress {
                    page: page + 1,
                    pages,
                    fetched: writer.rows(),
                    total: total as usize,
                })
                .await;

            // Rows deleted since the count
            if (rows.len() as i64) < self.page_size {
                break;
            }
        }

        progress.on_phase(Phase::Writing).await;
        let rows = writer.rows();
        let bytes = writer.finish()?;
        let filename = export_filename(request.mode, request.format, started);
        info!("Export {} ready: {} rows, {} bytes", filename, rows, bytes.len());

        Ok(ExportFile {
            filename,
            content_type: request.format.content_type(),
            bytes,
            rows,
        })
    }
}
