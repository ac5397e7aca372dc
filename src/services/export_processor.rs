//! Export jobs with progress on `pickpad.job.export.status.{job_id}`
//!
//! The export runs inside the request; the finished file is the reply.
//! Progress is published while it runs so clients can show a bar.

use std::time::Instant;

use anyhow::Result;
use async_nats::Client;
use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::services::progress::{Phase, ProgressSink};
use crate::services::roll_export::RollExporter;
use crate::types::{
    BatchProgress, ExportFile, ExportJobStatus, ExportRequest, JobStatusUpdate, PageProgress,
    Session,
};

const STATUS_PREFIX: &str = "pickpad.job.export.status";

pub fn status_subject(job_id: Uuid) -> String {
    format!("{}.{}", STATUS_PREFIX, job_id)
}

pub struct ExportProcessor {
    client: Client,
    exporter: RollExporter,
}

impl ExportProcessor {
    pub fn new(client: Client, exporter: RollExporter) -> Self {
        Self { client, exporter }
    }

    pub fn exporter(&self) -> &RollExporter {
        &self.exporter
    }

    /// Publish an export job status update
    pub async fn publish_status(&self, job_id: Uuid, status: ExportJobStatus) -> Result<()> {
        let update = JobStatusUpdate::new(job_id, status);
        let payload = serde_json::to_vec(&update)?;
        self.client.publish(status_subject(job_id), payload.into()).await?;
        Ok(())
    }

    async fn publish_or_log(&self, job_id: Uuid, status: ExportJobStatus) {
        if let Err(e) = self.publish_status(job_id, status).await {
            warn!("Failed to publish export status for job {}: {}", job_id, e);
        }
    }

    /// Run one export, publishing progress and the final status.
    pub async fn run_job(
        &self,
        job_id: Uuid,
        request: &ExportRequest,
        session: &Session,
    ) -> Result<ExportFile, PipelineError> {
        let start_time = Instant::now();
        let progress = JobProgress { processor: self, job_id };

        let result = self.exporter.export(request, session, &progress).await;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        let status = match &result {
            Ok(file) => {
                info!("Export job {} completed in {}ms: {} rows", job_id, duration_ms, file.rows);
                ExportJobStatus::Completed {
                    rows: file.rows,
                    filename: file.filename.clone(),
                    size_bytes: file.bytes.len() as u64,
                    duration_ms,
                }
            }
            Err(e) => {
                warn!("Export job {} failed: {}", job_id, e);
                ExportJobStatus::Failed {
                    code: e.code().to_string(),
                    error: e.to_string(),
                }
            }
        };
        self.publish_or_log(job_id, status).await;
        result
    }
}

struct JobProgress<'a> {
    processor: &'a ExportProcessor,
    job_id: Uuid,
}

#[async_trait]
impl<'a> ProgressSink for JobProgress<'a> {
    async fn on_phase(&self, phase: Phase) {
        let status = match phase {
            Phase::Counting => ExportJobStatus::Counting,
            Phase::Writing => ExportJobStatus::Writing,
            Phase::Validating | Phase::Recalculating => return,
        };
        self.processor.publish_or_log(self.job_id, status).await;
    }

    async fn on_batch(&self, _progress: &BatchProgress) {}

    async fn on_page(&self, progress: &PageProgress) {
        self.processor
            .publish_or_log(self.job_id, ExportJobStatus::Fetching(*progress))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_prefix() {
        assert!(status_subject(Uuid::nil()).starts_with("pickpad.job.export.status."));
    }
}
