//! Background import jobs
//!
//! A commit request starts a job whose id is the request id. The worker
//! answers at once and then publishes the job's progress on
//! `pickpad.job.import.status.{job_id}`.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_nats::Client;
use async_trait::async_trait;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::progress::{Phase, ProgressSink};
use crate::services::roll_import::RollImporter;
use crate::types::{
    BatchProgress, ImportFile, ImportJobStatus, JobStatusUpdate, JobSubmitted, PageProgress,
    Session,
};

const STATUS_PREFIX: &str = "pickpad.job.import.status";

pub fn status_subject(job_id: Uuid) -> String {
    format!("{}.{}", STATUS_PREFIX, job_id)
}

/// Runs roll imports off the request path
pub struct ImportProcessor {
    client: Client,
    importer: Arc<RollImporter>,
}

impl ImportProcessor {
    pub fn new(client: Client, importer: Arc<RollImporter>) -> Self {
        Self { client, importer }
    }

    /// Start an import in the background.
    pub fn submit_job(self: &Arc<Self>, job_id: Uuid, file: ImportFile, session: Session) -> JobSubmitted {
        info!(
            "Import job {} submitted: {} ({} bytes) by {}",
            job_id,
            file.filename,
            file.bytes.len(),
            session.user_id
        );

        let processor = Arc::clone(self);
        tokio::spawn(async move {
            processor.process_job(job_id, file, session).await;
        });

        JobSubmitted {
            job_id,
            status_subject: status_subject(job_id),
        }
    }

    /// Publish an import job status update
    pub async fn publish_status(&self, job_id: Uuid, status: ImportJobStatus) -> Result<()> {
        let update = JobStatusUpdate::new(job_id, status);
        let payload = serde_json::to_vec(&update)?;
        self.client.publish(status_subject(job_id), payload.into()).await?;
        Ok(())
    }

    async fn publish_or_log(&self, job_id: Uuid, status: ImportJobStatus) {
        if let Err(e) = self.publish_status(job_id, status).await {
            warn!("Failed to publish import status for job {}: {}", job_id, e);
        }
    }

    async fn process_job(&self, job_id: Uuid, file: ImportFile, session: Session) {
        let start_time = Instant::now();
        let progress = JobProgress { processor: self, job_id };

        let result = self.importer.commit(&file, &session, &progress).await;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        match result {
            Ok(outcome) => {
                info!(
                    "Import job {} completed in {}ms: {} inserted, {} updated",
                    job_id, duration_ms, outcome.inserted, outcome.updated
                );
                self.publish_or_log(
                    job_id,
                    ImportJobStatus::Completed {
                        inserted: outcome.inserted,
                        updated: outcome.updated,
                        batches: outcome.batches,
                        stats_warning: outcome.stats_warning,
                        duration_ms,
                    },
                )
                .await;
            }
            Err(e) => {
                error!("Import job {} failed: {}", job_id, e);
                self.publish_or_log(
                    job_id,
                    ImportJobStatus::Failed {
                        code: e.code().to_string(),
                        error: e.to_string(),
                    },
                )
                .await;
            }
        }
    }
}

/// Forwards pipeline progress to the job status subject
struct JobProgress<'a> {
    processor: &'a ImportProcessor,
    job_id: Uuid,
}

#[async_trait]
impl<'a> ProgressSink for JobProgress<'a> {
    async fn on_phase(&self, phase: Phase) {
        let status = match phase {
            Phase::Validating => ImportJobStatus::Validating,
            Phase::Recalculating => ImportJobStatus::Recalculating,
            Phase::Counting | Phase::Writing => return,
        };
        self.processor.publish_or_log(self.job_id, status).await;
    }

    async fn on_batch(&self, progress: &BatchProgress) {
        self.processor
            .publish_or_log(self.job_id, ImportJobStatus::Importing(*progress))
            .await;
    }

    async fn on_page(&self, _progress: &PageProgress) {}
}
