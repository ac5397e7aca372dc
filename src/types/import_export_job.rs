//! Import/Export job status types
//!
//! Progress for a running import or export is published as a stream of
//! status updates keyed by the job id (the id of the request that started it).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================================================
// Tests First (TDD)
// ==========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_status_importing_serializes() {
        let status = ImportJobStatus::Importing(BatchProgress {
            batch: 1,
            batches: 2,
            processed: 500,
            total: 501,
            inserted: 480,
            updated: 20,
        });
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"type\":\"importing\""));
        assert!(json.contains("\"processed\":500"));
        assert!(json.contains("\"percent\":99"));
    }

    #[test]
    fn test_import_status_completed_serializes() {
        let status = ImportJobStatus::Completed {
            inserted: 10,
            updated: 2,
            batches: 1,
            stats_warning: None,
            duration_ms: 120,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("completed"));
        assert!(json.contains("durationMs"));
        assert!(!json.contains("statsWarning"));
    }

    #[test]
    fn test_export_status_fetching_serializes() {
        let status = ExportJobStatus::Fetching(PageProgress {
            page: 3,
            pages: 4,
            fetched: 3000,
            total: 3500,
        });
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("fetching"));
        assert!(json.contains("\"percent\":85"));
    }

    #[test]
    fn test_batch_progress_percent_handles_empty() {
        let progress = BatchProgress {
            batch: 0,
            batches: 0,
            processed: 0,
            total: 0,
            inserted: 0,
            updated: 0,
        };
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_status_update_wraps_job_id() {
        let job_id = Uuid::new_v4();
        let update = JobStatusUpdate::new(job_id, ExportJobStatus::Counting);
        assert_eq!(update.job_id, job_id);
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("jobId"));
        assert!(json.contains("counting"));
    }
}

// ==========================================================================
// Progress payloads
// ==========================================================================

fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

/// Cumulative progress after one import batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// 1-based index of the batch just written
    pub batch: usize,
    pub batches: usize,
    pub processed: usize,
    pub total: usize,
    pub inserted: u32,
    pub updated: u32,
}

impl BatchProgress {
    pub fn percent(&self) -> u8 {
        percent_of(self.processed, self.total)
    }
}

impl Serialize for BatchProgress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("BatchProgress", 7)?;
        s.serialize_field("batch", &self.batch)?;
        s.serialize_field("batches", &self.batches)?;
        s.serialize_field("processed", &self.processed)?;
        s.serialize_field("total", &self.total)?;
        s.serialize_field("inserted", &self.inserted)?;
        s.serialize_field("updated", &self.updated)?;
        s.serialize_field("percent", &self.percent())?;
        s.end()
    }
}

/// Cumulative progress after one export page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageProgress {
    /// 1-based index of the page just fetched
    pub page: usize,
    pub pages: usize,
    pub fetched: usize,
    pub total: usize,
}

impl PageProgress {
    pub fn percent(&self) -> u8 {
        percent_of(self.fetched, self.total)
    }
}

impl Serialize for PageProgress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("PageProgress", 5)?;
        s.serialize_field("page", &self.page)?;
        s.serialize_field("pages", &self.pages)?;
        s.serialize_field("fetched", &self.fetched)?;
        s.serialize_field("total", &self.total)?;
        s.serialize_field("percent", &self.percent())?;
        s.end()
    }
}

// ==========================================================================
// Import Job Types
// ==========================================================================

/// Status of an import job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImportJobStatus {
    /// Parsing and validating the file
    Validating,
    /// A batch has been written
    Importing(BatchProgress),
    /// Recomputing table aggregates
    Recalculating,
    /// Job completed
    #[serde(rename_all = "camelCase")]
    Completed {
        inserted: u32,
        updated: u32,
        batches: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats_warning: Option<String>,
        duration_ms: u64,
    },
    /// Job failed; batches before the failure stay committed
    #[serde(rename_all = "camelCase")]
    Failed {
        code: String,
        error: String,
    },
}

// ==========================================================================
// Export Job Types
// ==========================================================================

/// Status of an export job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExportJobStatus {
    /// Counting matching rows
    Counting,
    /// A page has been fetched
    Fetching(PageProgress),
    /// Serializing the output file
    Writing,
    /// Job completed
    #[serde(rename_all = "camelCase")]
    Completed {
        rows: usize,
        filename: String,
        size_bytes: u64,
        duration_ms: u64,
    },
    /// Job failed
    #[serde(rename_all = "camelCase")]
    Failed {
        code: String,
        error: String,
    },
}

/// Status update envelope published on the job status subject
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusUpdate<S> {
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: S,
}

impl<S> JobStatusUpdate<S> {
    pub fn new(job_id: Uuid, status: S) -> Self {
        Self {
            job_id,
            timestamp: Utc::now(),
            status,
        }
    }
}

/// Reply to a request that started a background job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmitted {
    pub job_id: Uuid,
    pub status_subject: String,
}
