//! Roll import pipeline
//!
//! parse -> structural rules + in-file duplicates -> referential integrity
//! -> (caller confirms) -> normalize -> batched upsert -> table statistics.
//!
//! The file is the unit of work: [`RollImporter::commit`] re-runs the whole
//! validation instead of trusting an earlier [`RollImporter::validate`].

pub mod duplicates;
pub mod integrity;
pub mod normalizer;
pub mod parser;
pub mod report;
pub mod rules;
pub mod upsert;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::services::progress::{Phase, ProgressSink};
use crate::services::stats;
use crate::store::RollStore;
use crate::types::{
    ImportFile, ImportIssue, ImportOutcome, ParsedFile, RawRecord, Session, ValidationOutcome,
    TIER_SUPERVISOR,
};

pub use report::{error_report_csv, template_csv, TEMPLATE_FILENAME};
pub use upsert::{BATCH_SIZE, DEFAULT_BATCH_PAUSE};

/// Row number of the first data row; the header is row 1.
const FIRST_DATA_ROW: u32 = 2;

/// Tunables for the write phase
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub batch_pause: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            batch_pause: DEFAULT_BATCH_PAUSE,
        }
    }
}

/// Validates and commits roll files against a store
pub struct RollImporter {
    store: Arc<dyn RollStore>,
    options: ImportOptions,
    /// Commits run one at a time.
    run_lock: Mutex<()>,
}

/// Validation result plus the records it cleared, in file order.
struct Checked<'a> {
    outcome: ValidationOutcome,
    valid: Vec<(u32, &'a RawRecord)>,
}

impl RollImporter {
    pub fn new(store: Arc<dyn RollStore>, options: ImportOptions) -> Self {
        Self {
            store,
            options,
            run_lock: Mutex::new(()),
        }
    }

    /// Parse and check a file without writing anything.
    pub async fn validate(&self, file: &ImportFile) -> Result<ValidationOutcome, PipelineError> {
        let parsed = parser::parse_file(file)?;
        let checked = self.check(&file.filename, &parsed).await?;
        info!(
            "Validated {}: {} rows, {} valid, {} issues",
            file.filename, checked.outcome.total_rows, checked.outcome.valid_rows, checked.outcome.issue_count
        );
        Ok(checked.outcome)
    }

    /// Validate again, then write the file. Refused while any issue exists.
    pub async fn commit(
        &self,
        file: &ImportFile,
        session: &Session,
        progress: &dyn ProgressSink,
    ) -> Result<ImportOutcome, PipelineError> {
        session.require_tier(TIER_SUPERVISOR, "Importar el padrón")?;
        let _guard = self.run_lock.lock().await;
        let run_started = Utc::now();

        progress.on_phase(Phase::Validating).await;
        let parsed = parser::parse_file(file)?;
        let checked = self.check(&file.filename, &parsed).await?;
        if !checked.outcome.is_clean() {
            warn!(
                "Import of {} refused: {} validation issues",
                file.filename, checked.outcome.issue_count
            );
            return Err(PipelineError::Validation { count: checked.outcome.issue_count });
        }

        let records = checked
            .valid
            .iter()
            .map(|(row, raw)| normalizer::normalize(raw, *row, run_started))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Importing {} records from {} for user {}",
            records.len(),
            file.filename,
            session.user_id
        );
        let summary = upsert::upsert_batches(
            self.store.as_ref(),
            &records,
            self.options.batch_size,
            self.options.batch_pause,
            progress,
        )
        .await?;

        progress.on_phase(Phase::Recalculating).await;
        let stats_warning = match stats::recalculate_table_stats(self.store.as_ref()).await {
            Ok(_) => None,
            Err(e) => {
                warn!("Import committed but statistics were not updated: {}", e);
                Some(e.to_string())
            }
        };

        info!(
            "Import of {} finished: {} inserted, {} updated in {} batches",
            file.filename, summary.inserted, summary.updated, summary.batches
        );
        Ok(ImportOutcome {
            inserted: summary.inserted,
            updated: summary.updated,
            batches: summary.batches,
            stats_warning,
        })
    }

    /// Run every check over a parsed file.
    ///
    /// Duplicates and integrity are only checked for records that passed the
    /// structural rules.
    async fn check<'a>(&self, filename: &str, parsed: &'a ParsedFile) -> Result<Checked<'a>, PipelineError> {
        let current_year = Utc::now().year();
        let mut issues: Vec<ImportIssue> = Vec::new();
        let mut structurally_valid = Vec::new();

        for (index, record) in parsed.records.iter().enumerate() {
            let row = FIRST_DATA_ROW + index as u32;
            let found = rules::validate_structure(record, row, current_year);
            if found.is_empty() {
                structurally_valid.push((row, record));
            } else {
                issues.extend(found);
            }
        }

        let duplicates = duplicates::find_duplicates(structurally_valid.iter().copied());
        let duplicate_rows: HashSet<u32> = duplicates.iter().map(|d| d.row_number).collect();
        let refs = self.store.reference_sets().await?;

        let mut valid = Vec::with_capacity(structurally_valid.len());
        for (row, record) in structurally_valid {
            let integrity = integrity::check_integrity(record, row, &refs);
            if integrity.is_empty() && !duplicate_rows.contains(&row) {
                valid.push((row, record));
            }
            issues.extend(integrity);
        }
        issues.extend(duplicates);
        issues.sort_by_key(|i| i.row_number);

        let outcome = ValidationOutcome::new(filename, parsed.records.len(), valid.len(), issues);
        Ok(Checked { outcome, valid })
    }
}
