//! Roll import types: files, issues and outcomes

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Maximum accepted upload size (100 MB).
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Issues returned inline; the full list goes to the error report.
pub const ISSUE_PREVIEW_LIMIT: usize = 100;

/// Declared format of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

/// An uploaded roll file
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Parser output: header names plus one map per data row.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub records: Vec<super::RawRecord>,
}

/// Which pass produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportIssueKind {
    Structural,
    Duplicate,
    Integrity,
}

/// Single validation issue for one field of one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportIssue {
    /// 1-based file row; the header is row 1.
    pub row_number: u32,
    pub kind: ImportIssueKind,
    pub field: String,
    pub value: String,
    pub message: String,
}

impl ImportIssue {
    pub fn new(
        row_number: u32,
        kind: ImportIssueKind,
        field: &str,
        value: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_number,
            kind,
            field: field.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

/// Result of a validation pass over a whole file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub filename: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub issue_count: usize,
    /// First issues, capped at [`ISSUE_PREVIEW_LIMIT`].
    pub preview: Vec<ImportIssue>,
    #[serde(skip)]
    pub issues: Vec<ImportIssue>,
}

impl ValidationOutcome {
    pub fn new(filename: &str, total_rows: usize, valid_rows: usize, issues: Vec<ImportIssue>) -> Self {
        Self {
            filename: filename.to_string(),
            total_rows,
            valid_rows,
            issue_count: issues.len(),
            preview: issues.iter().take(ISSUE_PREVIEW_LIMIT).cloned().collect(),
            issues,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count == 0
    }

    pub fn truncated(&self) -> bool {
        self.issue_count > self.preview.len()
    }
}

/// Result of a committed import
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub inserted: u32,
    pub updated: u32,
    pub batches: usize,
    /// Set when table statistics could not be recomputed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_warning: Option<String>,
}

/// Upload payload used on the NATS surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportUploadRequest {
    pub filename: String,
    pub file_base64: String,
}

impl ImportUploadRequest {
    pub fn into_file(self) -> Result<ImportFile, base64::DecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(self.file_base64.trim())?;
        Ok(ImportFile::new(self.filename, bytes))
    }
}

/// Validation reply with the downloadable error report attached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_report_base64: Option<String>,
}

/// Generic downloadable file reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub filename: String,
    pub content_type: String,
    pub file_base64: String,
    pub size_bytes: u64,
}

impl FileResponse {
    pub fn from_bytes(filename: impl Into<String>, content_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            file_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            size_bytes: bytes.len() as u64,
        }
    }
}
