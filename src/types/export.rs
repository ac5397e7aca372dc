//! Roll export request types

use serde::{Deserialize, Serialize};

/// Rows fetched per page during an export.
pub const EXPORT_PAGE_SIZE: i64 = 1_000;
/// Exports matching more rows than this are refused outright.
pub const EXPORT_HARD_CEILING: i64 = 350_000;
/// Exports matching more rows than this need explicit confirmation.
pub const EXPORT_CONFIRM_THRESHOLD: i64 = 50_000;

/// Vote status filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStatusFilter {
    #[default]
    All,
    Voted,
    NotVoted,
}

impl VoteStatusFilter {
    /// The `voto_emitido` value to match, or `None` for no constraint.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            VoteStatusFilter::All => None,
            VoteStatusFilter::Voted => Some(true),
            VoteStatusFilter::NotVoted => Some(false),
        }
    }
}

/// Row filter shared by export count and page queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFilter {
    #[serde(default)]
    pub vote_status: VoteStatusFilter,
    #[serde(default)]
    pub emopick_id: Option<i32>,
    #[serde(default)]
    pub mesa_from: Option<i32>,
    #[serde(default)]
    pub mesa_to: Option<i32>,
    #[serde(default)]
    pub clase_from: Option<i32>,
    #[serde(default)]
    pub clase_to: Option<i32>,
}

/// Which columns an export carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Every column under its store name
    #[default]
    Raw,
    /// Curated subset with readable headers and values
    Curated,
}

impl ExportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportMode::Raw => "raw",
            ExportMode::Curated => "curated",
        }
    }
}

/// Output file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Export request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(default)]
    pub filter: ExportFilter,
    #[serde(default)]
    pub mode: ExportMode,
    #[serde(default)]
    pub format: ExportFormat,
    /// Caller has acknowledged an export above the confirmation threshold.
    #[serde(default)]
    pub confirmed: bool,
}

/// Count check run before an export starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPreflight {
    pub count: i64,
    pub needs_confirmation: bool,
    pub ceiling: i64,
}

/// A generated export file
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub rows: usize,
}

/// Export reply on the NATS surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDownload {
    #[serde(flatten)]
    pub file: super::FileResponse,
    pub rows: usize,
}
