//! Error taxonomy for the roll pipeline and the store behind it

use thiserror::Error;

/// SQLSTATE reported by Postgres when row-level security or grants refuse an operation.
const SQLSTATE_INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Failure reported by the backing store.
///
/// Constraint violations and permission failures are kept apart so callers
/// can tell a bad row from a missing grant.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Constraint violation ({code}): {message}")]
    Constraint { code: String, message: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Machine-readable code for the NATS error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Constraint { .. } => "CONSTRAINT_VIOLATION",
            StoreError::PermissionDenied(_) => "FORBIDDEN",
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::Backend(_) => "STORE_ERROR",
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
                if code.starts_with("23") {
                    StoreError::Constraint {
                        code,
                        message: db.message().to_string(),
                    }
                } else if code == SQLSTATE_INSUFFICIENT_PRIVILEGE {
                    StoreError::PermissionDenied(db.message().to_string())
                } else {
                    StoreError::Backend(err.to_string())
                }
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// The uploaded file could not be turned into records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("El archivo está vacío")]
    Empty,

    #[error("El archivo no contiene filas de datos")]
    NoDataRows,

    #[error("Formato de archivo no soportado: {0}")]
    UnsupportedFormat(String),

    #[error("El archivo supera el tamaño máximo ({size} bytes, máximo {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Faltan columnas obligatorias: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Los encabezados deben estar en la fila 1 (encontrados en la fila {row})")]
    MisplacedHeader { row: u32 },

    #[error("No se pudo leer la planilla: {0}")]
    Workbook(String),

    #[error("No se pudo leer el CSV: {0}")]
    Csv(String),
}

/// Statistics recomputation failed after a committed import.
///
/// Never fatal: the import stands and this becomes a warning.
#[derive(Error, Debug)]
#[error("No se pudieron recalcular las estadísticas de mesa {mesa:?}: {source}")]
pub struct StatsRecalcError {
    pub mesa: Option<i32>,
    #[source]
    pub source: StoreError,
}

/// Errors surfaced by import, export and vote operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Importación bloqueada: {count} errores de validación")]
    Validation { count: usize },

    #[error("Fila {row}: no se puede normalizar ({reason})")]
    Normalize { row: u32, reason: String },

    #[error("Falló el lote {batch} de {batches}: {source}")]
    Batch {
        batch: usize,
        batches: usize,
        #[source]
        source: StoreError,
    },

    #[error("La exportación supera el máximo permitido ({actual} filas, máximo {ceiling})")]
    ExportCeiling { ceiling: i64, actual: i64 },

    #[error("La exportación de {count} filas requiere confirmación (umbral {threshold})")]
    ConfirmationRequired { count: i64, threshold: i64 },

    #[error("Permiso denegado: {0}")]
    PermissionDenied(String),

    #[error("No se pudo generar el archivo: {0}")]
    Output(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Machine-readable code for the NATS error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => "PARSE_ERROR",
            PipelineError::Validation { .. } => "VALIDATION_FAILED",
            PipelineError::Normalize { .. } => "NORMALIZE_ERROR",
            PipelineError::Batch { .. } => "BATCH_FAILED",
            PipelineError::ExportCeiling { .. } => "EXPORT_CEILING",
            PipelineError::ConfirmationRequired { .. } => "CONFIRMATION_REQUIRED",
            PipelineError::PermissionDenied(_) => "FORBIDDEN",
            PipelineError::Output(_) => "OUTPUT_ERROR",
            PipelineError::Store(e) => e.code(),
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Output(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for PipelineError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        PipelineError::Output(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_lists_every_column() {
        let err = ParseError::MissingColumns(vec!["documento".to_string(), "orden".to_string()]);
        assert_eq!(err.to_string(), "Faltan columnas obligatorias: documento, orden");
    }

    #[test]
    fn test_batch_error_names_failing_batch() {
        let err = PipelineError::Batch {
            batch: 3,
            batches: 7,
            source: StoreError::Backend("timeout".to_string()),
        };
        assert!(err.to_string().contains("lote 3 de 7"));
        assert_eq!(err.code(), "BATCH_FAILED");
    }

    #[test]
    fn test_export_ceiling_names_ceiling_and_actual() {
        let err = PipelineError::ExportCeiling { ceiling: 350_000, actual: 350_001 };
        let msg = err.to_string();
        assert!(msg.contains("350000"));
        assert!(msg.contains("350001"));
    }

    #[test]
    fn test_store_error_code_passes_through() {
        let err = PipelineError::from(StoreError::PermissionDenied("rls".to_string()));
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
