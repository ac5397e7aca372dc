//! Structural validation rules for roll records
//!
//! Each column has one entry in [`RULES`]: whether it is required, and the
//! check its non-empty value must pass. No store access happens here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::{Uuid, Variant};

use crate::types::columns::*;
use crate::types::{ImportIssue, ImportIssueKind, RawRecord};

/// Lowest accepted birth-year class.
pub const MIN_CLASE: i32 = 1900;
/// Classes may run this many years past the current one.
pub const CLASE_YEARS_AHEAD: i32 = 10;

/// Parse an integer cell.
pub fn parse_int<T: std::str::FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

/// Parse a boolean cell (true/false, 1/0, sí/si/no, yes).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "sí" | "si" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a timestamp cell. Values without an offset are read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%d/%m/%Y %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Parse a UUID in its hyphenated textual form, version 4 only.
pub fn parse_uuid_v4(value: &str) -> Option<Uuid> {
    let value = value.trim();
    if value.len() != 36 {
        return None;
    }
    Uuid::parse_str(value)
        .ok()
        .filter(|id| id.get_version_num() == 4 && id.get_variant() == Variant::RFC4122)
}

/// Value check applied to a non-empty cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Free text, anything goes
    Text,
    PositiveInteger,
    Integer,
    /// Integer in [MIN_CLASE, current year + CLASE_YEARS_AHEAD]
    Clase,
    Sexo,
    Boolean,
    UuidV4,
    Timestamp,
}

/// One column's structural rule
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    pub check: Check,
}

const fn rule(field: &'static str, required: bool, check: Check) -> FieldRule {
    FieldRule { field, required, check }
}

/// Rule table, in report order.
pub const RULES: &[FieldRule] = &[
    rule(DOCUMENTO, true, Check::PositiveInteger),
    rule(APELLIDO, false, Check::Text),
    rule(NOMBRE, false, Check::Text),
    rule(SEXO, false, Check::Sexo),
    rule(CLASE, false, Check::Clase),
    rule(DOMICILIO, false, Check::Text),
    rule(MESA_NUMERO, false, Check::Integer),
    rule(ORDEN, false, Check::Integer),
    rule(NUEVO_ELECTOR, false, Check::Boolean),
    rule(VOTO_OBLIGATORIO, false, Check::Boolean),
    rule(OBSERVACIONES, false, Check::Text),
    rule(EMOPICK_ID, false, Check::Integer),
    rule(PICK_OBSERVACION, false, Check::Text),
    rule(PICK_VERIFICADO, false, Check::Boolean),
    rule(VOTO_EMITIDO, false, Check::Boolean),
    rule(FECHA_VOTO, false, Check::Timestamp),
    rule(VOTO_REGISTRADO_POR, false, Check::UuidV4),
    rule(PICK_REGISTRADO_POR, false, Check::UuidV4),
    rule(VOTO_VERIFICADO_POR, false, Check::UuidV4),
];

impl FieldRule {
    /// Error message for a failing non-empty value, or `None` when it passes.
    fn violation(&self, value: &str, current_year: i32) -> Option<String> {
        let max_clase = current_year + CLASE_YEARS_AHEAD;
        match self.check {
            Check::Text => None,
            Check::PositiveInteger => match parse_int::<i64>(value) {
                Some(n) if n > 0 => None,
                _ => Some(format!("{} debe ser un número entero positivo", self.field)),
            },
            Check::Integer => match parse_int::<i32>(value) {
                Some(_) => None,
                None => Some(format!("{} debe ser un número entero", self.field)),
            },
            Check::Clase => match parse_int::<i32>(value) {
                Some(year) if (MIN_CLASE..=max_clase).contains(&year) => None,
                _ => Some(format!("clase debe ser un año entre {} y {}", MIN_CLASE, max_clase)),
            },
            Check::Sexo => match value.to_uppercase().as_str() {
                "M" | "F" | "X" => None,
                _ => Some("sexo debe ser M, F o X".to_string()),
            },
            Check::Boolean => match parse_bool(value) {
                Some(_) => None,
                None => Some(format!("{} debe ser sí/no, true/false o 1/0", self.field)),
            },
            Check::UuidV4 => match parse_uuid_v4(value) {
                Some(_) => None,
                None => Some(format!("{} debe ser un UUID v4 válido", self.field)),
            },
            Check::Timestamp => match parse_timestamp(value) {
                Some(_) => None,
                None => Some(format!("{} no es una fecha válida", self.field)),
            },
        }
    }
}

/// Check one record against every rule. `row` is the 1-based file row.
pub fn validate_structure(record: &RawRecord, row: u32, current_year: i32) -> Vec<ImportIssue> {
    let mut issues = Vec::new();
    for rule in RULES {
        match record.non_empty(rule.field) {
            None if rule.required => issues.push(ImportIssue::new(
                row,
                ImportIssueKind::Structural,
                rule.field,
                record.value(rule.field),
                format!("{} es obligatorio", rule.field),
            )),
            None => {}
            Some(value) => {
                if let Some(message) = rule.violation(value, current_year) {
                    issues.push(ImportIssue::new(
                        row,
                        ImportIssueKind::Structural,
                        rule.field,
                        value,
                        message,
                    ));
                }
            }
        }
    }
    issues
}
