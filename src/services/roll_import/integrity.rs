//! Referential checks against the tables, pick-list and users in the store

use crate::types::columns::{EMOPICK_ID, MESA_NUMERO};
use crate::types::{ImportIssue, ImportIssueKind, RawRecord, ReferenceSets, USER_REF_COLUMNS};

use super::rules::{parse_int, parse_uuid_v4};

/// Report every reference in a structurally valid record that points at
/// nothing. `refs` is fetched once per run.
pub fn check_integrity(record: &RawRecord, row: u32, refs: &ReferenceSets) -> Vec<ImportIssue> {
    let mut issues = Vec::new();

    if let Some(value) = record.non_empty(MESA_NUMERO) {
        if parse_int::<i32>(value).is_some_and(|mesa| !refs.mesas.contains(&mesa)) {
            issues.push(ImportIssue::new(
                row,
                ImportIssueKind::Integrity,
                MESA_NUMERO,
                value,
                format!("La mesa {} no existe", value),
            ));
        }
    }

    if let Some(value) = record.non_empty(EMOPICK_ID) {
        if parse_int::<i32>(value).is_some_and(|id| !refs.emopicks.contains(&id)) {
            issues.push(ImportIssue::new(
                row,
                ImportIssueKind::Integrity,
                EMOPICK_ID,
                value,
                format!("El emopick {} no existe", value),
            ));
        }
    }

    for field in USER_REF_COLUMNS {
        if let Some(value) = record.non_empty(field) {
            if parse_uuid_v4(value).is_some_and(|id| !refs.users.contains(&id)) {
                issues.push(ImportIssue::new(
                    row,
                    ImportIssueKind::Integrity,
                    field,
                    value,
                    format!("El usuario {} no existe", value),
                ));
            }
        }
    }

    issues
}
