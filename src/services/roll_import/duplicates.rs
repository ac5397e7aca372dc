//! In-file duplicate detection on `documento`

use std::collections::HashMap;

use crate::types::columns::DOCUMENTO;
use crate::types::{ImportIssue, ImportIssueKind, RawRecord};

use super::rules::parse_int;

/// Flag every repeat of a `documento`, citing the row it first appeared on.
/// The first occurrence is never flagged.
pub fn find_duplicates<'a>(rows: impl IntoIterator<Item = (u32, &'a RawRecord)>) -> Vec<ImportIssue> {
    let mut first_seen: HashMap<i64, u32> = HashMap::new();
    let mut issues = Vec::new();

    for (row, record) in rows {
        let Some(raw) = record.non_empty(DOCUMENTO) else {
            continue;
        };
        let Some(documento) = parse_int::<i64>(raw) else {
            continue;
        };
        match first_seen.get(&documento) {
            Some(first) => issues.push(ImportIssue::new(
                row,
                ImportIssueKind::Duplicate,
                DOCUMENTO,
                raw,
                format!("Documento duplicado (aparece primero en la fila {})", first),
            )),
            None => {
                first_seen.insert(documento, row);
            }
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: &str) -> RawRecord {
        [("documento", value)].into_iter().collect()
    }

    #[test]
    fn test_only_later_occurrence_flagged() {
        let records = [doc("111"), doc("222"), doc("111")];
        let issues = find_duplicates(records.iter().enumerate().map(|(i, r)| (i as u32 + 2, r)));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].row_number, 4);
        assert_eq!(issues[0].kind, ImportIssueKind::Duplicate);
        assert!(issues[0].message.contains("fila 2"));
    }

    #[test]
    fn test_every_repeat_cites_first_row() {
        let records = [doc("5"), doc("5"), doc("05")];
        let issues = find_duplicates(records.iter().enumerate().map(|(i, r)| (i as u32 + 2, r)));
        let rows: Vec<u32> = issues.iter().map(|i| i.row_number).collect();
        assert_eq!(rows, vec![3, 4]);
        assert!(issues.iter().all(|i| i.message.contains("fila 2")));
    }

    #[test]
    fn test_distinct_documents_pass() {
        let records = [doc("1"), doc("2"), doc("3")];
        assert!(find_duplicates(records.iter().map(|r| (2, r))).is_empty());
    }
}
