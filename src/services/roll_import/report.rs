//! Import template and downloadable error report

use crate::error::PipelineError;
use crate::types::{all_columns, ImportIssue};

pub const TEMPLATE_FILENAME: &str = "plantilla_padron.csv";

/// Example row matching [`all_columns`] order.
const TEMPLATE_EXAMPLE: [&str; 19] = [
    "12345678",
    "GARCIA",
    "JUAN",
    "M",
    "1985",
    "CALLE FALSA 123",
    "1000",
    "1",
    "no",
    "sí",
    "",
    "",
    "",
    "no",
    "no",
    "",
    "",
    "",
    "",
];

/// Header row with every column plus one example record.
pub fn template_csv() -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(all_columns())?;
    writer.write_record(TEMPLATE_EXAMPLE)?;
    writer
        .into_inner()
        .map_err(|e| PipelineError::Output(e.to_string()))
}

/// Every issue as `row,field,value,error`.
pub fn error_report_csv(issues: &[ImportIssue]) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["row", "field", "value", "error"])?;
    for issue in issues {
        writer.write_record([
            issue.row_number.to_string().as_str(),
            issue.field.as_str(),
            issue.value.as_str(),
            issue.message.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Output(e.to_string()))
}
