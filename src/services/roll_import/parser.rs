//! Roll file parsing: CSV via the `csv` crate, spreadsheets via calamine
//!
//! Both paths produce the same shape: lowercase trimmed headers plus one
//! [`RawRecord`] per data row.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::types::{FileFormat, ImportFile, ParsedFile, RawRecord, MAX_UPLOAD_BYTES, REQUIRED_COLUMNS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

impl FileFormat {
    /// Detect the format from the file extension.
    pub fn from_filename(filename: &str) -> Result<Self, ParseError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "xls" | "xlsm" | "ods" => Ok(FileFormat::Spreadsheet),
            _ => Err(ParseError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// Parse an uploaded file and check that every required column is present.
pub fn parse_file(file: &ImportFile) -> Result<ParsedFile, ParseError> {
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ParseError::FileTooLarge {
            size: file.bytes.len(),
            max: MAX_UPLOAD_BYTES,
        });
    }

    let format = FileFormat::from_filename(&file.filename)?;
    let parsed = match format {
        FileFormat::Csv => parse_csv(&file.bytes)?,
        FileFormat::Spreadsheet => parse_spreadsheet(&file.bytes)?,
    };

    check_required_columns(&parsed.headers)?;
    if parsed.records.is_empty() {
        return Err(ParseError::NoDataRows);
    }

    debug!(
        "Parsed {} ({:?}): {} columns, {} rows",
        file.filename,
        format,
        parsed.headers.len(),
        parsed.records.len()
    );
    Ok(parsed)
}

fn check_required_columns(headers: &[String]) -> Result<(), ParseError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ParseError::MissingColumns(missing))
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Parse CSV bytes. The first non-empty line is the header row; lines whose
/// field count differs from the header are skipped.
///
/// Each physical line is read on its own, so an unbalanced quote only costs
/// the line it appears on.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedFile, ParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut headers: Option<Vec<String>> = None;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for line in bytes.split(|b| *b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let Some(row) = parse_csv_line(line)? else {
            continue;
        };
        if row.iter().all(str::is_empty) {
            continue;
        }

        match &headers {
            None => headers = Some(row.iter().map(normalize_header).collect()),
            Some(header) => {
                if row.len() != header.len() {
                    skipped += 1;
                    continue;
                }
                records.push(header.iter().cloned().zip(row.iter()).collect::<RawRecord>());
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} CSV lines with a mismatched field count", skipped);
    }

    let headers = headers.ok_or(ParseError::Empty)?;
    Ok(ParsedFile { headers, records })
}

/// Fields of a single CSV line, or `None` for an empty line.
fn parse_csv_line(line: &[u8]) -> Result<Option<csv::StringRecord>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line);

    reader
        .records()
        .next()
        .transpose()
        .map_err(|e| ParseError::Csv(e.to_string()))
}

/// Parse the first sheet of a workbook. Row 1 holds the headers.
pub fn parse_spreadsheet(bytes: &[u8]) -> Result<ParsedFile, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::Empty)?
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    // The used range starts at the first non-empty row
    if let Some((start_row, _)) = range.start() {
        if start_row > 0 {
            return Err(ParseError::MisplacedHeader { row: start_row + 1 });
        }
    }

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(|cell| normalize_header(&cell_to_string(cell))).collect(),
        None => return Err(ParseError::Empty),
    };
    if headers.iter().all(String::is_empty) {
        return Err(ParseError::Empty);
    }

    let mut records = Vec::new();
    for row in rows {
        let values: Vec<String> = row.iter().map(cell_to_string).collect();
        if values.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let record: RawRecord = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| {
                let value = values.get(i).map(|v| v.trim().to_string()).unwrap_or_default();
                (h.clone(), value)
            })
            .collect();
        records.push(record);
    }

    let headers = headers.into_iter().filter(|h| !h.is_empty()).collect();
    Ok(ParsedFile { headers, records })
}

/// String form of a spreadsheet cell.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            // Integers stored as floats (documento, clase, mesa)
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => String::new(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}
