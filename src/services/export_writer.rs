//! Export shaping and serialization
//!
//! Rows arrive page by page and are written straight into the output, so
//! the writer never holds more than one page of store rows.

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Color, Format, FormatBorder, FormatPattern, Workbook, Worksheet};

use crate::error::PipelineError;
use crate::types::{all_columns, ExportFormat, ExportMode, RollRecord, RollRow};

const SHEET_NAME: &str = "Padrón";
const HEADER_FILL: u32 = 0xD9E1F2;
const MIN_COLUMN_WIDTH: usize = 8;
const MAX_COLUMN_WIDTH: usize = 50;

/// Headers of a curated export, in column order.
pub const CURATED_HEADERS: [&str; 16] = [
    "Documento",
    "Apellido",
    "Nombre",
    "Sexo",
    "Clase",
    "Domicilio",
    "Mesa",
    "Orden",
    "Nuevo elector",
    "Voto obligatorio",
    "Emopick",
    "Observación pick",
    "Pick verificado",
    "Votó",
    "Fecha de voto",
    "Observaciones",
];

/// One output cell. Numbers stay numeric in XLSX.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(i64),
}

impl Cell {
    fn text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    fn number<T: Into<i64>>(value: Option<T>) -> Self {
        value.map_or(Cell::Empty, |v| Cell::Number(v.into()))
    }

    fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }
    }
}

/// Export filename, e.g. `padron_raw_20261017_093000.csv`.
pub fn export_filename(mode: ExportMode, format: ExportFormat, at: DateTime<Utc>) -> String {
    format!(
        "padron_{}_{}.{}",
        mode.as_str(),
        at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

pub fn headers(mode: ExportMode) -> Vec<&'static str> {
    match mode {
        ExportMode::Raw => all_columns().collect(),
        ExportMode::Curated => CURATED_HEADERS.to_vec(),
    }
}

fn raw_flag(value: bool) -> Cell {
    Cell::Text(value.to_string())
}

fn yes_no(value: bool) -> Cell {
    Cell::Text(if value { "Sí" } else { "No" }.to_string())
}

fn uuid_cell(value: Option<uuid::Uuid>) -> Cell {
    value.map_or(Cell::Empty, |id| Cell::Text(id.to_string()))
}

/// Cells for one row in the given mode.
pub fn shape_row(mode: ExportMode, row: &RollRow) -> Vec<Cell> {
    let r: &RollRecord = &row.record;
    match mode {
        ExportMode::Raw => vec![
            Cell::Number(r.documento),
            Cell::text(&r.apellido),
            Cell::text(&r.nombre),
            Cell::text(r.sexo.as_deref().unwrap_or_default()),
            Cell::number(r.clase),
            Cell::text(&r.domicilio),
            Cell::number(r.mesa_numero),
            Cell::number(r.orden),
            raw_flag(r.nuevo_elector),
            raw_flag(r.voto_obligatorio),
            Cell::text(&r.observaciones),
            Cell::number(r.emopick_id),
            Cell::text(&r.pick_observacion),
            raw_flag(r.pick_verificado),
            raw_flag(r.voto_emitido),
            r.fecha_voto.map_or(Cell::Empty, |dt| Cell::Text(dt.to_rfc3339())),
            uuid_cell(r.voto_registrado_por),
            uuid_cell(r.pick_registrado_por),
            uuid_cell(r.voto_verificado_por),
        ],
        ExportMode::Curated => vec![
            Cell::Number(r.documento),
            Cell::text(&r.apellido),
            Cell::text(&r.nombre),
            Cell::text(r.sexo.as_deref().unwrap_or_default()),
            Cell::number(r.clase),
            Cell::text(&r.domicilio),
            Cell::number(r.mesa_numero),
            Cell::number(r.orden),
            yes_no(r.nuevo_elector),
            yes_no(r.voto_obligatorio),
            Cell::text(row.emopick_nombre.as_deref().unwrap_or_default()),
            Cell::text(&r.pick_observacion),
            yes_no(r.pick_verificado),
            yes_no(r.voto_emitido),
            r.fecha_voto
                .map_or(Cell::Empty, |dt| Cell::Text(dt.format("%d/%m/%Y %H:%M").to_string())),
            Cell::text(&r.observaciones),
        ],
    }
}

enum Sink {
    Csv(csv::Writer<Vec<u8>>),
    Xlsx {
        worksheet: Box<Worksheet>,
        widths: Vec<usize>,
    },
}

/// Incremental export writer for one file
pub struct ExportWriter {
    mode: ExportMode,
    columns: usize,
    rows: usize,
    sink: Sink,
}

impl ExportWriter {
    /// Start a file and write its header row.
    pub fn new(mode: ExportMode, format: ExportFormat) -> Result<Self, PipelineError> {
        let headers = headers(mode);
        let sink = match format {
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(&headers)?;
                Sink::Csv(writer)
            }
            ExportFormat::Xlsx => {
                let header_format = Format::new()
                    .set_bold()
                    .set_background_color(Color::RGB(HEADER_FILL))
                    .set_pattern(FormatPattern::Solid)
                    .set_border(FormatBorder::Thin);
                let mut worksheet = Worksheet::new();
                worksheet.set_name(SHEET_NAME)?;
                for (col, header) in headers.iter().enumerate() {
                    worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
                }
                worksheet.set_freeze_panes(1, 0)?;
                Sink::Xlsx {
                    worksheet: Box::new(worksheet),
                    widths: headers.iter().map(|h| h.chars().count()).collect(),
                }
            }
        };
        Ok(Self {
            mode,
            columns: headers.len(),
            rows: 0,
            sink,
        })
    }

    /// Append one page of rows.
    pub fn write_rows(&mut self, rows: &[RollRow]) -> Result<(), PipelineError> {
        for row in rows {
            let cells = shape_row(self.mode, row);
            match &mut self.sink {
                Sink::Csv(writer) => {
                    writer.write_record(cells.iter().map(Cell::render))?;
                }
                Sink::Xlsx { worksheet, widths } => {
                    // header occupies row 0
                    let xlsx_row = (self.rows + 1) as u32;
                    for (col, cell) in cells.iter().enumerate() {
                        let col_idx = col as u16;
                        match cell {
                            Cell::Empty => {}
                            Cell::Text(s) => {
                                worksheet.write_string(xlsx_row, col_idx, s)?;
                            }
                            Cell::Number(n) => {
                                worksheet.write_number(xlsx_row, col_idx, *n as f64)?;
                            }
                        }
                        let len = cell.render().chars().count();
                        if widths[col] < len {
                            widths[col] = len;
                        }
                    }
                }
            }
            self.rows += 1;
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Finish the file and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>, PipelineError> {
        match self.sink {
            Sink::Csv(writer) => writer
                .into_inner()
                .map_err(|e| PipelineError::Output(e.to_string())),
            Sink::Xlsx { mut worksheet, widths } => {
                for (col, width) in widths.iter().enumerate() {
                    let width = (*width).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH) + 2;
                    worksheet.set_column_width(col as u16, width as f64)?;
                }
                let last_col = (self.columns - 1) as u16;
                worksheet.autofilter(0, 0, self.rows as u32, last_col)?;

                let mut workbook = Workbook::new();
                workbook.push_worksheet(*worksheet);
                Ok(workbook.save_to_buffer()?)
            }
        }
    }
}
