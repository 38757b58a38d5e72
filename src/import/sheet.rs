use super::{ImportError, Result};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

/// Value of a single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn text(text: &str) -> CellValue {
        CellValue::Text(text.to_string())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

/// One data row, header -> cell.
pub type RawRow = BTreeMap<String, CellValue>;

/// Header row plus data rows of a worksheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SheetData {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> SheetData {
        SheetData { headers, rows }
    }
}

/// Reads the first worksheet of a `.xlsx`, `.xlsm`, `.xls` or `.ods` file.
pub fn read_spreadsheet(path: &Path) -> Result<SheetData> {
    let source_name = path.display().to_string();
    let mut workbook = open_workbook_auto(path).map_err(|e| parse_error(&source_name, e))?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| parse_error(&source_name, "the workbook contains no worksheet"))?;
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| parse_error(&source_name, e))?;

    sheet_from_range(&source_name, &range)
}

/// Like `read_spreadsheet`, for file contents held in memory.
pub fn read_spreadsheet_bytes(source_name: &str, data: &[u8]) -> Result<SheetData> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(data.to_vec())).map_err(|e| parse_error(source_name, e))?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| parse_error(source_name, "the workbook contains no worksheet"))?;
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| parse_error(source_name, e))?;

    sheet_from_range(source_name, &range)
}

// The first row holds the headers. Columns without a header are ignored, so are
// rows without any value. Of columns sharing a header only the first one is read.
fn sheet_from_range(source_name: &str, range: &Range<Data>) -> Result<SheetData> {
    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| parse_error(source_name, "the first worksheet has no header row"))?;

    let mut headers: Vec<String> = Vec::new();
    let mut columns: Vec<(usize, String)> = Vec::new();
    for (column, cell) in header_row.iter().enumerate() {
        let header = header_text(cell);
        if header.is_empty() {
            continue;
        }
        if headers.contains(&header) {
            tracing::warn!(source = source_name, %header, column, "ignoring duplicated column");
            continue;
        }
        headers.push(header.clone());
        columns.push((column, header));
    }
    if headers.is_empty() {
        return Err(parse_error(source_name, "the header row is empty"));
    }

    let mut data_rows = Vec::new();
    for row in rows {
        let raw: RawRow = columns
            .iter()
            .map(|(column, header)| {
                let cell = row.get(*column).map(cell_value).unwrap_or_default();
                (header.clone(), cell)
            })
            .collect();
        if raw.values().all(CellValue::is_blank) {
            continue;
        }
        data_rows.push(raw);
    }
    tracing::debug!(source = source_name, columns = headers.len(), rows = data_rows.len(), "read spreadsheet");

    Ok(SheetData {
        headers,
        rows: data_rows,
    })
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(number) => CellValue::Number(*number),
        Data::Int(number) => CellValue::Number(*number as f64),
        Data::Bool(flag) => CellValue::Bool(*flag),
        Data::DateTime(date) => match date.as_datetime() {
            Some(date) => CellValue::Date(date),
            None => CellValue::Number(date.as_f64()),
        },
        Data::DateTimeIso(text) => parse_iso_datetime(text)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(text.clone())),
        Data::DurationIso(text) => CellValue::Text(text.clone()),
        Data::Error(error) => CellValue::Text(error.to_string()),
    }
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        CellValue::Empty => String::new(),
        CellValue::Text(text) => text.trim().to_string(),
        CellValue::Number(number) => number.to_string(),
        CellValue::Bool(flag) => flag.to_string(),
        CellValue::Date(date) => date.to_string(),
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn parse_error<E: ToString>(source_name: &str, reason: E) -> ImportError {
    ImportError::FileParse {
        source_name: source_name.to_string(),
        reason: reason.to_string(),
    }
}
