use crate::inventory::doc_note::parse_doc_note;
use crate::inventory::{Entry, LocationHistoryEvent};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

pub const HISTORY_HEADERS: [&str; 9] = [
    "Date",
    "Location",
    "Status",
    "Updated By",
    "Doc No",
    "Position",
    "Notes",
    "Signed",
    "Sealed",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("can not build the workbook")]
    Workbook {
        #[from]
        source: XlsxError,
    },
    #[error("can not write the export file")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("can not move the export file into place")]
    Persist {
        #[from]
        source: tempfile::PersistError,
    },
}
pub type Result<T> = std::result::Result<T, ExportError>;

/// Writes the history of `entry` as a single table to the XLSX file at `path`.
///
/// The workbook is written to a temporary file next to `path` first, an existing file at
/// `path` is only replaced once the export is complete. Returns the number of exported rows.
pub fn export_history(entry: &Entry, path: &Path) -> Result<usize> {
    let data = history_workbook(entry)?;

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(directory)?;
    temp_file.write_all(&data)?;
    temp_file.flush()?;
    temp_file.persist(path)?;

    tracing::info!(id = %entry.id, rows = entry.location_history.len(), path = %path.display(), "exported history");
    Ok(entry.location_history.len())
}

/// Contents of the XLSX file written by `export_history`.
pub fn history_workbook(entry: &Entry) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(&sheet_name(&entry.file_no))?;
    for (column, header) in HISTORY_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, column as u16, *header, &header_format)?;
    }
    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(6, 50)?;

    let mut row: u32 = 1;
    for event in &entry.location_history {
        write_event(sheet, row, event)?;
        row += 1;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_event(sheet: &mut Worksheet, row: u32, event: &LocationHistoryEvent) -> Result<()> {
    // Events written before document numbers became fields only carry them in the notes
    let parsed = parse_doc_note(&event.notes);
    let doc_number = event.doc_number.clone().or(parsed.doc_number).unwrap_or_default();
    let doc_position = event.doc_position.clone().or(parsed.doc_position).unwrap_or_default();

    sheet.write_string(row, 0, &event.timestamp)?;
    sheet.write_string(row, 1, &event.location)?;
    sheet.write_string(row, 2, &event.status)?;
    sheet.write_string(row, 3, &event.updated_by)?;
    sheet.write_string(row, 4, &doc_number)?;
    sheet.write_string(row, 5, &doc_position)?;
    sheet.write_string(row, 6, &event.notes)?;
    sheet.write_string(row, 7, flag_text(event.signed))?;
    sheet.write_string(row, 8, flag_text(event.sealed))?;

    Ok(())
}

fn flag_text(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "",
    }
}

// Worksheet names are limited to 31 characters and must not contain []:*?/\
fn sheet_name(file_no: &str) -> String {
    let name: String = file_no
        .chars()
        .filter(|c| !"[]:*?/\\".contains(*c))
        .take(31)
        .collect();
    let name = name.trim_matches('\'').trim().to_string();

    if name.is_empty() {
        "History".to_string()
    } else {
        name
    }
}
