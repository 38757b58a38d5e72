use super::column_mapping::{ColumnMapping, ImportField};
use super::sheet::{CellValue, RawRow};
use crate::inventory::{format_timestamp, EntryStatus};

/// A spreadsheet row converted to history event fields. Absent fields had no mapped column
/// (or only a blank cell) and are filled with defaults when the row is committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRow {
    pub doc_number: Option<String>,
    pub doc_position: Option<String>,
    pub notes: Option<String>,
    pub date: Option<String>,
    pub updated_by: Option<String>,
    pub signed: Option<bool>,
    pub sealed: Option<bool>,
    pub status: Option<String>,
}

/// Applies the mapped columns of `row` in header order, so of several headers mapped onto
/// one field the rightmost wins.
pub fn normalize_row(row: &RawRow, headers: &[String], mapping: &ColumnMapping) -> NormalizedRow {
    let mut result = NormalizedRow::default();
    let empty = CellValue::Empty;

    for header in headers {
        let field = match mapping.get(header) {
            Some(field) => field,
            None => continue,
        };
        let cell = row.get(header).unwrap_or(&empty);

        match field {
            ImportField::DocNumber => result.doc_number = cell_text(cell),
            ImportField::DocPosition => result.doc_position = cell_text(cell),
            ImportField::Notes => result.notes = cell_text(cell),
            ImportField::Date => result.date = cell_text(cell),
            ImportField::UpdatedBy => result.updated_by = cell_text(cell),
            ImportField::Signed => result.signed = Some(parse_flag(cell)),
            ImportField::Sealed => result.sealed = Some(parse_flag(cell)),
            ImportField::Status => result.status = cell_text(cell).map(canonical_status),
        }
    }

    result
}

/// Text of a cell, None for blank cells. Dates become ISO-8601 timestamps.
pub fn cell_text(cell: &CellValue) -> Option<String> {
    let text = match cell {
        CellValue::Empty => return None,
        CellValue::Text(text) => text.trim().to_string(),
        CellValue::Number(number) => number.to_string(),
        CellValue::Bool(flag) => flag.to_string(),
        CellValue::Date(date) => format_timestamp(date),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// `yes`, `true` and `1` (ignoring case) are true, anything else is false.
pub fn parse_flag(cell: &CellValue) -> bool {
    match cell_text(cell) {
        Some(text) => {
            let text = text.to_lowercase();
            text == "yes" || text == "true" || text == "1"
        }
        None => false,
    }
}

// Known status names are stored in their canonical spelling, others as written.
fn canonical_status(status: String) -> String {
    status
        .parse::<EntryStatus>()
        .map(|parsed| parsed.to_string())
        .unwrap_or(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn row(cells: Vec<(&str, CellValue)>) -> RawRow {
        cells
            .into_iter()
            .map(|(header, cell)| (header.to_string(), cell))
            .collect()
    }

    #[test]
    fn coerce_cells() {
        assert_eq!(cell_text(&CellValue::Number(100.0)), Some("100".to_string()));
        assert_eq!(cell_text(&CellValue::Number(1.5)), Some("1.5".to_string()));
        assert_eq!(cell_text(&CellValue::Bool(false)), Some("false".to_string()));
        assert_eq!(cell_text(&CellValue::text("  A-7 ")), Some("A-7".to_string()));
        assert_eq!(cell_text(&CellValue::text("   ")), None);
        assert_eq!(cell_text(&CellValue::Empty), None);

        let date = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|date| date.and_hms_milli_opt(8, 30, 0, 250))
            .unwrap();
        assert_eq!(
            cell_text(&CellValue::Date(date)),
            Some("2024-03-01T08:30:00.250Z".to_string())
        );
    }

    #[test]
    fn parse_flags() {
        for truthy in &["yes", "YES", "True", "1", " yes "] {
            assert!(parse_flag(&CellValue::text(truthy)), "'{}' must be true", truthy);
        }
        for falsy in &["no", "y", "0", "x", ""] {
            assert!(!parse_flag(&CellValue::text(falsy)), "'{}' must be false", falsy);
        }
        assert!(parse_flag(&CellValue::Number(1.0)));
        assert!(parse_flag(&CellValue::Bool(true)));
        assert!(!parse_flag(&CellValue::Empty));
    }

    #[test]
    fn normalize_mapped_columns_only() {
        let headers = headers(&["No", "Pos", "Signed", "Sealed", "Remarks", "State"]);
        let mut mapping = ColumnMapping::new();
        mapping.set("No", Some(ImportField::DocNumber));
        mapping.set("Pos", Some(ImportField::DocPosition));
        mapping.set("Signed", Some(ImportField::Signed));
        mapping.set("State", Some(ImportField::Status));

        let normalized = normalize_row(
            &row(vec![
                ("No", CellValue::Number(100.0)),
                ("Pos", CellValue::text("1")),
                ("Signed", CellValue::Empty),
                ("Sealed", CellValue::text("yes")),
                ("Remarks", CellValue::text("paid")),
                ("State", CellValue::text("checked out")),
            ]),
            &headers,
            &mapping,
        );

        assert_eq!(
            normalized,
            NormalizedRow {
                doc_number: Some("100".to_string()),
                doc_position: Some("1".to_string()),
                signed: Some(false),
                status: Some("Checked Out".to_string()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn rightmost_header_wins() {
        let headers = headers(&["Old No", "New No"]);
        let mut mapping = ColumnMapping::new();
        mapping.set("New No", Some(ImportField::DocNumber));
        mapping.set("Old No", Some(ImportField::DocNumber));

        let normalized = normalize_row(
            &row(vec![("Old No", CellValue::text("1")), ("New No", CellValue::text("2"))]),
            &headers,
            &mapping,
        );
        assert_eq!(normalized.doc_number.as_deref(), Some("2"));
    }
}
