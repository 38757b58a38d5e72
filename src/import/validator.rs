use super::column_mapping::ImportField;
use super::normalizer::NormalizedRow;
use crate::document_store::DocumentStore;
use crate::inventory::{self, Entry, Inventory};
use std::collections::BTreeMap;

pub const DUPLICATE_IN_IMPORT: &str = "Duplicate in this import";
pub const POSITION_EXISTS: &str = "Position already exists";

/// Validation result of one batch row, errors are keyed by the offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowValidation {
    pub is_valid: bool,
    pub errors: BTreeMap<ImportField, String>,
}

impl RowValidation {
    fn from_errors(errors: BTreeMap<ImportField, String>) -> RowValidation {
        RowValidation {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    pub fn error(&self, field: ImportField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }
}

/// Existing data a batch is validated against: the target entry and every entry
/// sharing its file type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationContext {
    target: Entry,
    same_type_entries: Vec<Entry>,
}

impl ValidationContext {
    /// The target is always part of the same type entries, first in order.
    pub fn new(target: Entry, same_type_entries: Vec<Entry>) -> ValidationContext {
        let mut entries = vec![target.clone()];
        entries.extend(
            same_type_entries
                .into_iter()
                .filter(|entry| entry.id != target.id && entry.file_type == target.file_type),
        );

        ValidationContext {
            target,
            same_type_entries: entries,
        }
    }

    /// Reads the current state of the target entry and its file type from the inventory.
    pub fn load<S: DocumentStore>(inventory: &Inventory<S>, target_id: &str) -> inventory::Result<Self> {
        let target = inventory.find_entry(target_id)?;
        let same_type_entries = inventory.entries_with_file_type(&target.file_type)?;
        Ok(Self::new(target, same_type_entries))
    }

    pub fn target(&self) -> &Entry {
        &self.target
    }

    pub fn same_type_entries(&self) -> &[Entry] {
        &self.same_type_entries
    }

    // First entry (target first) already holding the document number.
    fn entry_with_doc_number(&self, doc_number: &str) -> Option<&Entry> {
        self.same_type_entries.iter().find(|entry| {
            entry
                .location_history
                .iter()
                .any(|event| event.has_doc_number(doc_number))
        })
    }

    fn target_has_position(&self, doc_position: &str) -> bool {
        self.target
            .location_history
            .iter()
            .any(|event| event.has_doc_position(doc_position))
    }
}

/// Validates the row at `index` of `batch`.
pub fn validate_row(index: usize, batch: &[NormalizedRow], context: &ValidationContext) -> RowValidation {
    let mut errors = BTreeMap::new();
    let row = match batch.get(index) {
        Some(row) => row,
        None => return RowValidation::from_errors(errors),
    };

    let duplicated_in_batch = |value: &str, field: fn(&NormalizedRow) -> Option<&str>| {
        batch
            .iter()
            .enumerate()
            .any(|(other, other_row)| other != index && field(other_row) == Some(value))
    };

    // Both checks apply to each field, every failing one is reported
    if let Some(doc_number) = row.doc_number.as_deref() {
        let mut causes = Vec::new();
        if let Some(entry) = context.entry_with_doc_number(doc_number) {
            causes.push(format!("Exists in file {}", entry.file_no));
        }
        if duplicated_in_batch(doc_number, |row| row.doc_number.as_deref()) {
            causes.push(DUPLICATE_IN_IMPORT.to_string());
        }
        if !causes.is_empty() {
            errors.insert(ImportField::DocNumber, causes.join("; "));
        }
    }

    if let Some(doc_position) = row.doc_position.as_deref() {
        let mut causes = Vec::new();
        if context.target_has_position(doc_position) {
            causes.push(POSITION_EXISTS.to_string());
        }
        if duplicated_in_batch(doc_position, |row| row.doc_position.as_deref()) {
            causes.push(DUPLICATE_IN_IMPORT.to_string());
        }
        if !causes.is_empty() {
            errors.insert(ImportField::DocPosition, causes.join("; "));
        }
    }

    RowValidation::from_errors(errors)
}

/// Validates every row of the batch. A row's result depends on all other rows,
/// so any change to the batch requires validating all of it again.
pub fn validate_batch(batch: &[NormalizedRow], context: &ValidationContext) -> Vec<RowValidation> {
    (0..batch.len())
        .map(|index| validate_row(index, batch, context))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{EntryStatus, Location, LocationHistoryEvent};

    fn entry(id: &str, file_no: &str, file_type: &str, notes: &[&str]) -> Entry {
        Entry {
            id: id.to_string(),
            file_no: file_no.to_string(),
            file_type: file_type.to_string(),
            company: String::new(),
            owner: String::new(),
            description: String::new(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
            location: Location::default(),
            status: EntryStatus::InStorage,
            location_history: notes
                .iter()
                .map(|notes| LocationHistoryEvent {
                    timestamp: "2024-01-01T00:00:00.000Z".to_string(),
                    notes: notes.to_string(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn row(doc_number: Option<&str>, doc_position: Option<&str>) -> NormalizedRow {
        NormalizedRow {
            doc_number: doc_number.map(str::to_string),
            doc_position: doc_position.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn duplicates_within_the_batch() {
        let context = ValidationContext::new(entry("t", "F-1", "Contracts", &[]), vec![]);
        let mut batch = vec![row(Some("100"), Some("1")), row(Some("100"), Some("2"))];

        let results = validate_batch(&batch, &context);
        for result in &results {
            assert!(!result.is_valid);
            assert_eq!(result.error(ImportField::DocNumber), Some(DUPLICATE_IN_IMPORT));
            assert_eq!(result.error(ImportField::DocPosition), None);
        }

        batch[1].doc_number = Some("101".to_string());
        let results = validate_batch(&batch, &context);
        assert!(results[0].is_valid);
        assert!(results[1].is_valid);
    }

    #[test]
    fn conflicts_with_existing_history() {
        let target = entry("t", "F-1", "Contracts", &["Added Doc: #55 (Pos: 3) - paid"]);
        let other = entry("o", "F-2", "Contracts", &["Added Doc: #77 (Pos: 9) "]);
        let foreign = entry("x", "HR-1", "Personnel", &["Added Doc: #88 "]);
        let context = ValidationContext::new(target, vec![other, foreign]);

        let batch = vec![
            row(Some("12"), Some("3")),
            row(Some("55"), Some("4")),
            row(Some("77"), Some("9")),
            row(Some("88"), None),
        ];
        let results = validate_batch(&batch, &context);

        assert_eq!(results[0].error(ImportField::DocPosition), Some(POSITION_EXISTS));
        assert_eq!(results[0].error(ImportField::DocNumber), None);
        assert_eq!(results[1].error(ImportField::DocNumber), Some("Exists in file F-1"));
        assert_eq!(results[1].error(ImportField::DocPosition), None);
        // Positions only count within the target, numbers across the file type
        assert_eq!(results[2].error(ImportField::DocNumber), Some("Exists in file F-2"));
        assert_eq!(results[2].error(ImportField::DocPosition), None);
        assert!(results[3].is_valid);
    }

    #[test]
    fn report_existing_and_batch_conflicts_together() {
        let target = entry("t", "F-1", "Contracts", &["Added Doc: #55 (Pos: 3) "]);
        let context = ValidationContext::new(target, vec![]);

        let batch = vec![row(Some("55"), Some("3")), row(Some("55"), Some("3")), row(Some("60"), Some("7"))];
        let results = validate_batch(&batch, &context);

        for result in &results[..2] {
            assert_eq!(
                result.error(ImportField::DocNumber),
                Some("Exists in file F-1; Duplicate in this import")
            );
            assert_eq!(
                result.error(ImportField::DocPosition),
                Some("Position already exists; Duplicate in this import")
            );
        }
        assert!(results[2].is_valid);
    }

    #[test]
    fn number_tokens_need_a_trailing_space() {
        let target = entry("t", "F-1", "Contracts", &["Added Doc: #550 (Pos: 30) "]);
        let context = ValidationContext::new(target, vec![]);

        let results = validate_batch(&[row(Some("55"), Some("3"))], &context);
        assert!(results[0].is_valid);
    }

    #[test]
    fn rows_without_identifiers_are_valid() {
        let target = entry("t", "F-1", "Contracts", &["Added Doc: #55 (Pos: 3) "]);
        let context = ValidationContext::new(target, vec![]);

        let results = validate_batch(&[row(None, None), row(None, None)], &context);
        assert!(results.iter().all(|result| result.is_valid && result.errors.is_empty()));
    }

    #[test]
    fn context_keeps_target_first() {
        let target = entry("t", "F-9", "Contracts", &[]);
        let context = ValidationContext::new(
            target.clone(),
            vec![entry("a", "F-1", "Contracts", &[]), target, entry("x", "HR-1", "Personnel", &[])],
        );

        let ids: Vec<&str> = context.same_type_entries().iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["t", "a"]);
    }
}
