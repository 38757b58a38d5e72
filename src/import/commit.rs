use super::normalizer::NormalizedRow;
use crate::document_store::DocumentStore;
use crate::inventory::doc_note::format_doc_note;
use crate::inventory::{self, now_timestamp, Entry, Inventory, LocationHistoryEvent, UNKNOWN_LOCATION};

/// Values used for history event fields without a mapped column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDefaults {
    pub actor: String,
    /// Location snapshot for entries without any history.
    pub location: String,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        ImportDefaults {
            actor: "Import".to_string(),
            location: UNKNOWN_LOCATION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub entry_id: String,
    pub added_events: usize,
    pub history_len: usize,
}

/// Builds the history event of one imported row. `now` is used if no date was imported.
pub fn build_history_event(
    row: &NormalizedRow,
    target: &Entry,
    defaults: &ImportDefaults,
    now: &str,
) -> LocationHistoryEvent {
    LocationHistoryEvent {
        timestamp: row.date.clone().unwrap_or_else(|| now.to_string()),
        location: target
            .last_history_location()
            .map(str::to_string)
            .unwrap_or_else(|| defaults.location.clone()),
        status: row
            .status
            .clone()
            .unwrap_or_else(|| target.status.to_string()),
        updated_by: row
            .updated_by
            .clone()
            .unwrap_or_else(|| defaults.actor.clone()),
        notes: format_doc_note(
            row.doc_number.as_deref(),
            row.doc_position.as_deref(),
            row.notes.as_deref(),
        ),
        doc_number: row.doc_number.clone(),
        doc_position: row.doc_position.clone(),
        signed: row.signed,
        sealed: row.sealed,
    }
}

pub fn build_history_events(
    rows: &[NormalizedRow],
    target: &Entry,
    defaults: &ImportDefaults,
) -> Vec<LocationHistoryEvent> {
    let now = now_timestamp();
    rows.iter()
        .map(|row| build_history_event(row, target, defaults, &now))
        .collect()
}

/// Appends one event per row to the history of `target` and writes the whole history
/// with a single store call. Rows must have been validated against the current state
/// of `target`.
pub fn commit_rows<S: DocumentStore>(
    inventory: &Inventory<S>,
    target: &Entry,
    rows: &[NormalizedRow],
    defaults: &ImportDefaults,
) -> inventory::Result<CommitOutcome> {
    let mut history = target.location_history.clone();
    history.extend(build_history_events(rows, target, defaults));

    inventory.replace_history(&target.id, &history)?;

    Ok(CommitOutcome {
        entry_id: target.id.clone(),
        added_events: rows.len(),
        history_len: history.len(),
    })
}
