use super::doc_note;
use serde::{Deserialize, Serialize};

/// One timestamped line in the audit trail of an entry.
///
/// Sub-documents filed into an entry carry a document number and position. Both are stored
/// as fields of their own and, for consumers parsing the text, encoded in the notes as
/// `#<number> (Pos: <position>)` (see `doc_note`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationHistoryEvent {
    pub timestamp: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub updated_by: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealed: Option<bool>,
}

impl LocationHistoryEvent {
    /// True if the event files the document with the given number.
    pub fn has_doc_number(&self, doc_number: &str) -> bool {
        self.doc_number.as_deref() == Some(doc_number)
            || self.notes.contains(&doc_note::number_token(doc_number))
    }

    /// True if the event occupies the given document position.
    pub fn has_doc_position(&self, doc_position: &str) -> bool {
        self.doc_position.as_deref() == Some(doc_position)
            || self.notes.contains(&doc_note::position_token(doc_position))
    }

    /// Fills missing document number/position fields from the notes text.
    /// Returns true if anything changed.
    pub fn backfill_doc_fields(&mut self) -> bool {
        let parsed = doc_note::parse_doc_note(&self.notes);
        let mut changed = false;

        if self.doc_number.is_none() && parsed.doc_number.is_some() {
            self.doc_number = parsed.doc_number;
            changed = true;
        }
        if self.doc_position.is_none() && parsed.doc_position.is_some() {
            self.doc_position = parsed.doc_position;
            changed = true;
        }

        changed
    }
}
