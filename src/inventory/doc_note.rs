use regex::Regex;
use std::sync::OnceLock;

pub const DOC_NOTE_PREFIX: &str = "Added Doc: ";

/// Document number and position encoded in the notes of a history event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocNote {
    pub doc_number: Option<String>,
    pub doc_position: Option<String>,
}

/// Builds the notes text of an imported document:
/// `Added Doc: #<number> (Pos: <position>) - <notes>`, leaving out absent parts.
pub fn format_doc_note(
    doc_number: Option<&str>,
    doc_position: Option<&str>,
    notes: Option<&str>,
) -> String {
    let mut result = String::from(DOC_NOTE_PREFIX);
    if let Some(doc_number) = doc_number {
        result.push_str(&number_token(doc_number));
    }
    if let Some(doc_position) = doc_position {
        result.push_str(&position_token(doc_position));
        result.push(' ');
    }
    if let Some(notes) = notes {
        result.push_str("- ");
        result.push_str(notes);
    }

    result
}

/// Extracts the document number and position from a notes text written by
/// `format_doc_note`. Tokens after the prefixed parts (e.g. in the free text) are ignored.
pub fn parse_doc_note(notes: &str) -> DocNote {
    static DOC_NOTE: OnceLock<Option<Regex>> = OnceLock::new();

    let regex = DOC_NOTE.get_or_init(|| {
        Regex::new(r"^Added Doc: (?:#(\S+) )?(?:\(Pos: ([^)]*)\) ?)?").ok()
    });
    let captures = match regex.as_ref().and_then(|regex| regex.captures(notes)) {
        Some(captures) => captures,
        None => return DocNote::default(),
    };
    let group = |index: usize| captures.get(index).map(|found| found.as_str().to_string());

    DocNote {
        doc_number: group(1),
        doc_position: group(2),
    }
}

/// Space terminated token marking a document number inside notes.
pub fn number_token(doc_number: &str) -> String {
    format!("#{} ", doc_number)
}

pub fn position_token(doc_position: &str) -> String {
    format!("(Pos: {})", doc_position)
}
