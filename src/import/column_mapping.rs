use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// History event fields a spreadsheet column can be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImportField {
    DocNumber,
    DocPosition,
    Notes,
    Date,
    UpdatedBy,
    Signed,
    Sealed,
    Status,
}

impl ImportField {
    pub const ALL: [ImportField; 8] = [
        ImportField::DocNumber,
        ImportField::DocPosition,
        ImportField::Notes,
        ImportField::Date,
        ImportField::UpdatedBy,
        ImportField::Signed,
        ImportField::Sealed,
        ImportField::Status,
    ];

    /// Fields that must have a column mapped before a batch can be committed.
    /// Single cells of these columns may still be blank.
    pub const REQUIRED: [ImportField; 2] = [ImportField::DocNumber, ImportField::DocPosition];

    pub fn key(&self) -> &'static str {
        match self {
            ImportField::DocNumber => "docNumber",
            ImportField::DocPosition => "docPosition",
            ImportField::Notes => "notes",
            ImportField::Date => "date",
            ImportField::UpdatedBy => "updatedBy",
            ImportField::Signed => "signed",
            ImportField::Sealed => "sealed",
            ImportField::Status => "status",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }

    // Squashed header names recognized by `ColumnMapping::guess`.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ImportField::DocNumber => &["docnumber", "documentnumber", "docno", "documentno", "docnum"],
            ImportField::DocPosition => &["docposition", "documentposition", "position", "pos"],
            ImportField::Notes => &["notes", "note", "remarks", "comment", "comments"],
            ImportField::Date => &["date", "timestamp", "dateadded"],
            ImportField::UpdatedBy => &["updatedby", "addedby", "user", "by"],
            ImportField::Signed => &["signed"],
            ImportField::Sealed => &["sealed"],
            ImportField::Status => &["status"],
        }
    }
}

impl fmt::Display for ImportField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for ImportField {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let wanted = squash(name);
        Self::ALL
            .iter()
            .find(|field| squash(field.key()) == wanted)
            .copied()
            .ok_or_else(|| format!("unknown import field '{}'", name))
    }
}

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Header -> field configuration of an import batch.
///
/// Several headers may map onto the same field. Headers without a field are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    fields: BTreeMap<String, ImportField>,
}

impl ColumnMapping {
    pub fn new() -> ColumnMapping {
        Self::default()
    }

    /// Pre-fills a mapping from headers named like one of the fields.
    /// A field is guessed for at most one header, the first one matching.
    pub fn guess(headers: &[String]) -> ColumnMapping {
        let mut mapping = Self::new();
        for header in headers {
            let name = squash(header);
            let field = ImportField::ALL
                .iter()
                .copied()
                .find(|field| field.aliases().contains(&name.as_str()) && !mapping.is_mapped(*field));
            if field.is_some() {
                mapping.set(header, field);
            }
        }

        mapping
    }

    /// Maps `header` onto `field`, None removes the header from the mapping.
    pub fn set(&mut self, header: &str, field: Option<ImportField>) {
        match field {
            Some(field) => {
                self.fields.insert(header.to_string(), field);
            }
            None => {
                self.fields.remove(header);
            }
        }
    }

    pub fn get(&self, header: &str) -> Option<ImportField> {
        self.fields.get(header).copied()
    }

    pub fn is_mapped(&self, field: ImportField) -> bool {
        self.fields.values().any(|mapped| *mapped == field)
    }

    pub fn headers_for(&self, field: ImportField) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, mapped)| **mapped == field)
            .map(|(header, _)| header.as_str())
            .collect()
    }

    /// Required fields without any header mapped onto them.
    pub fn missing_required(&self) -> Vec<ImportField> {
        ImportField::REQUIRED
            .iter()
            .filter(|field| !self.is_mapped(**field))
            .copied()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ImportField)> {
        self.fields.iter().map(|(header, field)| (header.as_str(), *field))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
