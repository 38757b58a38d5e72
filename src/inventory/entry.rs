use super::history_event::LocationHistoryEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "In Storage")]
    InStorage,
    #[serde(rename = "Checked Out")]
    CheckedOut,
    #[serde(rename = "In Use")]
    InUse,
    #[serde(rename = "Closed")]
    Closed,
}

impl EntryStatus {
    pub const ALL: [EntryStatus; 4] = [
        EntryStatus::InStorage,
        EntryStatus::CheckedOut,
        EntryStatus::InUse,
        EntryStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::InStorage => "In Storage",
            EntryStatus::CheckedOut => "Checked Out",
            EntryStatus::InUse => "In Use",
            EntryStatus::Closed => "Closed",
        }
    }
}

impl Default for EntryStatus {
    fn default() -> Self {
        EntryStatus::InStorage
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    /// Accepts the display names ignoring case, spaces, dashes and underscores
    /// ("checked-out" == "Checked Out").
    fn from_str(status: &str) -> Result<Self, Self::Err> {
        let wanted = squash(status);
        Self::ALL
            .iter()
            .find(|candidate| squash(candidate.as_str()) == wanted)
            .copied()
            .ok_or_else(|| format!("unknown status '{}'", status))
    }
}

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Physical storage location of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub rack: String,
    #[serde(default)]
    pub shelf: String,
    #[serde(default, rename = "box")]
    pub box_no: String,
}

impl Location {
    pub fn new(room: &str, rack: &str, shelf: &str, box_no: &str) -> Location {
        Location {
            room: room.to_string(),
            rack: rack.to_string(),
            shelf: shelf.to_string(),
            box_no: box_no.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.room.is_empty() && self.rack.is_empty() && self.shelf.is_empty() && self.box_no.is_empty()
    }

    /// Id of the shelf this location points to (`<room>-<rack>-<shelf>`), if fully specified.
    pub fn shelf_id(&self) -> Option<String> {
        if self.room.is_empty() || self.rack.is_empty() || self.shelf.is_empty() {
            None
        } else {
            Some(format!("{}-{}-{}", self.room, self.rack, self.shelf))
        }
    }

    /// Human readable snapshot stored in history events.
    pub fn snapshot(&self) -> String {
        let parts: Vec<String> = [
            ("Room", &self.room),
            ("Rack", &self.rack),
            ("Shelf", &self.shelf),
            ("Box", &self.box_no),
        ]
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| format!("{} {}", label, value))
        .collect();

        parts.join(", ")
    }
}

/// A tracked physical file (`entries/<id>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub file_no: String,
    pub file_type: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub location_history: Vec<LocationHistoryEvent>,
}

impl Entry {
    /// Location snapshot of the most recent history event.
    pub fn last_history_location(&self) -> Option<&str> {
        self.location_history
            .last()
            .map(|event| event.location.as_str())
    }
}

/// Everything required to create a new entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEntry {
    pub file_no: String,
    pub file_type: String,
    pub company: String,
    pub owner: String,
    pub description: String,
    pub location: Location,
    pub status: EntryStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_status_names() {
        assert_eq!("In Storage".parse(), Ok(EntryStatus::InStorage));
        assert_eq!("checked-out".parse(), Ok(EntryStatus::CheckedOut));
        assert_eq!("IN_USE".parse(), Ok(EntryStatus::InUse));
        assert!("lost".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn location_helpers() {
        let location = Location::new("R1", "A", "3", "");
        assert_eq!(location.snapshot(), "Room R1, Rack A, Shelf 3");
        assert_eq!(location.shelf_id(), Some("R1-A-3".to_string()));
        assert_eq!(Location::new("R1", "A", "", "7").shelf_id(), None);
        assert!(Location::default().is_empty());
    }

    #[test]
    fn documents_without_history_deserialize() {
        let entry: Entry = serde_json::from_value(json!({
            "id": "e1",
            "fileNo": "F-1",
            "fileType": "Contracts",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "status": "Checked Out",
            "location": {"room": "R1", "box": "7"},
        }))
        .unwrap();

        assert_eq!(entry.status, EntryStatus::CheckedOut);
        assert_eq!(entry.location.box_no, "7");
        assert!(entry.location_history.is_empty());
        assert_eq!(entry.last_history_location(), None);
    }
}
