use crate::document_db::DocumentDB;
use crate::document_store::{DocumentStore, KeyPath, StoreError, Subscription};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

mod board;
pub use self::board::{Note, Task};
pub mod doc_note;
mod entry;
pub use self::entry::{Entry, EntryStatus, Location, NewEntry};
mod history_event;
pub use self::history_event::LocationHistoryEvent;
mod storage_layout;
pub use self::storage_layout::{Rack, Shelf, ShelfUsage};

/// Location snapshot of events written for entries without any known location.
pub const UNKNOWN_LOCATION: &str = "N/A";

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("no entry with id '{id}'")]
    EntryNotFound { id: String },
    #[error("entry '{id}' has no history event at index {index}")]
    HistoryIndexOutOfRange { id: String, index: usize },
    #[error("the field '{field}' must not be empty")]
    MissingField { field: &'static str },
    #[error("invalid search pattern")]
    InvalidPattern {
        #[from]
        source: glob::PatternError,
    },
    #[error("rack '{id}' already exists")]
    RackExists { id: String },
    #[error("no rack with id '{id}'")]
    RackNotFound { id: String },
    #[error("invalid rack layout: {reason}")]
    InvalidRackLayout { reason: &'static str },
    #[error("shelf '{shelf}' is full (capacity {capacity})")]
    ShelfFull { shelf: String, capacity: u32 },
    #[error("no task with id '{id}'")]
    TaskNotFound { id: String },
    #[error("no note with id '{id}'")]
    NoteNotFound { id: String },
    #[error("document store failure")]
    Store {
        #[from]
        source: StoreError,
    },
}
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Changes to the descriptive fields of an entry, None leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    pub file_no: Option<String>,
    pub file_type: Option<String>,
    pub company: Option<String>,
    pub owner: Option<String>,
    pub description: Option<String>,
}

/// Entries, their history, the storage layout and the dashboard board,
/// all kept in one hierarchical document store.
///
/// Store layout:
/// - `entries/<id>`: `Entry` documents including their `locationHistory`
/// - `racks/<room>-<rack>` and `shelves/<room>-<rack>-<index>`
/// - `tasks/<id>` and `notes/<id>`
pub struct Inventory<S: DocumentStore> {
    store: S,
}

pub type DefaultInventory = Inventory<DocumentDB>;

impl Inventory<DocumentDB> {
    /// Opens (or creates) the inventory database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let db = DocumentDB::open(path).map_err(StoreError::from)?;
        Ok(Inventory::new(db))
    }
}

impl<S: DocumentStore> Inventory<S> {
    pub fn new(store: S) -> Self {
        Inventory { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn create_entry(&self, new_entry: NewEntry, actor: &str) -> Result<Entry> {
        if new_entry.file_no.trim().is_empty() {
            return Err(InventoryError::MissingField { field: "fileNo" });
        }
        if new_entry.file_type.trim().is_empty() {
            return Err(InventoryError::MissingField { field: "fileType" });
        }
        self.check_shelf_capacity(&new_entry.location, None)?;

        let created_at = now_timestamp();
        let entry = Entry {
            id: new_id(),
            file_no: new_entry.file_no,
            file_type: new_entry.file_type,
            company: new_entry.company,
            owner: new_entry.owner,
            description: new_entry.description,
            location_history: vec![LocationHistoryEvent {
                timestamp: created_at.clone(),
                location: location_snapshot(&new_entry.location),
                status: new_entry.status.to_string(),
                updated_by: actor.to_string(),
                notes: "Created".to_string(),
                ..Default::default()
            }],
            created_at,
            location: new_entry.location,
            status: new_entry.status,
        };

        self.store.set_typed(&entry_path(&entry.id)?, &entry)?;
        tracing::info!(id = %entry.id, file_no = %entry.file_no, "created entry");

        Ok(entry)
    }

    pub fn get_entry(&self, id: &str) -> Result<Option<Entry>> {
        Ok(self.store.get_typed(&entry_path(id)?)?)
    }

    /// Like `get_entry`, but a missing entry is an error.
    pub fn find_entry(&self, id: &str) -> Result<Entry> {
        self.get_entry(id)?
            .ok_or_else(|| InventoryError::EntryNotFound { id: id.to_string() })
    }

    /// All entries ordered by file number.
    pub fn list_entries(&self) -> Result<Vec<Entry>> {
        let mut entries: Vec<Entry> = self.read_collection("entries")?;
        entries.sort_by(|a, b| a.file_no.cmp(&b.file_no).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    pub fn entries_with_file_type(&self, file_type: &str) -> Result<Vec<Entry>> {
        Ok(self
            .list_entries()?
            .into_iter()
            .filter(|entry| entry.file_type == file_type)
            .collect())
    }

    /// Entries whose file number matches the glob `pattern` (case insensitive).
    pub fn search_entries(&self, pattern: &str) -> Result<Vec<Entry>> {
        let pattern = glob::Pattern::new(pattern)?;
        let options = glob::MatchOptions {
            case_sensitive: false,
            ..Default::default()
        };

        Ok(self
            .list_entries()?
            .into_iter()
            .filter(|entry| pattern.matches_with(&entry.file_no, options))
            .collect())
    }

    pub fn update_entry(&self, id: &str, changes: EntryUpdate) -> Result<Entry> {
        self.find_entry(id)?;

        let mut patch = Map::new();
        let fields = vec![
            ("fileNo", changes.file_no),
            ("fileType", changes.file_type),
            ("company", changes.company),
            ("owner", changes.owner),
            ("description", changes.description),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                patch.insert(key.to_string(), Value::String(value));
            }
        }
        self.store.update(&entry_path(id)?, &patch)?;

        self.find_entry(id)
    }

    pub fn delete_entry(&self, id: &str) -> Result<()> {
        self.find_entry(id)?;
        self.store.remove(&entry_path(id)?)?;
        tracing::info!(%id, "deleted entry");

        Ok(())
    }

    /// Moves an entry to a new location (and status), recording the move in its history.
    /// Location, status and history are changed with one atomic update.
    pub fn move_entry(
        &self,
        id: &str,
        location: Location,
        status: EntryStatus,
        actor: &str,
        notes: &str,
    ) -> Result<Entry> {
        let mut entry = self.find_entry(id)?;
        self.check_shelf_capacity(&location, Some(&entry))?;

        entry.location_history.push(LocationHistoryEvent {
            timestamp: now_timestamp(),
            location: location_snapshot(&location),
            status: status.to_string(),
            updated_by: actor.to_string(),
            notes: notes.to_string(),
            ..Default::default()
        });

        let mut patch = Map::new();
        patch.insert("location".to_string(), serde_json::to_value(&location).map_err(StoreError::from)?);
        patch.insert("status".to_string(), json!(status));
        patch.insert(
            "locationHistory".to_string(),
            serde_json::to_value(&entry.location_history).map_err(StoreError::from)?,
        );
        self.store.update(&entry_path(id)?, &patch)?;
        tracing::info!(%id, location = %location.snapshot(), %status, "moved entry");

        entry.location = location;
        entry.status = status;
        Ok(entry)
    }

    pub fn append_history_event(&self, id: &str, event: LocationHistoryEvent) -> Result<()> {
        let mut history = self.find_entry(id)?.location_history;
        history.push(event);
        self.replace_history(id, &history)
    }

    /// Replaces the event at `index` in place.
    pub fn edit_history_event(&self, id: &str, index: usize, event: LocationHistoryEvent) -> Result<()> {
        let history = self.find_entry(id)?.location_history;
        if index >= history.len() {
            return Err(InventoryError::HistoryIndexOutOfRange { id: id.to_string(), index });
        }

        let event_path = history_path(id)?.child(&index.to_string())?;
        self.store.set_typed(&event_path, &event)?;
        Ok(())
    }

    /// Splices the event at `index` out of the history.
    pub fn delete_history_event(&self, id: &str, index: usize) -> Result<()> {
        let history = self.find_entry(id)?.location_history;
        if index >= history.len() {
            return Err(InventoryError::HistoryIndexOutOfRange { id: id.to_string(), index });
        }

        self.store.remove(&history_path(id)?.child(&index.to_string())?)?;
        Ok(())
    }

    /// Writes the whole history of an entry with one store call.
    pub fn replace_history(&self, id: &str, history: &[LocationHistoryEvent]) -> Result<()> {
        self.find_entry(id)?;
        self.store.set_typed(&history_path(id)?, &history)?;
        Ok(())
    }

    /// Calls `callback` with the current state of the entry and after every change to it.
    /// The watch ends when the returned subscription is cancelled or dropped.
    pub fn watch_entry<F>(&self, id: &str, mut callback: F) -> Result<Subscription>
    where
        F: FnMut(Option<Entry>) + 'static,
    {
        let watched_id = id.to_string();
        let subscription = self.store.subscribe(&entry_path(id)?, move |value| {
            let entry = value.and_then(|value| match serde_json::from_value(value.clone()) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    tracing::warn!(id = %watched_id, %error, "ignoring malformed entry");
                    None
                }
            });
            callback(entry)
        })?;

        Ok(subscription)
    }

    /// Copies document numbers and positions encoded in the notes of older history events
    /// into their structured fields. Returns the number of changed events.
    pub fn migrate_doc_fields(&self) -> Result<usize> {
        let mut changed_events = 0;
        let mut patch = Map::new();

        for mut entry in self.list_entries()? {
            let changed = entry
                .location_history
                .iter_mut()
                .map(|event| event.backfill_doc_fields())
                .filter(|changed| *changed)
                .count();
            if changed > 0 {
                changed_events += changed;
                patch.insert(
                    format!("{}/locationHistory", entry.id),
                    serde_json::to_value(&entry.location_history).map_err(StoreError::from)?,
                );
            }
        }

        if !patch.is_empty() {
            self.store.update(&KeyPath::root().child("entries")?, &patch)?;
        }
        tracing::info!(changed_events, "migrated document fields");

        Ok(changed_events)
    }

    // Refuses to place `location` onto a defined shelf that is already full.
    // The entry being moved does not count against its own shelf.
    fn check_shelf_capacity(&self, location: &Location, moved: Option<&Entry>) -> Result<()> {
        let shelf_id = match location.shelf_id() {
            Some(shelf_id) => shelf_id,
            None => return Ok(()),
        };
        if moved.and_then(|entry| entry.location.shelf_id()).as_deref() == Some(shelf_id.as_str()) {
            return Ok(());
        }

        match self.shelf_usage(&shelf_id)? {
            Some(usage) if usage.is_full() => Err(InventoryError::ShelfFull {
                shelf: shelf_id,
                capacity: usage.capacity,
            }),
            _ => Ok(()),
        }
    }

    fn read_collection<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let documents: Option<BTreeMap<String, T>> =
            self.store.get_typed(&KeyPath::root().child(name)?)?;
        Ok(documents
            .map(|documents| documents.into_values().collect())
            .unwrap_or_default())
    }
}

fn entry_path(id: &str) -> Result<KeyPath> {
    Ok(KeyPath::root().child("entries")?.child(id)?)
}

fn history_path(id: &str) -> Result<KeyPath> {
    Ok(entry_path(id)?.child("locationHistory")?)
}

fn location_snapshot(location: &Location) -> String {
    if location.is_empty() {
        UNKNOWN_LOCATION.to_string()
    } else {
        location.snapshot()
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// ISO-8601 text with millisecond precision, e.g. `2024-03-01T08:30:00.000Z`.
pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn now_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    format_timestamp(&now.naive_utc())
}
