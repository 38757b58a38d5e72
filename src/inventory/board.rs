use super::{new_id, now_timestamp, Inventory, InventoryError, Result};
use crate::document_store::{DocumentStore, KeyPath};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// To-do item on the dashboard (`tasks/<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub created_at: String,
}

/// Free-form note on the dashboard (`notes/<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

impl<S: DocumentStore> Inventory<S> {
    pub fn add_task(&self, title: &str, due_date: Option<&str>) -> Result<Task> {
        if title.trim().is_empty() {
            return Err(InventoryError::MissingField { field: "title" });
        }

        let task = Task {
            id: new_id(),
            title: title.trim().to_string(),
            done: false,
            due_date: due_date.map(str::to_string),
            created_at: now_timestamp(),
        };
        self.store.set_typed(&task_path(&task.id)?, &task)?;

        Ok(task)
    }

    /// Open tasks first, each group ordered by creation time.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self.read_collection("tasks")?;
        tasks.sort_by(|a, b| a.done.cmp(&b.done).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(tasks)
    }

    pub fn set_task_done(&self, id: &str, done: bool) -> Result<()> {
        let path = task_path(id)?;
        if self.store.get(&path)?.is_none() {
            return Err(InventoryError::TaskNotFound { id: id.to_string() });
        }

        self.store.set(&path.child("done")?, json!(done))?;
        Ok(())
    }

    /// Flips the done flag of a task and returns the new value.
    pub fn toggle_task(&self, id: &str) -> Result<bool> {
        let task: Task = self
            .store
            .get_typed(&task_path(id)?)?
            .ok_or_else(|| InventoryError::TaskNotFound { id: id.to_string() })?;

        self.set_task_done(id, !task.done)?;
        Ok(!task.done)
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        let path = task_path(id)?;
        if self.store.get(&path)?.is_none() {
            return Err(InventoryError::TaskNotFound { id: id.to_string() });
        }

        self.store.remove(&path)?;
        Ok(())
    }

    pub fn add_note(&self, title: &str, body: &str) -> Result<Note> {
        let now = now_timestamp();
        let note = Note {
            id: new_id(),
            title: title.to_string(),
            body: body.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.store.set_typed(&note_path(&note.id)?, &note)?;

        Ok(note)
    }

    /// Most recently changed notes first.
    pub fn list_notes(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self.read_collection("notes")?;
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    pub fn update_note(&self, id: &str, title: &str, body: &str) -> Result<()> {
        let path = note_path(id)?;
        if self.store.get(&path)?.is_none() {
            return Err(InventoryError::NoteNotFound { id: id.to_string() });
        }

        let mut patch = Map::new();
        patch.insert("title".to_string(), Value::String(title.to_string()));
        patch.insert("body".to_string(), Value::String(body.to_string()));
        patch.insert("updatedAt".to_string(), Value::String(now_timestamp()));
        self.store.update(&path, &patch)?;

        Ok(())
    }

    pub fn delete_note(&self, id: &str) -> Result<()> {
        let path = note_path(id)?;
        if self.store.get(&path)?.is_none() {
            return Err(InventoryError::NoteNotFound { id: id.to_string() });
        }

        self.store.remove(&path)?;
        Ok(())
    }
}

fn task_path(id: &str) -> Result<KeyPath> {
    Ok(KeyPath::root().child("tasks")?.child(id)?)
}

fn note_path(id: &str) -> Result<KeyPath> {
    Ok(KeyPath::root().child("notes")?.child(id)?)
}
