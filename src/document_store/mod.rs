use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

mod errors;
pub use self::errors::*;
mod key_path;
pub use self::key_path::KeyPath;
mod subscriptions;
pub use self::subscriptions::{Subscription, SubscriptionRegistry};
pub mod tree;

/// Abstraction layer above the hierarchical document store holding all application data.
///
/// Documents are JSON trees addressed by key paths (`entries/<id>/locationHistory`).
/// Two implementations exist:
/// 1) `document_db::DocumentDB` persisting the tree in a SQLite database
/// 2) `InMemoryDocumentStore` keeping it in memory (tests, throw away sessions)
///
/// Stores are used through shared references. All writes are atomic per call: either
/// every part of the write is applied or none of it.
pub trait DocumentStore {
    /// Point read of the subtree at `path`, None if nothing is stored there.
    fn get(&self, path: &KeyPath) -> Result<Option<Value>>;

    /// Overwrites the subtree at `path`. Writing `null` removes it.
    fn set(&self, path: &KeyPath, value: Value) -> Result<()>;

    /// Multi-path patch: every key of `patch` is a path relative to `path` that is
    /// overwritten with its value. Siblings not named in the patch stay untouched.
    fn update(&self, path: &KeyPath, patch: &Map<String, Value>) -> Result<()>;

    fn remove(&self, path: &KeyPath) -> Result<()> {
        self.set(path, Value::Null)
    }

    /// Calls `callback` with the current value at `path` and again after every write that
    /// changes the subtree (writes to the path itself, its ancestors or its descendants).
    ///
    /// The order in which callbacks of different subscriptions run is unspecified.
    fn subscribe<F>(&self, path: &KeyPath, callback: F) -> Result<Subscription>
    where
        F: FnMut(Option<&Value>) + 'static;

    fn get_typed<T: DeserializeOwned>(&self, path: &KeyPath) -> Result<Option<T>> {
        match self.get(path)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn set_typed<T: Serialize>(&self, path: &KeyPath, value: &T) -> Result<()> {
        self.set(path, serde_json::to_value(value)?)
    }
}

/// Resolves the keys of a multi-path patch to absolute paths.
pub(crate) fn patch_writes(base: &KeyPath, patch: &Map<String, Value>) -> Result<Vec<(KeyPath, Value)>> {
    patch
        .iter()
        .map(|(relative, value)| Ok((base.join(&KeyPath::parse(relative)?), value.clone())))
        .collect()
}

// Actual Implementations in Sub-Modules
mod in_memory_store;
pub use self::in_memory_store::InMemoryDocumentStore;
