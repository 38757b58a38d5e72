use super::*;
use std::cell::{Cell, RefCell};

/// Document store keeping the whole tree in memory.
///
/// Used for tests and short lived sessions. Offers hooks to simulate a store that rejects
/// writes (e.g. missing permissions or a lost connection).
pub struct InMemoryDocumentStore {
    // The store is not mutable to the outside, similar to a database connection.
    root: RefCell<Value>,
    listeners: SubscriptionRegistry,
    reject_writes: Cell<bool>,
}

impl InMemoryDocumentStore {
    pub fn new() -> InMemoryDocumentStore {
        InMemoryDocumentStore {
            root: RefCell::new(Value::Object(Map::new())),
            listeners: SubscriptionRegistry::new(),
            reject_writes: Cell::new(false),
        }
    }

    /// Creates a store holding the given tree.
    pub fn from_value(value: Value) -> InMemoryDocumentStore {
        let store = Self::new();
        *store.root.borrow_mut() = tree::prune(value).unwrap_or_else(|| Value::Object(Map::new()));
        store
    }

    /// Makes every following write fail with `StoreError::WriteRejected` (testing only).
    pub fn test_reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }

    pub fn subscription_count(&self) -> usize {
        self.listeners.active_count()
    }

    fn read(&self, path: &KeyPath) -> Result<Option<Value>> {
        Ok(tree::value_at(&self.root.borrow(), path.keys()).cloned())
    }

    // Applies all writes to a copy of the tree and only swaps it in if every write succeeds.
    fn write_all(&self, writes: Vec<(KeyPath, Value)>) -> Result<()> {
        if self.reject_writes.get() {
            let path = writes
                .first()
                .map(|(path, _)| path.to_string())
                .unwrap_or_default();
            return Err(StoreError::WriteRejected { path });
        }

        let mut next = self.root.borrow().clone();
        for (path, value) in &writes {
            tree::set_at(&mut next, path.keys(), value.clone())?;
        }
        if next.is_null() {
            next = Value::Object(Map::new());
        }
        *self.root.borrow_mut() = next;

        let written: Vec<KeyPath> = writes.into_iter().map(|(path, _)| path).collect();
        self.listeners.notify(&written, |path| self.read(path));
        Ok(())
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, path: &KeyPath) -> Result<Option<Value>> {
        tracing::debug!(%path, "get");
        self.read(path)
    }

    fn set(&self, path: &KeyPath, value: Value) -> Result<()> {
        tracing::debug!(%path, "set");
        self.write_all(vec![(path.clone(), value)])
    }

    fn update(&self, path: &KeyPath, patch: &Map<String, Value>) -> Result<()> {
        tracing::debug!(%path, keys = patch.len(), "update");
        let writes = patch_writes(path, patch)?;
        if writes.is_empty() {
            return Ok(());
        }
        self.write_all(writes)
    }

    fn subscribe<F>(&self, path: &KeyPath, mut callback: F) -> Result<Subscription>
    where
        F: FnMut(Option<&Value>) + 'static,
    {
        let current = self.read(path)?;
        callback(current.as_ref());
        Ok(self.listeners.register(path, callback))
    }
}
