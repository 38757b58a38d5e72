mod db_migration;
// Database schema - must be kept up to date manually
mod entity;
pub use self::entity::*;
mod errors;
pub use self::errors::*;
mod schema;

use crate::document_store::{self, tree, DocumentStore, KeyPath, Subscription, SubscriptionRegistry};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sqlite::SqliteConnection;
use serde_json::{Map, Value};

/// Document store persisting the document tree in a SQLite database.
///
/// The tree is split into rows, each row holding one subtree as JSON text keyed by its
/// key path. Rows never overlap, i.e. no stored path is an ancestor of another one.
/// A write below a stored row rewrites that row, a write above stored rows replaces them.
pub struct DocumentDB {
    conn: SqliteConnection,
    listeners: SubscriptionRegistry,
}

impl DocumentDB {
    /// Opens the document db file located at the given path and performs data migrations to
    /// the current application version if required. Use ":memory:" for a throw away database.
    pub fn open(path: &str) -> Result<DocumentDB> {
        let result = DocumentDB {
            conn: SqliteConnection::establish(path)?,
            listeners: SubscriptionRegistry::new(),
        };

        result.default_db_settings()?;
        result.upgrade_db()?;

        Ok(result)
    }

    /// Number of rows the tree is currently split into.
    pub fn row_count(&self) -> Result<i64> {
        use self::schema::documents;

        Ok(documents::table.count().get_result(&self.conn)?)
    }

    /// Rebuilds the database file, reclaiming space left by removed documents.
    pub fn optimize_database(&self) -> Result<()> {
        sql_query("VACUUM").execute(&self.conn)?;
        Ok(())
    }

    // The row stored at `path` or at one of its ancestors (at most one exists).
    fn load_covering_row(&self, path: &KeyPath) -> document_store::Result<Option<DocumentRow>> {
        use self::schema::documents;

        let mut candidates: Vec<String> = path.ancestors().iter().map(|p| p.to_string()).collect();
        candidates.push(path.to_string());

        Ok(documents::table
            .filter(documents::path.eq_any(candidates))
            .first::<DocumentRow>(&self.conn)
            .optional()?)
    }

    // All rows stored strictly below `path`.
    fn load_descendant_rows(&self, path: &KeyPath) -> document_store::Result<Vec<DocumentRow>> {
        use self::schema::documents;

        if path.is_root() {
            return Ok(documents::table.load::<DocumentRow>(&self.conn)?);
        }

        // LIKE treats '_' and '%' as wildcards and ignores case, it only narrows the search.
        let prefix = format!("{}/", path);
        let rows = documents::table
            .filter(documents::path.like(format!("{}%", prefix)))
            .load::<DocumentRow>(&self.conn)?;
        Ok(rows
            .into_iter()
            .filter(|row| row.path.starts_with(&prefix))
            .collect())
    }

    fn read(&self, path: &KeyPath) -> document_store::Result<Option<Value>> {
        if let Some(row) = self.load_covering_row(path)? {
            let row_path = KeyPath::parse(&row.path)?;
            let row_value = parse_row(&row)?;
            let below_row = path.strip_prefix(&row_path).unwrap_or(&[]);
            return Ok(tree::value_at(&row_value, below_row).cloned());
        }

        let mut result = Value::Object(Map::new());
        for row in self.load_descendant_rows(path)? {
            let row_path = KeyPath::parse(&row.path)?;
            let below_path = row_path.strip_prefix(path).unwrap_or(&[]);
            tree::set_at(&mut result, below_path, parse_row(&row)?)?;
        }
        Ok(tree::prune(result))
    }

    // Must run inside a transaction, a write can touch several rows.
    fn write(&self, path: &KeyPath, value: Value) -> document_store::Result<()> {
        use self::schema::documents;

        let now = chrono::Utc::now().naive_utc();

        if let Some(row) = self.load_covering_row(path)? {
            if row.path != path.to_string() {
                // Write below an existing row: patch the row's JSON.
                let row_path = KeyPath::parse(&row.path)?;
                let mut row_value = parse_row(&row)?;
                let below_row = path.strip_prefix(&row_path).unwrap_or(&[]);
                tree::set_at(&mut row_value, below_row, value)?;

                match tree::prune(row_value) {
                    Some(row_value) => {
                        diesel::update(documents::table.filter(documents::path.eq(&row.path)))
                            .set((
                                documents::value.eq(serde_json::to_string(&row_value)?),
                                documents::updated_at.eq(&now),
                            ))
                            .execute(&self.conn)?;
                    }
                    None => {
                        diesel::delete(documents::table.filter(documents::path.eq(&row.path)))
                            .execute(&self.conn)?;
                    }
                }
                return Ok(());
            }
        }

        // Replace the row at `path` and everything stored below it.
        let mut replaced: Vec<String> = self
            .load_descendant_rows(path)?
            .into_iter()
            .map(|row| row.path)
            .collect();
        replaced.push(path.to_string());
        diesel::delete(documents::table.filter(documents::path.eq_any(replaced)))
            .execute(&self.conn)?;

        if let Some(value) = tree::prune(value) {
            let path_string = path.to_string();
            let value_string = serde_json::to_string(&value)?;
            diesel::insert_into(documents::table)
                .values(document_row::InsertFull {
                    path: &path_string,
                    value: &value_string,
                    updated_at: &now,
                })
                .execute(&self.conn)?;
        }

        Ok(())
    }

    fn write_all(&self, writes: Vec<(KeyPath, Value)>) -> document_store::Result<()> {
        self.conn
            .transaction::<_, document_store::StoreError, _>(|| {
                for (path, value) in &writes {
                    self.write(path, value.clone())?;
                }
                Ok(())
            })?;

        let written: Vec<KeyPath> = writes.into_iter().map(|(path, _)| path).collect();
        self.listeners.notify(&written, |path| self.read(path));
        Ok(())
    }

    fn upgrade_db(&self) -> db_migration::Result<()> {
        self.conn
            .transaction(|| db_migration::upgrade_db(&self.conn))?;

        Ok(())
    }

    fn default_db_settings(&self) -> Result<()> {
        sql_query("PRAGMA journal_mode = WAL").execute(&self.conn)?;
        sql_query("PRAGMA foreign_keys = 1").execute(&self.conn)?;

        Ok(())
    }
}

fn parse_row(row: &DocumentRow) -> document_store::Result<Value> {
    serde_json::from_str(&row.value).map_err(|source| {
        DocumentDBError::CorruptedDocument {
            path: row.path.clone(),
            source,
        }
        .into()
    })
}

impl DocumentStore for DocumentDB {
    fn get(&self, path: &KeyPath) -> document_store::Result<Option<Value>> {
        tracing::debug!(%path, "get");
        self.read(path)
    }

    fn set(&self, path: &KeyPath, value: Value) -> document_store::Result<()> {
        tracing::debug!(%path, "set");
        self.write_all(vec![(path.clone(), value)])
    }

    fn update(&self, path: &KeyPath, patch: &Map<String, Value>) -> document_store::Result<()> {
        tracing::debug!(%path, keys = patch.len(), "update");
        let writes = document_store::patch_writes(path, patch)?;
        if writes.is_empty() {
            return Ok(());
        }
        self.write_all(writes)
    }

    fn subscribe<F>(&self, path: &KeyPath, mut callback: F) -> document_store::Result<Subscription>
    where
        F: FnMut(Option<&Value>) + 'static,
    {
        let current = self.read(path)?;
        callback(current.as_ref());
        Ok(self.listeners.register(path, callback))
    }
}
