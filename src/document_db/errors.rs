use super::db_migration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentDBError {
    #[error("database migration failed")]
    DBMigrationError {
        #[from]
        source: db_migration::MigrationError,
    },
    #[error("can not open the database")]
    DBConnectionError {
        #[from]
        source: diesel::result::ConnectionError,
    },
    #[error("SQL error")]
    GenericSQLError {
        #[from]
        source: diesel::result::Error,
    },
    #[error("stored document '{path}' is corrupted")]
    CorruptedDocument {
        path: String,
        source: serde_json::Error,
    },
}
pub type Result<T> = std::result::Result<T, DocumentDBError>;
