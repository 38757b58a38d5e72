use super::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("can not read or write the database version")]
    ReadWriteDBVersion { source: diesel::result::Error },
    #[error("unknown database version {version}")]
    UnknownDBVersion { version: DBVersion },
    #[error("migration statement failed")]
    SQLError {
        #[from]
        source: diesel::result::Error,
    },
}
pub type Result<T> = std::result::Result<T, MigrationError>;
