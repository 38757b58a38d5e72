use crate::document_db::DocumentDBError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid key path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("can not write '{path}': list index out of range")]
    IndexOutOfRange { path: String },
    #[error("the store rejected the write to '{path}'")]
    WriteRejected { path: String },
    #[error("malformed document")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    #[error("document database failure")]
    Database {
        #[from]
        source: DocumentDBError,
    },
}
pub type Result<T> = std::result::Result<T, StoreError>;

// Lets diesel transactions run closures that return store errors.
impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Database {
            source: DocumentDBError::from(error),
        }
    }
}
