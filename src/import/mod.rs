//! Document history import: spreadsheet rows are mapped onto history event fields,
//! validated against the existing history and appended to an entry in one write.
//!
//! The stages are pure functions over small in-memory collections, `ImportSession` owns
//! the batch and drives them:
//! 1) `sheet`: read the first worksheet into a header row and raw rows
//! 2) `column_mapping`: header -> field configuration
//! 3) `normalizer`: raw row -> `NormalizedRow`
//! 4) `validator`: uniqueness of document numbers and positions
//! 5) `commit`: build the history events and write them
use crate::inventory::InventoryError;
use thiserror::Error;

pub mod column_mapping;
pub use self::column_mapping::{ColumnMapping, ImportField};
pub mod commit;
pub use self::commit::{CommitOutcome, ImportDefaults};
pub mod handoff;
pub use self::handoff::{HandoffPayload, HandoffSlot};
pub mod normalizer;
pub use self::normalizer::NormalizedRow;
mod session;
pub use self::session::{ImportRow, ImportSession, SessionState};
pub mod sheet;
pub use self::sheet::{CellValue, RawRow, SheetData};
pub mod validator;
pub use self::validator::{RowValidation, ValidationContext};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("can not read '{source_name}' as a spreadsheet: {reason}")]
    FileParse { source_name: String, reason: String },
    #[error("required fields are not mapped to a column: {}", field_list(.missing))]
    MappingIncomplete { missing: Vec<ImportField> },
    #[error("{count} row(s) failed validation")]
    InvalidRows { count: usize },
    #[error("the import batch contains no rows")]
    EmptyBatch,
    #[error("can not {operation} while the import session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    #[error("the sheet has no column '{header}'")]
    UnknownColumn { header: String },
    #[error("the batch has no row {index}")]
    RowOutOfRange { index: usize },
    #[error("writing the imported history failed, nothing was committed")]
    CommitWrite {
        #[source]
        source: InventoryError,
    },
    #[error("inventory failure")]
    Inventory {
        #[from]
        source: InventoryError,
    },
}
pub type Result<T> = std::result::Result<T, ImportError>;

fn field_list(fields: &[ImportField]) -> String {
    fields
        .iter()
        .map(|field| field.key())
        .collect::<Vec<_>>()
        .join(", ")
}
