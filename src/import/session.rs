use super::column_mapping::{ColumnMapping, ImportField};
use super::commit::{self, CommitOutcome, ImportDefaults};
use super::handoff::HandoffSlot;
use super::normalizer::{normalize_row, NormalizedRow};
use super::sheet::{self, CellValue, RawRow, SheetData};
use super::validator::{validate_batch, RowValidation, ValidationContext};
use super::{ImportError, Result};
use crate::document_store::DocumentStore;
use crate::inventory::Inventory;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    FileLoaded,
    Mapping,
    /// Every row validated, `clean` if the batch is ready to be committed.
    Validated { clean: bool },
    Committing,
    Done,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::FileLoaded => write!(f, "file loaded"),
            SessionState::Mapping => write!(f, "mapping"),
            SessionState::Validated { clean: true } => write!(f, "validated (clean)"),
            SessionState::Validated { clean: false } => write!(f, "validated (dirty)"),
            SessionState::Committing => write!(f, "committing"),
            SessionState::Done => write!(f, "done"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// One row of the import batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub raw: RawRow,
    pub normalized: NormalizedRow,
    pub validation: RowValidation,
}

/// Import of one spreadsheet into the history of one entry.
///
/// The session owns the batch. Every change to the mapping or the rows validates the
/// whole batch again. Dropping the session discards the batch without any store write.
pub struct ImportSession<'a, S: DocumentStore> {
    inventory: &'a Inventory<S>,
    target_id: String,
    defaults: ImportDefaults,
    state: SessionState,
    headers: Vec<String>,
    mapping: ColumnMapping,
    rows: Vec<ImportRow>,
    context: Option<ValidationContext>,
}

impl<'a, S: DocumentStore> ImportSession<'a, S> {
    /// Starts an import into the entry `target_id`, which must exist.
    pub fn new(inventory: &'a Inventory<S>, target_id: &str) -> Result<Self> {
        inventory.find_entry(target_id)?;

        Ok(ImportSession {
            inventory,
            target_id: target_id.to_string(),
            defaults: ImportDefaults::default(),
            state: SessionState::Idle,
            headers: Vec::new(),
            mapping: ColumnMapping::new(),
            rows: Vec::new(),
            context: None,
        })
    }

    /// Starts the session handed over through `slot` and loads its file.
    /// None if the slot holds no payload.
    pub fn from_handoff(inventory: &'a Inventory<S>, slot: &HandoffSlot) -> Result<Option<Self>> {
        let payload = match slot.take() {
            Some(payload) => payload,
            None => return Ok(None),
        };

        let mut session = Self::new(inventory, &payload.target_file_id)?;
        session.load_bytes(&payload.file_data)?;
        Ok(Some(session))
    }

    pub fn with_defaults(mut self, defaults: ImportDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn rows(&self) -> &[ImportRow] {
        &self.rows
    }

    pub fn invalid_row_count(&self) -> usize {
        self.rows.iter().filter(|row| !row.validation.is_valid).count()
    }

    /// True if the batch has rows, all of them valid, and every required field is mapped.
    pub fn is_ready(&self) -> bool {
        !self.rows.is_empty() && self.invalid_row_count() == 0 && self.mapping.missing_required().is_empty()
    }

    /// Loads the sheet into the batch, guessing an initial mapping from its headers.
    pub fn load_sheet(&mut self, sheet: SheetData) -> Result<()> {
        self.check_state("load a file", |state| state == SessionState::Idle)?;

        self.mapping = ColumnMapping::guess(&sheet.headers);
        self.headers = sheet.headers;
        self.rows = sheet
            .rows
            .into_iter()
            .map(|raw| ImportRow {
                raw,
                normalized: NormalizedRow::default(),
                validation: RowValidation::default(),
            })
            .collect();
        self.state = SessionState::FileLoaded;
        tracing::debug!(target_id = %self.target_id, rows = self.rows.len(), "loaded import batch");

        Ok(())
    }

    /// Reads the spreadsheet at `path`. On parse errors the session stays idle.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        self.check_state("load a file", |state| state == SessionState::Idle)?;
        let sheet = sheet::read_spreadsheet(path)?;
        self.load_sheet(sheet)
    }

    pub fn load_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.check_state("load a file", |state| state == SessionState::Idle)?;
        let sheet = sheet::read_spreadsheet_bytes("uploaded file", data)?;
        self.load_sheet(sheet)
    }

    /// Maps `header` onto `field` (None unmaps it) and validates the batch again.
    pub fn set_mapping(&mut self, header: &str, field: Option<ImportField>) -> Result<()> {
        self.check_editable("change the mapping")?;
        self.check_header(header)?;

        self.mapping.set(header, field);
        self.revalidate()
    }

    pub fn edit_cell(&mut self, index: usize, header: &str, value: CellValue) -> Result<()> {
        self.check_editable("edit a cell")?;
        self.check_header(header)?;

        let row = self
            .rows
            .get_mut(index)
            .ok_or(ImportError::RowOutOfRange { index })?;
        row.raw.insert(header.to_string(), value);
        self.revalidate()
    }

    pub fn delete_row(&mut self, index: usize) -> Result<()> {
        self.check_editable("delete a row")?;
        if index >= self.rows.len() {
            return Err(ImportError::RowOutOfRange { index });
        }

        self.rows.remove(index);
        self.revalidate()
    }

    /// Reloads the target entry and its file type from the store and validates every row.
    pub fn validate(&mut self) -> Result<()> {
        self.check_editable("validate")?;
        self.context = Some(ValidationContext::load(self.inventory, &self.target_id)?);
        self.revalidate()
    }

    /// Appends all rows to the history of the target entry.
    ///
    /// The batch is validated against the current store contents first. Nothing is
    /// written if a required field is not mapped or any row is invalid. If the write
    /// fails the session is `Failed` with the batch kept for another attempt.
    pub fn commit(&mut self) -> Result<CommitOutcome> {
        self.check_state("commit", |state| {
            matches!(state, SessionState::Validated { .. } | SessionState::Failed)
        })?;

        let missing = self.mapping.missing_required();
        if !missing.is_empty() {
            tracing::warn!(target_id = %self.target_id, ?missing, "refused commit, mapping incomplete");
            return Err(ImportError::MappingIncomplete { missing });
        }
        if self.rows.is_empty() {
            tracing::warn!(target_id = %self.target_id, "refused commit, empty batch");
            return Err(ImportError::EmptyBatch);
        }

        // Catches conflicts created since the last validation
        let context = ValidationContext::load(self.inventory, &self.target_id)?;
        let target = context.target().clone();
        self.context = Some(context);
        self.revalidate()?;

        let invalid = self.invalid_row_count();
        if invalid > 0 {
            tracing::warn!(target_id = %self.target_id, invalid, "refused commit, invalid rows");
            return Err(ImportError::InvalidRows { count: invalid });
        }
        let normalized: Vec<NormalizedRow> = self.rows.iter().map(|row| row.normalized.clone()).collect();

        self.state = SessionState::Committing;
        match commit::commit_rows(self.inventory, &target, &normalized, &self.defaults) {
            Ok(outcome) => {
                self.state = SessionState::Done;
                tracing::info!(
                    target_id = %self.target_id,
                    added = outcome.added_events,
                    history = outcome.history_len,
                    "committed import"
                );
                Ok(outcome)
            }
            Err(source) => {
                self.state = SessionState::Failed;
                tracing::warn!(target_id = %self.target_id, error = %source, "import commit failed");
                Err(ImportError::CommitWrite { source })
            }
        }
    }

    // Normalizes and validates every row, the batch as a whole decides about each row.
    fn revalidate(&mut self) -> Result<()> {
        if self.context.is_none() {
            self.context = Some(ValidationContext::load(self.inventory, &self.target_id)?);
        }
        self.state = SessionState::Mapping;

        for row in &mut self.rows {
            row.normalized = normalize_row(&row.raw, &self.headers, &self.mapping);
        }
        let normalized: Vec<NormalizedRow> = self.rows.iter().map(|row| row.normalized.clone()).collect();
        if let Some(context) = &self.context {
            for (row, validation) in self.rows.iter_mut().zip(validate_batch(&normalized, context)) {
                row.validation = validation;
            }
        }

        self.state = SessionState::Validated {
            clean: self.is_ready(),
        };
        Ok(())
    }

    fn check_editable(&self, operation: &'static str) -> Result<()> {
        self.check_state(operation, |state| {
            !matches!(state, SessionState::Idle | SessionState::Committing | SessionState::Done)
        })
    }

    fn check_state<F: Fn(SessionState) -> bool>(&self, operation: &'static str, allowed: F) -> Result<()> {
        if allowed(self.state) {
            Ok(())
        } else {
            Err(ImportError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn check_header(&self, header: &str) -> Result<()> {
        if self.headers.iter().any(|known| known == header) {
            Ok(())
        } else {
            Err(ImportError::UnknownColumn {
                header: header.to_string(),
            })
        }
    }
}
