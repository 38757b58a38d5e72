use std::cell::RefCell;

/// What the file picker hands over to the import view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffPayload {
    /// Raw contents of the spreadsheet file.
    pub file_data: Vec<u8>,
    pub target_file_id: String,
}

/// Short-lived slot passing one payload to the import session. A payload can be taken once.
#[derive(Debug, Default)]
pub struct HandoffSlot {
    payload: RefCell<Option<HandoffPayload>>,
}

impl HandoffSlot {
    pub fn new() -> HandoffSlot {
        Self::default()
    }

    /// Stores `payload`, returning a payload that was never taken.
    pub fn put(&self, payload: HandoffPayload) -> Option<HandoffPayload> {
        self.payload.replace(Some(payload))
    }

    pub fn take(&self) -> Option<HandoffPayload> {
        self.payload.take()
    }
}
