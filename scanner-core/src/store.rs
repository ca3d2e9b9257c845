//! StatementStore — the current extraction result plus a single edit session.
//!
//! Rules:
//! - `load` replaces the result wholesale and drops any edit in progress.
//! - At most one row is being edited. Its working copy is private until
//!   `commit_edit`, which replaces the row at the same index.
//! - Edits never add or remove rows; `transactions.len()` is fixed between loads.

use crate::error::EditError;
use crate::model::{ExtractionResult, Transaction, TransactionField};

#[derive(Debug, Clone, PartialEq)]
struct EditSession {
    index: usize,
    working: Transaction,
}

#[derive(Debug, Default, Clone)]
pub struct StatementStore {
    current: Option<ExtractionResult>,
    edit: Option<EditSession>,
}

impl StatementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        self.current.as_ref()
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.current
            .as_ref()
            .map(|r| r.transactions.as_slice())
            .unwrap_or(&[])
    }

    pub fn load(&mut self, result: ExtractionResult) {
        tracing::debug!(rows = result.len(), "loading extraction result");
        self.edit = None;
        self.current = Some(result);
    }

    /// Drop the result and any edit session.
    pub fn clear(&mut self) {
        self.edit = None;
        self.current = None;
    }

    pub fn active_index(&self) -> Option<usize> {
        self.edit.as_ref().map(|e| e.index)
    }

    pub fn working_copy(&self) -> Option<&Transaction> {
        self.edit.as_ref().map(|e| &e.working)
    }

    /// Start editing row `index`. An edit already in progress is discarded.
    pub fn begin_edit(&mut self, index: usize) -> Result<&Transaction, EditError> {
        let result = self.current.as_ref().ok_or(EditError::NoResult)?;
        let row = result
            .transactions
            .get(index)
            .ok_or(EditError::IndexOutOfRange {
                index,
                len: result.len(),
            })?;

        if let Some(prev) = &self.edit {
            if prev.index != index {
                tracing::debug!(discarded = prev.index, index, "switching edited row");
            }
        }

        let session = self.edit.insert(EditSession {
            index,
            working: row.clone(),
        });
        Ok(&session.working)
    }

    pub fn update_working_field(
        &mut self,
        field: TransactionField,
        raw: &str,
    ) -> Result<&Transaction, EditError> {
        let session = self.edit.as_mut().ok_or(EditError::NoActiveEdit)?;
        session.working.set_field(field, raw);
        Ok(&session.working)
    }

    /// Write the working copy back over its row and end the session.
    pub fn commit_edit(&mut self) -> Result<usize, EditError> {
        let session = self.edit.take().ok_or(EditError::NoActiveEdit)?;
        let result = self.current.as_mut().ok_or(EditError::NoResult)?;
        let len = result.len();
        let slot = result
            .transactions
            .get_mut(session.index)
            .ok_or(EditError::IndexOutOfRange {
                index: session.index,
                len,
            })?;
        *slot = session.working;
        tracing::debug!(index = session.index, "committed row edit");
        Ok(session.index)
    }

    pub fn cancel_edit(&mut self) -> Result<(), EditError> {
        self.edit.take().map(|_| ()).ok_or(EditError::NoActiveEdit)
    }
}
