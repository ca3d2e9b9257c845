//! ScanSession — one user's scan workflow around a [`StatementStore`].
//!
//! Status machine: Idle -> Processing -> Success | Error, and back to
//! Processing on every new submission.
//!
//! Single-flight: each submission gets a ticket with a higher request id than
//! any before it. Only the outcome carrying the latest id may touch the store;
//! anything older is dropped as superseded. While Processing, edits are refused.

use crate::error::{EditError, ExtractionError, ReadError};
use crate::model::{ExtractionResult, Transaction, TransactionField};
use crate::store::StatementStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Idle,
    Processing,
    Success,
    Error,
}

/// The document a submission was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSource {
    pub file_name: String,
    pub mime_type: String,
}

/// Proof of submission. Outcomes are matched back to their request through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub request_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Failed,
    /// A newer submission exists; the outcome was ignored
    Superseded,
}

#[derive(Debug)]
pub struct ScanSession {
    store: StatementStore,
    status: ScanStatus,
    latest_request: u64,
    source: Option<ScanSource>,
    error: Option<String>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            store: StatementStore::new(),
            status: ScanStatus::Idle,
            latest_request: 0,
            source: None,
            error: None,
        }
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn is_processing(&self) -> bool {
        self.status == ScanStatus::Processing
    }

    pub fn store(&self) -> &StatementStore {
        &self.store
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        self.store.result()
    }

    pub fn source(&self) -> Option<&ScanSource> {
        self.source.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start a new extraction. The previous result is discarded.
    pub fn submit(&mut self, source: ScanSource) -> RequestTicket {
        self.latest_request += 1;
        tracing::debug!(
            request_id = self.latest_request,
            file = %source.file_name,
            "submitting document"
        );
        self.store.clear();
        self.error = None;
        self.source = Some(source);
        self.status = ScanStatus::Processing;
        RequestTicket {
            request_id: self.latest_request,
        }
    }

    fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.request_id == self.latest_request && self.status == ScanStatus::Processing
    }

    /// Deliver the outcome of the extraction issued for `ticket`.
    pub fn resolve(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<ExtractionResult, ExtractionError>,
    ) -> Resolution {
        if !self.is_current(ticket) {
            tracing::debug!(
                request_id = ticket.request_id,
                latest = self.latest_request,
                "dropping superseded extraction outcome"
            );
            return Resolution::Superseded;
        }

        match outcome {
            Ok(result) => {
                self.store.load(result);
                self.status = ScanStatus::Success;
                Resolution::Applied
            }
            Err(e) => {
                tracing::warn!(request_id = ticket.request_id, error = %e, "extraction failed");
                self.error = Some(e.user_message());
                self.status = ScanStatus::Error;
                Resolution::Failed
            }
        }
    }

    /// The document bytes for `ticket` could not be read.
    pub fn fail_read(&mut self, ticket: RequestTicket, err: ReadError) -> Resolution {
        if !self.is_current(ticket) {
            return Resolution::Superseded;
        }
        tracing::warn!(request_id = ticket.request_id, error = %err, "reading document failed");
        self.error = Some(match err {
            ReadError::Io(_) => "File reading failed.".to_string(),
            other => other.to_string(),
        });
        self.status = ScanStatus::Error;
        Resolution::Failed
    }

    fn ensure_idle(&self) -> Result<(), EditError> {
        if self.is_processing() {
            return Err(EditError::Busy);
        }
        Ok(())
    }

    pub fn begin_edit(&mut self, index: usize) -> Result<&Transaction, EditError> {
        self.ensure_idle()?;
        self.store.begin_edit(index)
    }

    pub fn update_working_field(
        &mut self,
        field: TransactionField,
        raw: &str,
    ) -> Result<&Transaction, EditError> {
        self.ensure_idle()?;
        self.store.update_working_field(field, raw)
    }

    pub fn commit_edit(&mut self) -> Result<usize, EditError> {
        self.ensure_idle()?;
        self.store.commit_edit()
    }

    pub fn cancel_edit(&mut self) -> Result<(), EditError> {
        self.store.cancel_edit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> ScanSource {
        ScanSource {
            file_name: name.to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    fn result_with(desc: &str) -> ExtractionResult {
        ExtractionResult::new(vec![Transaction::new("01/01/24", desc, -1.0)])
    }

    #[test]
    fn test_success_loads_store() {
        let mut s = ScanSession::new();
        assert_eq!(s.status(), ScanStatus::Idle);
        let t = s.submit(source("a.png"));
        assert!(s.is_processing());
        assert_eq!(s.resolve(t, Ok(result_with("A"))), Resolution::Applied);
        assert_eq!(s.status(), ScanStatus::Success);
        assert_eq!(s.store().transactions()[0].description, "A");
    }

    #[test]
    fn test_late_response_from_earlier_file_is_discarded() {
        let mut s = ScanSession::new();
        let a = s.submit(source("a.png"));
        let b = s.submit(source("b.png"));

        assert_eq!(s.resolve(b, Ok(result_with("B"))), Resolution::Applied);
        assert_eq!(s.resolve(a, Ok(result_with("A"))), Resolution::Superseded);

        assert_eq!(s.store().transactions()[0].description, "B");
        assert_eq!(s.source().unwrap().file_name, "b.png");
    }

    #[test]
    fn test_earlier_response_ignored_while_newer_in_flight() {
        let mut s = ScanSession::new();
        let a = s.submit(source("a.png"));
        let b = s.submit(source("b.png"));

        assert_eq!(s.resolve(a, Ok(result_with("A"))), Resolution::Superseded);
        assert!(s.result().is_none());
        assert!(s.is_processing());

        let err = ExtractionError::EmptyResponse;
        assert_eq!(s.resolve(b, Err(err)), Resolution::Failed);
        assert!(s.result().is_none());
        assert_eq!(s.status(), ScanStatus::Error);
        assert!(s.error_message().unwrap().contains("No data returned"));
    }

    #[test]
    fn test_duplicate_resolution_is_ignored() {
        let mut s = ScanSession::new();
        let t = s.submit(source("a.png"));
        s.resolve(t, Ok(result_with("first")));
        assert_eq!(s.resolve(t, Ok(result_with("second"))), Resolution::Superseded);
        assert_eq!(s.store().transactions()[0].description, "first");
    }

    #[test]
    fn test_edits_refused_while_processing() {
        let mut s = ScanSession::new();
        let t = s.submit(source("a.png"));
        s.resolve(t, Ok(result_with("A")));
        s.begin_edit(0).unwrap();

        let _next = s.submit(source("b.png"));
        assert_eq!(s.begin_edit(0).unwrap_err(), EditError::Busy);
        assert_eq!(s.commit_edit().unwrap_err(), EditError::Busy);
        assert_eq!(s.store().active_index(), None);
    }

    #[test]
    fn test_read_failure_message() {
        let mut s = ScanSession::new();
        let t = s.submit(source("a.png"));
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(s.fail_read(t, ReadError::Io(io)), Resolution::Failed);
        assert_eq!(s.error_message(), Some("File reading failed."));
    }

    #[test]
    fn test_resubmit_after_error_clears_message() {
        let mut s = ScanSession::new();
        let t = s.submit(source("a.png"));
        s.resolve(t, Err(ExtractionError::Malformed("x".into())));
        assert!(s.error_message().is_some());
        let t2 = s.submit(source("a.png"));
        assert_eq!(s.error_message(), None);
        s.resolve(t2, Ok(result_with("ok")));
        assert_eq!(s.status(), ScanStatus::Success);
    }
}
