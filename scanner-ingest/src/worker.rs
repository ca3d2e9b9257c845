use scanner_core::{ExtractionError, ExtractionResult, RequestTicket};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::extractor::StatementExtractor;
use crate::payload::DocumentPayload;

#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub request_id: u64,
    pub payload: DocumentPayload,
}

#[derive(Debug)]
pub enum ExtractEvent {
    Started {
        request_id: u64,
    },
    Completed {
        request_id: u64,
        result: ExtractionResult,
    },
    Failed {
        request_id: u64,
        error: ExtractionError,
    },
}

impl ExtractEvent {
    pub fn request_id(&self) -> u64 {
        match self {
            ExtractEvent::Started { request_id }
            | ExtractEvent::Completed { request_id, .. }
            | ExtractEvent::Failed { request_id, .. } => *request_id,
        }
    }

    pub fn ticket(&self) -> RequestTicket {
        RequestTicket {
            request_id: self.request_id(),
        }
    }
}

/// Run each request on its own task and report back tagged with its id.
///
/// Earlier requests are left to finish; whoever consumes the events decides
/// whether an outcome is still wanted.
pub async fn run_worker<E>(
    extractor: Arc<E>,
    mut rx: mpsc::UnboundedReceiver<ExtractRequest>,
    tx: mpsc::UnboundedSender<ExtractEvent>,
) where
    E: StatementExtractor + ?Sized + 'static,
{
    while let Some(req) = rx.recv().await {
        let extractor = extractor.clone();
        let tx2 = tx.clone();
        tokio::spawn(async move {
            let request_id = req.request_id;
            let _ = tx2.send(ExtractEvent::Started { request_id });

            let event = match extractor.extract(&req.payload).await {
                Ok(result) => ExtractEvent::Completed { request_id, result },
                Err(error) => ExtractEvent::Failed { request_id, error },
            };
            if tx2.send(event).is_err() {
                tracing::debug!(request_id, "event receiver gone; dropping outcome");
            }
        });
    }
}

/// Handle to a spawned extraction worker.
pub struct ExtractionHandle {
    requests: mpsc::UnboundedSender<ExtractRequest>,
    events: mpsc::UnboundedReceiver<ExtractEvent>,
}

impl ExtractionHandle {
    pub fn spawn<E>(extractor: Arc<E>) -> Self
    where
        E: StatementExtractor + ?Sized + 'static,
    {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(extractor, req_rx, ev_tx));
        Self {
            requests: req_tx,
            events: ev_rx,
        }
    }

    /// Queue `payload` under the id of `ticket`. Returns false if the worker has stopped.
    pub fn submit(&self, ticket: RequestTicket, payload: DocumentPayload) -> bool {
        self.requests
            .send(ExtractRequest {
                request_id: ticket.request_id,
                payload,
            })
            .is_ok()
    }

    pub async fn next_event(&mut self) -> Option<ExtractEvent> {
        self.events.recv().await
    }
}
