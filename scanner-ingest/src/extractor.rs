use async_trait::async_trait;
use scanner_core::{ExtractionError, ExtractionResult, RequestTicket, Resolution, ScanSession};

use crate::payload::DocumentPayload;

/// Turns a statement document into structured transactions.
///
/// One call is one attempt: implementations do not retry, and the same
/// document may come back slightly different on each call.
#[async_trait]
pub trait StatementExtractor: Send + Sync {
    async fn extract(&self, payload: &DocumentPayload) -> Result<ExtractionResult, ExtractionError>;
}

/// Submit `payload` to `session`, run the extractor and deliver the outcome.
pub async fn scan_document<E>(
    session: &mut ScanSession,
    extractor: &E,
    payload: &DocumentPayload,
) -> (RequestTicket, Resolution)
where
    E: StatementExtractor + ?Sized,
{
    let ticket = session.submit(payload.source());
    let outcome = extractor.extract(payload).await;
    let resolution = session.resolve(ticket, outcome);
    (ticket, resolution)
}
