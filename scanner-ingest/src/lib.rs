//! scanner-ingest: statement extraction through a vision model (request contract,
//! Gemini client, response decoding) and the extraction worker.

pub mod decode;
pub mod extractor;
pub mod gemini;
pub mod payload;
pub mod request;
pub mod worker;

pub use decode::decode_extraction;
pub use extractor::{StatementExtractor, scan_document};
pub use gemini::{GeminiConfig, GeminiExtractor};
pub use payload::DocumentPayload;
pub use worker::{ExtractEvent, ExtractRequest, ExtractionHandle};
