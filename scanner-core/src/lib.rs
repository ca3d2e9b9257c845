//! scanner-core: statement record types, the editable result store and the scan session.

pub mod error;
pub mod model;
pub mod session;
pub mod store;

pub use error::{
    CLARITY_HINT, CONNECTION_HINT, EditError, ExtractionError, KEY_HINT, MODEL_HINT, QUOTA_HINT,
    ReadError,
};
pub use model::{Amount, ExtractionResult, Transaction, TransactionField};
pub use session::{RequestTicket, Resolution, ScanSession, ScanSource, ScanStatus};
pub use store::StatementStore;
