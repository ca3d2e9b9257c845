//! Decode the model's JSON document into an [`ExtractionResult`].
//!
//! Structural only: the top level must be an object with a `transactions`
//! array, and every row needs `date`, `description` and `amount`. Field
//! contents are free-form OCR text and are not validated further.

use scanner_core::{Amount, ExtractionError, ExtractionResult, Transaction};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResult {
    bank_name: Option<String>,
    period: Option<String>,
    currency: Option<String>,
    transactions: Option<Vec<RawTransaction>>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    date: String,
    description: String,
    amount: RawAmount,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl From<RawAmount> for Amount {
    fn from(raw: RawAmount) -> Self {
        match raw {
            RawAmount::Number(n) => Amount::Number(n),
            RawAmount::Text(s) => Amount::coerce(&s),
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

pub fn decode_extraction(text: &str) -> Result<ExtractionResult, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let raw: RawResult =
        serde_json::from_str(text).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    let rows = raw
        .transactions
        .ok_or_else(|| ExtractionError::Malformed("missing transactions field".to_string()))?;

    let transactions = rows
        .into_iter()
        .map(|r| Transaction {
            date: r.date,
            description: r.description,
            amount: r.amount.into(),
            notes: r.notes.unwrap_or_default(),
        })
        .collect();

    Ok(ExtractionResult {
        bank_name: non_blank(raw.bank_name),
        period: non_blank(raw.period),
        currency: non_blank(raw.currency),
        transactions,
    })
}
