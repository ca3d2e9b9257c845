//! Statement record types: transactions and the result of one extraction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction amount as extracted or as typed by the user.
///
/// Numeric when the text parses to a finite number, otherwise the raw text is
/// kept verbatim. An amount is never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    /// Coerce user-entered text into an amount.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Amount::Number(n),
            _ => Amount::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amount::Number(n) => Some(*n),
            Amount::Text(_) => None,
        }
    }

    /// Debit rows (negative numeric amounts). Text amounts are never negative.
    pub fn is_negative(&self) -> bool {
        matches!(self, Amount::Number(n) if *n < 0.0)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::Text(String::new())
    }
}

impl From<f64> for Amount {
    fn from(n: f64) -> Self {
        Amount::Number(n)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Number(n) => write!(f, "{n}"),
            Amount::Text(s) => f.write_str(s),
        }
    }
}

/// One statement line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// Free-form date text as printed on the statement
    pub date: String,
    pub description: String,
    /// Positive for credits, negative for debits (best effort, see extraction prompt)
    pub amount: Amount,
    pub notes: String,
}

impl Transaction {
    pub fn new(date: &str, description: &str, amount: impl Into<Amount>) -> Self {
        Self {
            date: date.to_string(),
            description: description.to_string(),
            amount: amount.into(),
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    /// Apply raw text to a single field. Amounts go through [`Amount::coerce`].
    pub fn set_field(&mut self, field: TransactionField, raw: &str) {
        match field {
            TransactionField::Date => self.date = raw.to_string(),
            TransactionField::Description => self.description = raw.to_string(),
            TransactionField::Amount => self.amount = Amount::coerce(raw),
            TransactionField::Notes => self.notes = raw.to_string(),
        }
    }
}

/// Editable columns of a transaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionField {
    Date,
    Description,
    Amount,
    Notes,
}

impl TransactionField {
    pub const ALL: [TransactionField; 4] = [
        TransactionField::Date,
        TransactionField::Description,
        TransactionField::Amount,
        TransactionField::Notes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TransactionField::Date => "date",
            TransactionField::Description => "description",
            TransactionField::Amount => "amount",
            TransactionField::Notes => "notes",
        }
    }
}

impl FromStr for TransactionField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let key = match lower.as_str() {
            "desc" => "description",
            "note" => "notes",
            other => other,
        };
        TransactionField::ALL
            .into_iter()
            .find(|f| f.name() == key)
            .ok_or_else(|| {
                let names: Vec<&str> = TransactionField::ALL.iter().map(|f| f.name()).collect();
                format!("unknown field '{key}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Structured output of one extraction call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Always present, in the order the statement lists them
    pub transactions: Vec<Transaction>,
}

impl ExtractionResult {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn bank_label(&self) -> &str {
        self.bank_name.as_deref().unwrap_or("Unknown Bank")
    }

    pub fn period_label(&self) -> &str {
        self.period.as_deref().unwrap_or("N/A")
    }
}
