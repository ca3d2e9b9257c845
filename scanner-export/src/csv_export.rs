//! Export statement transactions as CSV.
//!
//! Format:
//!   Date,Description,Amount,Notes
//!   "01/02/24","Coffee ""Shop""",-4.5,""
//!
//! Text columns are always quoted with inner quotes doubled. The amount is
//! written bare, either the number or the text exactly as stored.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use scanner_core::Transaction;
use std::path::Path;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

pub const HEADER: [&str; 4] = ["Date", "Description", "Amount", "Notes"];

fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

pub fn to_csv(transactions: &[Transaction]) -> Result<Vec<u8>> {
    // Quoting is done per column above, so the writer must never add its own.
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;
    for t in transactions {
        wtr.write_record([
            quoted(&t.date),
            quoted(&t.description),
            t.amount.to_string(),
            quoted(&t.notes),
        ])?;
    }

    let mut out = wtr.into_inner().context("flush csv buffer")?;
    // rows are joined by newlines, not terminated by them
    if out.last() == Some(&b'\n') {
        out.pop();
    }
    Ok(out)
}

/// `statement_<bank>_<YYYY-MM-DD>.csv`, with whitespace runs in the bank name
/// replaced by underscores and `export` when the bank is unknown.
pub fn default_filename(bank_name: Option<&str>, date: NaiveDate) -> String {
    let bank = match bank_name {
        Some(name) if !name.is_empty() => WHITESPACE.replace_all(name, "_").into_owned(),
        _ => "export".to_string(),
    };
    format!("statement_{}_{}.csv", bank, date.format("%Y-%m-%d"))
}

pub fn write_csv(path: impl AsRef<Path>, transactions: &[Transaction]) -> Result<()> {
    let path = path.as_ref();
    let bytes = to_csv(transactions)?;
    std::fs::write(path, &bytes).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(rows = transactions.len(), path = %path.display(), "exported csv");
    Ok(())
}
