//! Interactive review: show extracted rows, edit one at a time, export.
//!
//! Rows are numbered from 1 on screen; the store is indexed from 0.

use anyhow::{Context, Result};
use scanner_core::{
    Amount, EditError, ExtractionError, ExtractionResult, RequestTicket, ScanSession, ScanSource,
    Transaction, TransactionField,
};
use scanner_ingest::payload::mime_for_path;
use scanner_ingest::{DocumentPayload, ExtractEvent, ExtractionHandle};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Thousands separators, at least two and at most three decimals.
pub fn format_amount(amount: &Amount) -> String {
    let Some(n) = amount.as_number() else {
        return amount.to_string();
    };

    let fixed = format!("{:.3}", n.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "000"));
    let frac = if frac.ends_with('0') { &frac[..2] } else { frac };

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if n < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

fn render_row(no: usize, t: &Transaction, marker: &str) -> String {
    let notes = if t.notes.is_empty() { "-" } else { t.notes.as_str() };
    format!(
        "{marker}{no:>3}  {:<12} {:<40} {:>14}  {}",
        t.date,
        t.description,
        format_amount(&t.amount),
        notes
    )
}

pub fn render_result(result: &ExtractionResult, editing: Option<usize>) -> String {
    let mut s = String::new();
    s.push_str(&format!("Detected Institution: {}\n", result.bank_label()));
    s.push_str(&format!("Statement Period:     {}\n", result.period_label()));
    if let Some(c) = &result.currency {
        s.push_str(&format!("Currency:             {c}\n"));
    }
    s.push_str(&format!("\n{} Transactions Found\n\n", result.len()));
    s.push_str(&format!(
        "   {:>3}  {:<12} {:<40} {:>14}  {}\n",
        "#", "Date", "Description", "Amount", "Notes"
    ));
    for (i, t) in result.transactions.iter().enumerate() {
        let marker = if editing == Some(i) { "*" } else { " " };
        s.push_str(&render_row(i + 1, t, marker));
        s.push('\n');
    }
    s
}

#[derive(Debug, PartialEq)]
enum ReviewCommand {
    List,
    Edit(usize),
    Set(String, String),
    Show,
    Save,
    Cancel,
    Open(PathBuf),
    Export(Option<PathBuf>),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<ReviewCommand, String> {
    let line = line.trim();
    let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match cmd {
        "list" | "ls" => Ok(ReviewCommand::List),
        "edit" | "e" => {
            let no: usize = rest
                .parse()
                .map_err(|_| format!("expected a row number, got '{rest}'"))?;
            if no == 0 {
                return Err("rows are numbered from 1".to_string());
            }
            Ok(ReviewCommand::Edit(no - 1))
        }
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if field.is_empty() {
                return Err("usage: set FIELD VALUE".to_string());
            }
            Ok(ReviewCommand::Set(field.to_string(), value.trim_start().to_string()))
        }
        "show" => Ok(ReviewCommand::Show),
        "save" => Ok(ReviewCommand::Save),
        "cancel" => Ok(ReviewCommand::Cancel),
        "open" if !rest.is_empty() => Ok(ReviewCommand::Open(PathBuf::from(rest))),
        "open" => Err("usage: open FILE".to_string()),
        "export" => Ok(ReviewCommand::Export((!rest.is_empty()).then(|| PathBuf::from(rest)))),
        "help" | "?" => Ok(ReviewCommand::Help),
        "quit" | "q" | "exit" => Ok(ReviewCommand::Quit),
        other => Err(format!("unknown command '{other}'; try help")),
    }
}

const HELP: &str = "\
Commands:
- list                 show all rows
- edit N               start editing row N
- set FIELD VALUE      change date, description, amount or notes of the row being edited
- show                 show the row being edited
- save | cancel        keep or drop the edit
- open FILE            scan another statement (replaces the current rows)
- export [PATH]        write CSV (default: statement_<bank>_<date>.csv)
- quit";

pub struct Review {
    session: ScanSession,
    worker: ExtractionHandle,
}

impl Review {
    pub fn new(worker: ExtractionHandle) -> Self {
        Self {
            session: ScanSession::new(),
            worker,
        }
    }

    /// Scan `path` and wait until the outcome of that scan has been applied.
    pub async fn open(&mut self, path: &Path) {
        let source = ScanSource {
            file_name: path.display().to_string(),
            mime_type: mime_for_path(path).unwrap_or("unknown").to_string(),
        };
        let ticket = self.session.submit(source);

        match DocumentPayload::from_path(path) {
            Ok(payload) => {
                println!("Extracting data from {} ...", path.display());
                if !self.worker.submit(ticket, payload) {
                    self.worker_stopped(ticket);
                    return;
                }
            }
            Err(e) => {
                self.session.fail_read(ticket, e);
                self.print_status();
                return;
            }
        }

        while self.session.is_processing() {
            let Some(event) = self.worker.next_event().await else {
                self.worker_stopped(ticket);
                return;
            };
            let ticket = event.ticket();
            match event {
                ExtractEvent::Started { request_id } => {
                    tracing::debug!(request_id, "extraction started");
                }
                ExtractEvent::Completed { result, .. } => {
                    self.session.resolve(ticket, Ok(result));
                }
                ExtractEvent::Failed { error, .. } => {
                    self.session.resolve(ticket, Err(error));
                }
            }
        }
        self.print_status();
    }

    fn worker_stopped(&mut self, ticket: RequestTicket) {
        let err = ExtractionError::Transport("extraction worker stopped".to_string());
        self.session.resolve(ticket, Err(err));
        self.print_status();
    }

    fn print_status(&self) {
        if let Some(msg) = self.session.error_message() {
            println!("Extraction Error: {msg}");
        } else if let Some(result) = self.session.result() {
            print!("{}", render_result(result, self.session.store().active_index()));
        }
    }

    fn print_working(&self) {
        match (self.session.store().active_index(), self.session.store().working_copy()) {
            (Some(i), Some(t)) => println!("{}", render_row(i + 1, t, "~")),
            _ => println!("{}", EditError::NoActiveEdit),
        }
    }

    fn export(&self, path: Option<PathBuf>) -> Result<()> {
        let Some(result) = self.session.result() else {
            println!("{}", EditError::NoResult);
            return Ok(());
        };
        let path = path.unwrap_or_else(|| {
            PathBuf::from(scanner_export::default_filename(
                result.bank_name.as_deref(),
                chrono::Utc::now().date_naive(),
            ))
        });
        scanner_export::write_csv(&path, &result.transactions)?;
        println!("Wrote {} rows to {}", result.len(), path.display());
        Ok(())
    }

    /// Returns false when the user asked to quit.
    async fn handle(&mut self, cmd: ReviewCommand) -> Result<bool> {
        match cmd {
            ReviewCommand::List => self.print_status(),
            ReviewCommand::Edit(i) => match self.session.begin_edit(i) {
                Ok(t) => println!("{}", render_row(i + 1, t, "~")),
                Err(e) => println!("{e}"),
            },
            ReviewCommand::Set(field, value) => match field.parse::<TransactionField>() {
                Ok(field) => match self.session.update_working_field(field, &value) {
                    Ok(_) => self.print_working(),
                    Err(e) => println!("{e}"),
                },
                Err(msg) => println!("{msg}"),
            },
            ReviewCommand::Show => self.print_working(),
            ReviewCommand::Save => match self.session.commit_edit() {
                Ok(i) => println!("Saved row {}", i + 1),
                Err(e) => println!("{e}"),
            },
            ReviewCommand::Cancel => match self.session.cancel_edit() {
                Ok(()) => println!("Edit discarded"),
                Err(e) => println!("{e}"),
            },
            ReviewCommand::Open(path) => self.open(&path).await,
            ReviewCommand::Export(path) => self.export(path)?,
            ReviewCommand::Help => println!("{HELP}"),
            ReviewCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("Type 'help' for commands.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("review> ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await.context("read stdin")? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(cmd) => {
                    if !self.handle(cmd).await? {
                        break;
                    }
                }
                Err(msg) => println!("{msg}"),
            }
        }
        Ok(())
    }
}
