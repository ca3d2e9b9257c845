//! scanner-export: CSV export of extracted statement transactions.

pub mod csv_export;

pub use csv_export::{default_filename, to_csv, write_csv};
