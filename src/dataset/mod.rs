//! Deposit dataset handle.
//!
//! The dataset is loaded once at startup and shared read-only with the
//! router, aggregator and chart renderer for the lifetime of the process.

pub mod loader;
pub mod profile;

pub use loader::load_dataset;
pub use profile::DatasetProfile;

use crate::models::{Transaction, COLUMNS};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("sheet '{sheet}' not found in {path} (available: {available})")]
    SheetNotFound {
        sheet: String,
        path: PathBuf,
        available: String,
    },

    #[error("no header row found in {0}")]
    HeaderNotFound(PathBuf),

    #[error("required column '{column}' missing from {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Immutable collection of deposit transactions plus the schema they came from.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Transaction>,
    columns: Vec<String>,
}

impl Dataset {
    /// Creates a dataset from parsed records and the columns present in the source.
    pub fn new(records: Vec<Transaction>, columns: Vec<String>) -> Self {
        Self { records, columns }
    }

    /// Creates a dataset whose schema carries every known column.
    pub fn from_records(records: Vec<Transaction>) -> Self {
        Self::new(records, COLUMNS.iter().map(|c| c.to_string()).collect())
    }

    /// All records in original file order.
    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    /// Columns present in the source file.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether the source file carried the named column.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records kept without a deposit amount (empty or non-numeric cell).
    pub fn missing_amounts(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.deposit_amount.is_none())
            .count()
    }

    /// The first `n` records in file order.
    pub fn head(&self, n: usize) -> &[Transaction] {
        &self.records[..n.min(self.records.len())]
    }

    /// Grand total of the deposit amount column, ignoring missing amounts.
    pub fn total_deposits(&self) -> f64 {
        self.records.iter().filter_map(|r| r.deposit_amount).sum()
    }
}
