//! Spreadsheet and CSV loading.
//!
//! Cells from either source are normalized into [`RawCell`] values so a
//! single row parser can build [`Transaction`] records from both.

use super::{Dataset, DatasetError};
use crate::models::{Transaction, COLUMNS};
use calamine::{open_workbook_auto, DataType, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns a sheet must carry to be usable at all.
const REQUIRED_COLUMNS: [&str; 2] = ["transaction_id", "deposit_amount"];

/// Number of row warnings logged individually before summarizing.
const MAX_LOGGED_WARNINGS: usize = 10;

/// Source-independent cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl From<&DataType> for RawCell {
    fn from(cell: &DataType) -> Self {
        match cell {
            DataType::Empty => RawCell::Empty,
            DataType::String(s) if s.trim().is_empty() => RawCell::Empty,
            DataType::String(s) => RawCell::Text(s.clone()),
            DataType::Float(f) => RawCell::Number(*f),
            DataType::Int(i) => RawCell::Number(*i as f64),
            DataType::Bool(b) => RawCell::Text(b.to_string()),
            other => match other.as_date() {
                Some(date) => RawCell::Date(date),
                None => RawCell::Text(other.to_string()),
            },
        }
    }
}

impl From<&str> for RawCell {
    fn from(cell: &str) -> Self {
        if cell.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(cell.to_string())
        }
    }
}

/// Load the deposit dataset from a spreadsheet sheet or a CSV file.
pub fn load_dataset(path: &Path, sheet: &str) -> Result<Dataset, DatasetError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let (headers, rows) = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_sheet(path, sheet)?,
        "csv" => read_csv(path)?,
        _ => return Err(DatasetError::UnsupportedFormat(path.to_path_buf())),
    };

    let dataset = build_dataset(path, &headers, rows)?;
    info!(
        "Loaded {} transactions from {} ({} without a deposit amount)",
        dataset.len(),
        path.display(),
        dataset.missing_amounts()
    );
    Ok(dataset)
}

/// Read the header row and data rows of a named sheet.
fn read_sheet(path: &Path, sheet: &str) -> Result<(Vec<String>, Vec<Vec<RawCell>>), DatasetError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names = workbook.sheet_names().to_vec();
    if !sheet_names.iter().any(|name| name == sheet) {
        return Err(DatasetError::SheetNotFound {
            sheet: sheet.to_string(),
            path: path.to_path_buf(),
            available: sheet_names.join(", "),
        });
    }

    let range = workbook.worksheet_range(sheet)?;
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| DatasetError::HeaderNotFound(path.to_path_buf()))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let data = rows
        .map(|row| row.iter().map(RawCell::from).collect())
        .collect();

    debug!("Read sheet '{}' with headers {:?}", sheet, headers);
    Ok((headers, data))
}

/// Read a CSV file with a header row.
fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<RawCell>>), DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(DatasetError::HeaderNotFound(path.to_path_buf()));
    }

    let mut data = Vec::new();
    for record in reader.records() {
        let record = record?;
        data.push(record.iter().map(RawCell::from).collect());
    }

    Ok((headers, data))
}

/// Map known column names to their position in the header row.
fn map_columns(
    headers: &[String],
    path: &Path,
) -> Result<HashMap<&'static str, usize>, DatasetError> {
    let mut indices = HashMap::new();

    for column in COLUMNS {
        if let Some(index) = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column))
        {
            indices.insert(column, index);
        }
    }

    for column in REQUIRED_COLUMNS {
        if !indices.contains_key(column) {
            return Err(DatasetError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            });
        }
    }

    Ok(indices)
}

/// Build a dataset from normalized rows.
///
/// Blank rows are dropped. Rows whose amount is empty or not a number are
/// kept in file order without an amount, so grouped sums leave them out.
pub(crate) fn build_dataset(
    path: &Path,
    headers: &[String],
    rows: Vec<Vec<RawCell>>,
) -> Result<Dataset, DatasetError> {
    let indices = map_columns(headers, path)?;

    let mut records = Vec::with_capacity(rows.len());
    let mut warnings = Vec::new();

    for (row_idx, row) in rows.iter().enumerate() {
        if row.iter().all(|c| *c == RawCell::Empty) {
            continue;
        }

        let (record, problem) = parse_row(row, &indices);
        if let Some(details) = problem {
            // Spreadsheet row number: 1-based plus the header row.
            warnings.push(format!("row {}: {}", row_idx + 2, details));
        }
        records.push(record);
    }

    for warning in warnings.iter().take(MAX_LOGGED_WARNINGS) {
        warn!("Kept without amount, {}", warning);
    }
    if warnings.len() > MAX_LOGGED_WARNINGS {
        warn!(
            "... and {} more rows with a non-numeric amount",
            warnings.len() - MAX_LOGGED_WARNINGS
        );
    }

    let columns = COLUMNS
        .iter()
        .filter(|c| indices.contains_key(*c))
        .map(|c| c.to_string())
        .collect();

    Ok(Dataset::new(records, columns))
}

static EMPTY_CELL: RawCell = RawCell::Empty;

fn cell_at<'a>(
    row: &'a [RawCell],
    indices: &HashMap<&'static str, usize>,
    column: &str,
) -> &'a RawCell {
    indices
        .get(column)
        .and_then(|&i| row.get(i))
        .unwrap_or(&EMPTY_CELL)
}

/// Parse one row. The second value describes a non-numeric amount cell.
fn parse_row(
    row: &[RawCell],
    indices: &HashMap<&'static str, usize>,
) -> (Transaction, Option<String>) {
    let text = |column: &str| cell_text(cell_at(row, indices, column));

    let (deposit_amount, problem) = match parse_amount(cell_at(row, indices, "deposit_amount")) {
        Ok(amount) => (amount, None),
        Err(details) => (None, Some(details)),
    };

    let date_cell = cell_at(row, indices, "date");
    let date = parse_date(date_cell);
    if date.is_none() && *date_cell != RawCell::Empty {
        debug!("Unparseable date cell {:?}", date_cell);
    }

    let record = Transaction {
        transaction_id: text("transaction_id"),
        date,
        branch_id: text("branch_id"),
        branch_name: text("branch_name"),
        city: text("city"),
        region: text("region"),
        deposit_amount,
        account_type: text("account_type"),
        customer_segment: text("customer_segment"),
    };
    (record, problem)
}

fn cell_text(cell: &RawCell) -> String {
    match cell {
        RawCell::Empty => String::new(),
        RawCell::Text(s) => s.trim().to_string(),
        RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        RawCell::Number(n) => n.to_string(),
        RawCell::Date(d) => d.format("%Y-%m-%d").to_string(),
    }
}

/// Parse an amount cell. Empty cells are a missing amount, not an error.
fn parse_amount(cell: &RawCell) -> Result<Option<f64>, String> {
    match cell {
        RawCell::Empty => Ok(None),
        RawCell::Number(n) if n.is_finite() => Ok(Some(*n)),
        RawCell::Text(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',').collect();
            cleaned
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| format!("deposit_amount '{}' is not a number", s))
        }
        other => Err(format!("deposit_amount {:?} is not a number", other)),
    }
}

/// Parse a date cell: native dates, Excel serial numbers or common text layouts.
pub(crate) fn parse_date(cell: &RawCell) -> Option<NaiveDate> {
    match cell {
        RawCell::Date(d) => Some(*d),
        RawCell::Number(serial) => excel_serial_to_date(*serial),
        RawCell::Text(s) => parse_date_text(s.trim()),
        RawCell::Empty => None,
    }
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}
