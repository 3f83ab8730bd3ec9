//! Plain-text rendering of summary tables.

use crate::models::{SummaryTable, COLUMNS};
use std::fmt;

/// Render rows as a right-aligned, space-separated text table with a header line.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_line(headers.iter().copied(), &widths));
    for row in rows {
        lines.push(format_line(row.iter().map(String::as_str), &widths));
    }

    lines.join("\n")
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:>width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = match self {
            SummaryTable::Grouped { dimension, rows } => {
                let cells: Vec<Vec<String>> = rows
                    .iter()
                    .map(|r| vec![r.key.clone(), r.total.to_string()])
                    .collect();
                render_table(&[dimension.column(), "deposit_amount"], &cells)
            }
            SummaryTable::Sample { columns, rows } => {
                let shown: Vec<usize> = COLUMNS
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| columns.iter().any(|c| c == *name))
                    .map(|(i, _)| i)
                    .collect();
                let headers: Vec<&str> = shown.iter().map(|&i| COLUMNS[i]).collect();
                let cells: Vec<Vec<String>> = rows
                    .iter()
                    .map(|r| {
                        let all = r.cells();
                        shown.iter().map(|&i| all[i].clone()).collect()
                    })
                    .collect();
                render_table(&headers, &cells)
            }
        };
        f.write_str(&rendered)
    }
}
