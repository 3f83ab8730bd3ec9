//! Deposit aggregation by grouping dimension.
//!
//! This module partitions transactions by a dimension's value and builds
//! the summary table used to ground the insight prompt.

use crate::dataset::Dataset;
use crate::models::{GroupingDimension, SummaryRow, SummaryTable, Transaction};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Records shown when the query matched no grouping dimension.
pub const SAMPLE_ROWS: usize = 15;

/// Errors raised by the aggregator.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The dimension's column is absent from the loaded dataset schema.
    #[error("grouping column '{column}' does not exist in the dataset (columns: {available})")]
    MissingColumn { column: String, available: String },
}

/// Running totals for one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupTotals {
    pub sum: f64,
    pub count: usize,
}

impl GroupTotals {
    fn add(&mut self, amount: Option<f64>) {
        if let Some(amount) = amount {
            self.sum += amount;
            self.count += 1;
        }
    }

    /// Average deposit in the partition.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Partition records by a dimension's value, keyed in ascending order.
///
/// Records with an empty value for the dimension are left out. Records
/// without an amount still create their group but add nothing to it.
pub fn partition(
    records: &[Transaction],
    dimension: GroupingDimension,
) -> BTreeMap<String, GroupTotals> {
    let mut groups: BTreeMap<String, GroupTotals> = BTreeMap::new();
    let mut missing = 0usize;

    for record in records {
        match record.group_key(dimension) {
            Some(key) => groups.entry(key).or_default().add(record.deposit_amount),
            None => missing += 1,
        }
    }

    if missing > 0 {
        debug!(
            "{} records have no {} value and were left out of the grouping",
            missing, dimension
        );
    }

    groups
}

/// Check that the dataset carries the column behind a dimension.
pub fn ensure_column(dataset: &Dataset, dimension: GroupingDimension) -> Result<(), AnalysisError> {
    if dataset.has_column(dimension.column()) {
        Ok(())
    } else {
        Err(AnalysisError::MissingColumn {
            column: dimension.column().to_string(),
            available: dataset.columns().join(", "),
        })
    }
}

/// Build the summary table for a routed query.
///
/// With a dimension: deposit totals per distinct value, truncated to whole
/// units and sorted by total, largest first. Without one: the first
/// [`SAMPLE_ROWS`] records in file order.
pub fn summarize(
    dataset: &Dataset,
    dimension: Option<GroupingDimension>,
) -> Result<SummaryTable, AnalysisError> {
    let Some(dimension) = dimension else {
        return Ok(SummaryTable::Sample {
            columns: dataset.columns().to_vec(),
            rows: dataset.head(SAMPLE_ROWS).to_vec(),
        });
    };

    ensure_column(dataset, dimension)?;

    let mut rows: Vec<SummaryRow> = partition(dataset.records(), dimension)
        .into_iter()
        .map(|(key, totals)| SummaryRow {
            key,
            total: totals.sum.trunc() as i64,
        })
        .collect();

    // Stable: equal totals keep ascending key order.
    rows.sort_by(|a, b| b.total.cmp(&a.total));

    debug!("Summarized {} groups by {}", rows.len(), dimension);
    Ok(SummaryTable::Grouped { dimension, rows })
}
