//! Data models for the deposit assistant.
//!
//! This module contains the core data structures shared across the
//! application: transaction records, grouping dimensions, summary tables
//! and the answer produced for a single user query.

use crate::chart::RenderedChart;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column names of the deposit transactions sheet, in file order.
pub const COLUMNS: [&str; 9] = [
    "transaction_id",
    "date",
    "branch_id",
    "branch_name",
    "city",
    "region",
    "deposit_amount",
    "account_type",
    "customer_segment",
];

/// A single deposit transaction. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier.
    pub transaction_id: String,
    /// Calendar date of the deposit, if the cell could be parsed.
    pub date: Option<NaiveDate>,
    /// Branch identifier.
    pub branch_id: String,
    /// Branch display name.
    pub branch_name: String,
    /// City the branch is located in.
    pub city: String,
    /// Region the branch belongs to.
    pub region: String,
    /// Deposit amount in PKR; `None` when the cell was empty or not a number.
    pub deposit_amount: Option<f64>,
    /// Account type (e.g. Personal, Business).
    pub account_type: String,
    /// Customer segment (e.g. Retail, Corporate).
    pub customer_segment: String,
}

impl Transaction {
    /// Returns this record's value for a grouping dimension.
    ///
    /// Empty cells yield `None`; such records do not take part in a group-by
    /// on that dimension.
    pub fn group_key(&self, dimension: GroupingDimension) -> Option<String> {
        let value = match dimension {
            GroupingDimension::BranchName => &self.branch_name,
            GroupingDimension::AccountType => &self.account_type,
            GroupingDimension::CustomerSegment => &self.customer_segment,
            GroupingDimension::City => &self.city,
            GroupingDimension::Region => &self.region,
            GroupingDimension::Date => {
                return self.date.map(|d| d.format("%Y-%m-%d").to_string());
            }
        };

        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Returns the record's cells as display strings, in [`COLUMNS`] order.
    pub fn cells(&self) -> [String; 9] {
        [
            self.transaction_id.clone(),
            self.date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "NaT".to_string()),
            self.branch_id.clone(),
            self.branch_name.clone(),
            self.city.clone(),
            self.region.clone(),
            self.deposit_amount
                .map(|amount| format!("{:.2}", amount))
                .unwrap_or_else(|| "NaN".to_string()),
            self.account_type.clone(),
            self.customer_segment.clone(),
        ]
    }
}

/// Categorical column used to partition deposits before summation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingDimension {
    BranchName,
    AccountType,
    CustomerSegment,
    City,
    Region,
    Date,
}

impl GroupingDimension {
    /// Every dimension, in routing priority order.
    pub const ALL: [GroupingDimension; 6] = [
        GroupingDimension::BranchName,
        GroupingDimension::AccountType,
        GroupingDimension::CustomerSegment,
        GroupingDimension::City,
        GroupingDimension::Region,
        GroupingDimension::Date,
    ];

    /// Name of the dataset column backing this dimension.
    pub fn column(&self) -> &'static str {
        match self {
            GroupingDimension::BranchName => "branch_name",
            GroupingDimension::AccountType => "account_type",
            GroupingDimension::CustomerSegment => "customer_segment",
            GroupingDimension::City => "city",
            GroupingDimension::Region => "region",
            GroupingDimension::Date => "date",
        }
    }
}

impl fmt::Display for GroupingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// One row of a grouped summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Distinct value of the grouping dimension.
    pub key: String,
    /// Summed deposit amount, truncated to whole PKR.
    pub total: i64,
}

/// Derived per-query aggregation used to ground the insight prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryTable {
    /// Deposit totals per distinct dimension value, sorted descending.
    Grouped {
        dimension: GroupingDimension,
        rows: Vec<SummaryRow>,
    },
    /// Leading records of the dataset in file order (no dimension matched),
    /// shown with the columns the source file carried.
    Sample {
        columns: Vec<String>,
        rows: Vec<Transaction>,
    },
}

impl SummaryTable {
    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        match self {
            SummaryTable::Grouped { rows, .. } => rows.len(),
            SummaryTable::Sample { rows, .. } => rows.len(),
        }
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the deposit amounts shown in the table.
    pub fn total(&self) -> f64 {
        match self {
            SummaryTable::Grouped { rows, .. } => rows.iter().map(|r| r.total as f64).sum(),
            SummaryTable::Sample { rows, .. } => rows.iter().filter_map(|r| r.deposit_amount).sum(),
        }
    }
}

/// Result of the chart step for one query.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChartOutcome {
    /// A chart was produced.
    Rendered(RenderedChart),
    /// The model response contained no fenced code block.
    NoChart,
    /// The remote call, the chart specification or rendering failed.
    Failed { message: String },
}

impl ChartOutcome {
    /// Short human-readable status line.
    pub fn status_line(&self) -> String {
        match self {
            ChartOutcome::Rendered(chart) => format!("Chart rendered: {}", chart.title),
            ChartOutcome::NoChart => "No chart generated. Showing insight instead.".to_string(),
            ChartOutcome::Failed { message } => format!("Error producing chart: {}", message),
        }
    }
}

/// Prose summary returned by the insight model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    /// Response text, or the stringified error when the call failed.
    pub text: String,
    /// Whether `text` is an error message.
    pub failed: bool,
}

/// Metadata about a single answered query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerMetadata {
    /// When the answer was produced.
    pub answered_at: DateTime<Utc>,
    /// Model asked for the chart specification.
    pub chart_model: String,
    /// Model asked for the insight.
    pub insight_model: String,
    /// Number of records in the dataset.
    pub dataset_rows: usize,
    /// Wall-clock time spent answering, in seconds.
    pub duration_seconds: f64,
}

/// Everything produced for one user query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The user's question, verbatim.
    pub query: String,
    /// Dimension chosen by the router, `None` when no trigger matched.
    pub dimension: Option<GroupingDimension>,
    /// Outcome of the chart step.
    pub chart: ChartOutcome,
    /// Aggregation the insight was grounded on.
    pub summary: SummaryTable,
    /// Insight text.
    pub insight: Insight,
    /// Timing and model information.
    pub metadata: AnswerMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction() -> Transaction {
        Transaction {
            transaction_id: "TXN0001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3),
            branch_id: "101".to_string(),
            branch_name: "Gulberg".to_string(),
            city: "Lahore".to_string(),
            region: "Punjab".to_string(),
            deposit_amount: Some(150000.5),
            account_type: "Personal".to_string(),
            customer_segment: "Retail".to_string(),
        }
    }

    #[test]
    fn test_group_key_per_dimension() {
        let txn = sample_transaction();
        assert_eq!(
            txn.group_key(GroupingDimension::BranchName).as_deref(),
            Some("Gulberg")
        );
        assert_eq!(txn.group_key(GroupingDimension::City).as_deref(), Some("Lahore"));
        assert_eq!(
            txn.group_key(GroupingDimension::Date).as_deref(),
            Some("2024-06-03")
        );
    }

    #[test]
    fn test_group_key_empty_values() {
        let txn = Transaction {
            region: "  ".to_string(),
            date: None,
            ..sample_transaction()
        };
        assert_eq!(txn.group_key(GroupingDimension::Region), None);
        assert_eq!(txn.group_key(GroupingDimension::Date), None);
    }

    #[test]
    fn test_dimension_serde_matches_columns() {
        for dimension in GroupingDimension::ALL {
            let json = serde_json::to_string(&dimension).unwrap();
            assert_eq!(json, format!("\"{}\"", dimension.column()));
        }
    }

    #[test]
    fn test_dimension_serde_uses_column_names() {
        let json = serde_json::to_string(&GroupingDimension::CustomerSegment).unwrap();
        assert_eq!(json, "\"customer_segment\"");
    }

    #[test]
    fn test_cells_follow_column_order() {
        let cells = sample_transaction().cells();
        assert_eq!(cells.len(), COLUMNS.len());
        assert_eq!(cells[0], "TXN0001");
        assert_eq!(cells[1], "2024-06-03");
        assert_eq!(cells[6], "150000.50");
    }

    #[test]
    fn test_missing_amount_cell() {
        let txn = Transaction {
            deposit_amount: None,
            ..sample_transaction()
        };
        assert_eq!(txn.cells()[6], "NaN");
    }

    #[test]
    fn test_chart_outcome_status_line() {
        assert!(ChartOutcome::NoChart.status_line().contains("No chart generated"));
        let failed = ChartOutcome::Failed {
            message: "boom".to_string(),
        };
        assert!(failed.status_line().contains("boom"));
    }
}
