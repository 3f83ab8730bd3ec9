//! Dataset sanity profile shown by `--describe`.

use super::Dataset;
use crate::analysis::partition;
use crate::models::GroupingDimension;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Headline statistics about the loaded dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub unique_transactions: usize,
    pub duplicate_transactions: usize,
    pub missing_amounts: usize,
    pub total_deposits: f64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Deposits per customer segment, rounded to two decimals, largest first.
    pub segment_totals: Vec<(String, f64)>,
}

impl DatasetProfile {
    /// Compute the profile of a dataset.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let ids: HashSet<&str> = dataset
            .records()
            .iter()
            .map(|r| r.transaction_id.as_str())
            .collect();

        let dates = dataset.records().iter().filter_map(|r| r.date);
        let first_date = dates.clone().min();
        let last_date = dates.max();

        let mut segment_totals: Vec<(String, f64)> = if dataset.has_column("customer_segment") {
            partition(dataset.records(), GroupingDimension::CustomerSegment)
                .into_iter()
                .map(|(segment, group)| (segment, (group.sum * 100.0).round() / 100.0))
                .collect()
        } else {
            Vec::new()
        };
        segment_totals.sort_by(|a, b| b.1.total_cmp(&a.1));

        Self {
            rows: dataset.len(),
            unique_transactions: ids.len(),
            duplicate_transactions: dataset.len() - ids.len(),
            missing_amounts: dataset.missing_amounts(),
            total_deposits: dataset.total_deposits(),
            first_date,
            last_date,
            segment_totals,
        }
    }
}

impl fmt::Display for DatasetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows in dataset:      {}", self.rows)?;
        writeln!(f, "Unique transactions:  {}", self.unique_transactions)?;
        if self.duplicate_transactions > 0 {
            writeln!(f, "Duplicate IDs:        {}", self.duplicate_transactions)?;
        }
        if self.missing_amounts > 0 {
            writeln!(f, "Missing amounts:      {}", self.missing_amounts)?;
        }
        writeln!(f, "Total deposits (PKR): {:.2}", self.total_deposits)?;
        if let (Some(first), Some(last)) = (self.first_date, self.last_date) {
            writeln!(f, "Date range:           {} to {}", first, last)?;
        }

        if !self.segment_totals.is_empty() {
            writeln!(f)?;
            writeln!(f, "Total deposits by customer segment:")?;
            let width = self
                .segment_totals
                .iter()
                .map(|(s, _)| s.len())
                .max()
                .unwrap_or(0);
            for (segment, total) in &self.segment_totals {
                writeln!(f, "  {:<width$}  {:>20.2}", segment, total, width = width)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::transaction;

    #[test]
    fn test_profile_counts_duplicates() {
        let mut records = vec![
            transaction("T1", "Gulberg", "Lahore", "Punjab", 100.004),
            transaction("T2", "Clifton", "Karachi", "Sindh", 200.0),
            transaction("T2", "Clifton", "Karachi", "Sindh", 300.0),
        ];
        records[2].customer_segment = "Corporate".to_string();
        records[2].date = NaiveDate::from_ymd_opt(2024, 7, 15);

        let profile = DatasetProfile::from_dataset(&Dataset::from_records(records));

        assert_eq!(profile.rows, 3);
        assert_eq!(profile.unique_transactions, 2);
        assert_eq!(profile.duplicate_transactions, 1);
        assert_eq!(profile.first_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(profile.last_date, NaiveDate::from_ymd_opt(2024, 7, 15));
        assert_eq!(
            profile.segment_totals,
            vec![("Corporate".to_string(), 300.0), ("Retail".to_string(), 300.0)]
        );
    }

    #[test]
    fn test_profile_display() {
        let profile = DatasetProfile::from_dataset(&crate::dataset::fixtures::regional());
        let text = profile.to_string();
        assert!(text.contains("Rows in dataset:      5"));
        assert!(text.contains("Total deposits by customer segment:"));
        assert!(text.contains("Retail"));
    }
}
