//! Declarative chart specification and its allow-list.

use super::ChartError;
use crate::analysis::GroupTotals;
use crate::models::GroupingDimension;
use serde::{Deserialize, Serialize};

/// Longest accepted chart title, in characters.
const MAX_TITLE_CHARS: usize = 120;

/// Supported chart shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Line,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Bar, ChartKind::HorizontalBar, ChartKind::Line];

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::HorizontalBar => "horizontal_bar",
            ChartKind::Line => "line",
        }
    }

    /// Whether the chart draws bars (and therefore gets value labels).
    pub fn has_bars(&self) -> bool {
        !matches!(self, ChartKind::Line)
    }
}

/// Aggregation applied to `deposit_amount` within each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Mean,
    Count,
}

impl Aggregation {
    pub const ALL: [Aggregation; 3] = [Aggregation::Sum, Aggregation::Mean, Aggregation::Count];

    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Count => "count",
        }
    }

    /// Reduce a group's totals to the plotted value.
    pub fn apply(&self, totals: &GroupTotals) -> f64 {
        match self {
            Aggregation::Sum => totals.sum,
            Aggregation::Mean => totals.mean(),
            Aggregation::Count => totals.count as f64,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Aggregation::Sum => "Total deposits",
            Aggregation::Mean => "Average deposit",
            Aggregation::Count => "Number of deposits",
        }
    }
}

/// Chart requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartSpec {
    pub chart_type: ChartKind,
    pub group_by: GroupingDimension,
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Maximum number of categories to plot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
}

impl ChartSpec {
    /// Parse and validate a specification from a code block body.
    pub fn parse(source: &str) -> Result<Self, ChartError> {
        let spec: ChartSpec =
            serde_json::from_str(source).map_err(|e| ChartError::InvalidSpec(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), ChartError> {
        if self.top == Some(0) {
            return Err(ChartError::InvalidSpec("\"top\" must be at least 1".to_string()));
        }
        if let Some(ref title) = self.title {
            if title.chars().count() > MAX_TITLE_CHARS {
                return Err(ChartError::InvalidSpec(format!(
                    "title longer than {} characters",
                    MAX_TITLE_CHARS
                )));
            }
        }
        Ok(())
    }

    /// Title to draw: the model's, or one derived from the specification.
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!(
                "{} by {}",
                self.aggregation.describe(),
                self.group_by.column().replace('_', " ")
            ),
        }
    }

    /// Label for the value axis.
    pub fn value_label(&self) -> &'static str {
        match self.aggregation {
            Aggregation::Count => "Transactions",
            _ => "Deposit amount (PKR)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_spec() {
        let spec = ChartSpec::parse(
            r#"{"chart_type": "horizontal_bar", "group_by": "branch_name", "aggregation": "mean", "title": "Avg by branch", "top": 5}"#,
        )
        .unwrap();

        assert_eq!(spec.chart_type, ChartKind::HorizontalBar);
        assert_eq!(spec.group_by, GroupingDimension::BranchName);
        assert_eq!(spec.aggregation, Aggregation::Mean);
        assert_eq!(spec.top, Some(5));
        assert_eq!(spec.display_title(), "Avg by branch");
    }

    #[test]
    fn test_default_title() {
        let spec = ChartSpec::parse(r#"{"chart_type": "bar", "group_by": "customer_segment", "aggregation": "sum"}"#)
            .unwrap();
        assert_eq!(spec.display_title(), "Total deposits by customer segment");
    }

    #[test]
    fn test_rejects_values_outside_allow_list() {
        for source in [
            r#"{"chart_type": "pie", "group_by": "region", "aggregation": "sum"}"#,
            r#"{"chart_type": "bar", "group_by": "deposit_amount", "aggregation": "sum"}"#,
            r#"{"chart_type": "bar", "group_by": "region", "aggregation": "median"}"#,
            r#"{"chart_type": "bar", "group_by": "region", "aggregation": "sum", "code": "import os"}"#,
            r#"{"chart_type": "bar", "group_by": "region", "aggregation": "sum", "top": 0}"#,
            r#"{"chart_type": "bar"}"#,
        ] {
            assert!(
                matches!(ChartSpec::parse(source), Err(ChartError::InvalidSpec(_))),
                "accepted {}",
                source
            );
        }
    }

    #[test]
    fn test_rejects_python_source() {
        let source = "import matplotlib.pyplot as plt\nplt.bar(df['region'], df['deposit_amount'])\nplt.show()";
        assert!(matches!(
            ChartSpec::parse(source),
            Err(ChartError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_rejects_overlong_title() {
        let source = format!(
            r#"{{"chart_type": "bar", "group_by": "region", "aggregation": "sum", "title": "{}"}}"#,
            "x".repeat(MAX_TITLE_CHARS + 1)
        );
        assert!(ChartSpec::parse(&source).is_err());
    }

    #[test]
    fn test_aggregation_apply() {
        let totals = GroupTotals { sum: 300.0, count: 4 };
        assert_eq!(Aggregation::Sum.apply(&totals), 300.0);
        assert_eq!(Aggregation::Mean.apply(&totals), 75.0);
        assert_eq!(Aggregation::Count.apply(&totals), 4.0);
    }
}
