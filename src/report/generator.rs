//! Markdown and JSON reports of an answered query.

use crate::cli::OutputFormat;
use crate::models::{Answer, AnswerMetadata, ChartOutcome, Insight, SummaryTable};
use anyhow::{Context, Result};
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(answer: &Answer) -> String {
    let mut output = String::new();

    output.push_str("# Deposit Assistant Report\n\n");
    output.push_str(&format!("> {}\n\n", answer.query));
    output.push_str(&generate_metadata_section(&answer.metadata, answer));
    output.push_str(&generate_chart_section(&answer.chart));
    output.push_str(&generate_summary_section(&answer.summary));
    output.push_str(&generate_insight_section(&answer.insight));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &AnswerMetadata, answer: &Answer) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Answered:** {}\n",
        metadata.answered_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Grouped by:** {}\n",
        answer
            .dimension
            .map(|d| format!("`{}`", d))
            .unwrap_or_else(|| "none (first rows shown)".to_string())
    ));
    section.push_str(&format!("- **Chart model:** `{}`\n", metadata.chart_model));
    section.push_str(&format!("- **Insight model:** `{}`\n", metadata.insight_model));
    section.push_str(&format!("- **Dataset rows:** {}\n", metadata.dataset_rows));
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

/// Generate the chart section.
fn generate_chart_section(chart: &ChartOutcome) -> String {
    let mut section = String::new();

    section.push_str("## Chart\n\n");
    match chart {
        ChartOutcome::Rendered(rendered) => {
            section.push_str(&format!("**{}**\n\n", rendered.title));
            section.push_str("```text\n");
            section.push_str(&rendered.text);
            section.push_str("\n```\n\n");
        }
        ChartOutcome::NoChart => {
            section.push_str("ℹ️ No chart was generated. Showing insight instead.\n\n");
        }
        ChartOutcome::Failed { message } => {
            section.push_str("⚠️ Error producing chart:\n\n```text\n");
            section.push_str(message);
            section.push_str("\n```\n\n");
        }
    }

    section
}

/// Generate the summary table section.
fn generate_summary_section(summary: &SummaryTable) -> String {
    let mut section = String::new();

    section.push_str("## Summary Table\n\n");
    section.push_str("```text\n");
    section.push_str(&summary.to_string());
    section.push_str("\n```\n\n");

    section
}

/// Generate the insight section.
fn generate_insight_section(insight: &Insight) -> String {
    let mut section = String::new();

    section.push_str("## Insight\n\n");
    if insight.failed {
        section.push_str("⚠️ ");
    }
    section.push_str(&insight.text);
    section.push_str("\n\n");

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by deposit-assistant*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(answer: &Answer) -> Result<String> {
    serde_json::to_string_pretty(answer).map_err(Into::into)
}

/// Write a report in the requested format.
pub fn write_report(answer: &Answer, path: &Path, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Markdown => generate_markdown_report(answer),
        OutputFormat::Json => generate_json_report(answer)?,
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
