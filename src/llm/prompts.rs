//! Prompt templates for the chart and insight models.

use crate::chart::spec::{Aggregation, ChartKind};
use crate::models::{GroupingDimension, SummaryTable, COLUMNS};

/// Default system instruction for the insight model.
pub const INSIGHT_SYSTEM_PROMPT: &str = "You are a helpful business analyst that summarizes data.";

/// Column list rendered the way the model is used to seeing a dataframe's columns.
fn column_list() -> String {
    let quoted: Vec<String> = COLUMNS.iter().map(|c| format!("'{}'", c)).collect();
    format!("[{}]", quoted.join(", "))
}

fn allowed<T>(values: &[T], name: impl Fn(&T) -> &'static str) -> String {
    values.iter().map(name).collect::<Vec<_>>().join(", ")
}

/// Prompt asking the chart model for a declarative chart specification.
pub fn chart_prompt(query: &str) -> String {
    format!(
        r#"
You are a charting assistant. Describe a chart that answers the user's question.

You have a table of deposit transactions called df with the following columns:
{columns}

Instructions:
- Respond with exactly one ```json fenced code block containing a single JSON object
- Required keys: "chart_type", "group_by", "aggregation"
- Optional keys: "title" (string), "top" (maximum number of categories to plot)
- "chart_type" must be one of: {kinds}
- "group_by" must be one of: {dimensions}
- "aggregation" must be one of: {aggregations} (applied to deposit_amount)
- Do not include any other keys or any code

User query: "{query}"
"#,
        columns = column_list(),
        kinds = allowed(&ChartKind::ALL, ChartKind::name),
        dimensions = allowed(&GroupingDimension::ALL, GroupingDimension::column),
        aggregations = allowed(&Aggregation::ALL, Aggregation::name),
        query = query,
    )
}

/// Prompt asking the insight model to summarize the aggregated table.
pub fn insight_prompt(query: &str, summary: &SummaryTable) -> String {
    format!(
        r#"
You are a business analyst.

The user asked the following question about deposit data:
"{query}"

The data analyst has provided the result of this query in the form of an aggregated table below:
{summary}

Now, write a short business insight (3–5 bullet points) answering the user's question using only the data in this table.

Instructions:
- Focus on answering the query logically based on the table above.
- Mention specific values and percentages if relevant.
- Do NOT reference columns or fields that are not present in the table.
- Do NOT invent any extra facts or context.
- Express values in Pakistani Rupees (PKR), rounded to billions or millions as appropriate.
- Your insight should match the column being summarized.
"#,
        query = query,
        summary = summary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summarize;
    use crate::dataset::fixtures::regional;

    #[test]
    fn test_chart_prompt_lists_columns_and_allow_list() {
        let prompt = chart_prompt("Show total deposits by region in June");

        assert!(prompt.contains("['transaction_id', 'date', 'branch_id', 'branch_name', 'city', 'region', 'deposit_amount', 'account_type', 'customer_segment']"));
        assert!(prompt.contains("bar, horizontal_bar, line"));
        assert!(prompt.contains("branch_name, account_type, customer_segment, city, region, date"));
        assert!(prompt.contains("sum, mean, count"));
        assert!(prompt.contains("User query: \"Show total deposits by region in June\""));
    }

    #[test]
    fn test_insight_prompt_embeds_query_and_table() {
        let table = summarize(&regional(), Some(GroupingDimension::Region)).unwrap();
        let prompt = insight_prompt("deposits by region", &table);

        assert!(prompt.contains("\"deposits by region\""));
        assert!(prompt.contains(&table.to_string()));
        assert!(prompt.contains("Pakistani Rupees (PKR)"));
        assert!(prompt.contains("3–5 bullet points"));
    }
}
