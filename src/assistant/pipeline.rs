//! The single-shot pipeline behind each user query.

use crate::analysis::router::route_with_trigger;
use crate::analysis::{summarize, AnalysisError};
use crate::chart::render::CanvasSize;
use crate::chart::{extract_code_block, render_chart, ChartSpec};
use crate::dataset::Dataset;
use crate::llm::client::describe_failure;
use crate::llm::prompts::{chart_prompt, insight_prompt, INSIGHT_SYSTEM_PROMPT};
use crate::llm::{ChatCompletion, ChatMessage, ChatRequest};
use crate::models::{
    Answer, AnswerMetadata, ChartOutcome, GroupingDimension, Insight, SummaryTable,
};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Model and rendering settings for the pipeline.
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub chart_model: String,
    pub insight_model: String,
    pub insight_system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub canvas: CanvasSize,
    /// Show spinners while waiting on remote calls.
    pub show_progress: bool,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            chart_model: "anthropic/claude-3-haiku".to_string(),
            insight_model: "meta-llama/Llama-3-8b-chat-hf".to_string(),
            insight_system_prompt: INSIGHT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: 512,
            canvas: CanvasSize::default(),
            show_progress: false,
        }
    }
}

/// Route a query and build its summary table without any remote call.
pub fn plan(
    dataset: &Dataset,
    query: &str,
) -> Result<(Option<GroupingDimension>, SummaryTable), AnalysisError> {
    let dimension = match route_with_trigger(query) {
        Some((dimension, trigger)) => {
            info!("Routed query to {} (matched \"{}\")", dimension, trigger);
            Some(dimension)
        }
        None => {
            info!("No grouping dimension matched; using the first rows of the dataset");
            None
        }
    };

    let summary = summarize(dataset, dimension)?;
    Ok((dimension, summary))
}

/// Answers deposit questions against one loaded dataset.
pub struct Assistant {
    dataset: Arc<Dataset>,
    chart_client: Box<dyn ChatCompletion>,
    insight_client: Box<dyn ChatCompletion>,
    settings: AssistantSettings,
}

impl Assistant {
    pub fn new(
        dataset: Arc<Dataset>,
        chart_client: Box<dyn ChatCompletion>,
        insight_client: Box<dyn ChatCompletion>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            dataset,
            chart_client,
            insight_client,
            settings,
        }
    }

    /// Answer one query.
    ///
    /// Only an aggregation defect (a grouping column missing from the
    /// dataset) is returned as an error; remote and chart failures are
    /// recorded in the answer.
    pub async fn answer(&self, query: &str) -> Result<Answer, AnalysisError> {
        let start = Instant::now();
        info!("Answering query: {}", query);

        let chart = self.chart_step(query).await;
        let (dimension, summary) = plan(&self.dataset, query)?;
        let insight = self.insight_step(query, &summary).await;

        let metadata = AnswerMetadata {
            answered_at: Utc::now(),
            chart_model: self.settings.chart_model.clone(),
            insight_model: self.settings.insight_model.clone(),
            dataset_rows: self.dataset.len(),
            duration_seconds: start.elapsed().as_secs_f64(),
        };

        Ok(Answer {
            query: query.to_string(),
            dimension,
            chart,
            summary,
            insight,
            metadata,
        })
    }

    /// Ask the chart model for a specification and render it.
    async fn chart_step(&self, query: &str) -> ChartOutcome {
        let request = ChatRequest::single_user(&self.settings.chart_model, chart_prompt(query));
        debug!("Chart prompt:\n{}", request.messages[0].content);

        let spinner = self.spinner("Generating chart...");
        let result = self.chart_client.complete(&request).await;
        spinner.finish_and_clear();

        let response = match result {
            Ok(text) => text,
            Err(e) => {
                warn!("Chart model call failed: {}", e);
                return ChartOutcome::Failed {
                    message: describe_failure(&e, &request, &self.chart_client.redacted_headers()),
                };
            }
        };

        let Some(source) = extract_code_block(&response) else {
            info!("Chart model response had no code block");
            return ChartOutcome::NoChart;
        };

        match ChartSpec::parse(&source)
            .and_then(|spec| render_chart(&self.dataset, &spec, self.settings.canvas))
        {
            Ok(chart) => {
                info!("Rendered chart \"{}\" ({} points)", chart.title, chart.points.len());
                ChartOutcome::Rendered(chart)
            }
            Err(e) => {
                warn!("Chart specification rejected: {}", e);
                ChartOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Ask the insight model to summarize the table.
    async fn insight_step(&self, query: &str, summary: &SummaryTable) -> Insight {
        let request = ChatRequest {
            model: self.settings.insight_model.clone(),
            messages: vec![
                ChatMessage::system(self.settings.insight_system_prompt.clone()),
                ChatMessage::user(insight_prompt(query, summary)),
            ],
            temperature: Some(self.settings.temperature),
            max_tokens: Some(self.settings.max_tokens),
        };
        debug!("Insight prompt:\n{}", request.messages[1].content);

        let spinner = self.spinner("Generating insight...");
        let result = self.insight_client.complete(&request).await;
        spinner.finish_and_clear();

        match result {
            Ok(text) => Insight {
                text: text.trim().to_string(),
                failed: false,
            },
            Err(e) => {
                warn!("Insight model call failed: {}", e);
                Insight {
                    text: format!("Insight service error: {}", e),
                    failed: true,
                }
            }
        }
    }

    fn spinner(&self, message: &'static str) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::regional;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed reply and records every request it receives.
    struct ScriptedClient {
        reply: Result<String, u16>,
        requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl ScriptedClient {
        fn replying(text: &str) -> (Box<Self>, Arc<Mutex<Vec<ChatRequest>>>) {
            Self::new(Ok(text.to_string()))
        }

        fn failing(status: u16) -> (Box<Self>, Arc<Mutex<Vec<ChatRequest>>>) {
            Self::new(Err(status))
        }

        fn new(reply: Result<String, u16>) -> (Box<Self>, Arc<Mutex<Vec<ChatRequest>>>) {
            let requests = Arc::new(Mutex::new(Vec::new()));
            (
                Box::new(Self {
                    reply,
                    requests: Arc::clone(&requests),
                }),
                requests,
            )
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedClient {
        async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    body: "unauthorized".to_string(),
                }),
            }
        }

        fn redacted_headers(&self) -> Vec<(String, String)> {
            vec![("Authorization".to_string(), "Bearer [REDACTED]".to_string())]
        }
    }

    fn assistant(
        chart: Box<ScriptedClient>,
        insight: Box<ScriptedClient>,
        dataset: Dataset,
    ) -> Assistant {
        Assistant::new(
            Arc::new(dataset),
            chart,
            insight,
            AssistantSettings::default(),
        )
    }

    const REGION_SPEC: &str = "Sure!\n```json\n{\"chart_type\": \"bar\", \"group_by\": \"region\", \"aggregation\": \"sum\"}\n```";

    #[tokio::test]
    async fn test_end_to_end_region_query() {
        let (chart, _) = ScriptedClient::replying(REGION_SPEC);
        let (insight, insight_requests) = ScriptedClient::replying("  - Sindh leads with PKR 3.2B.\n");
        let assistant = assistant(chart, insight, regional());

        let answer = assistant
            .answer("Show total deposits by region in June")
            .await
            .unwrap();

        assert_eq!(answer.dimension, Some(GroupingDimension::Region));
        match &answer.summary {
            SummaryTable::Grouped { dimension, rows } => {
                assert_eq!(*dimension, GroupingDimension::Region);
                let totals: Vec<i64> = rows.iter().map(|r| r.total).collect();
                assert_eq!(totals, vec![3_200_000_000, 1_600_000_000, 900_000_000]);
            }
            SummaryTable::Sample { .. } => panic!("expected grouped summary"),
        }
        assert!(matches!(answer.chart, ChartOutcome::Rendered(_)));
        assert_eq!(answer.insight.text, "- Sindh leads with PKR 3.2B.");
        assert!(!answer.insight.failed);

        let requests = insight_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, "system");
        assert_eq!(requests[0].temperature, Some(0.7));
        assert_eq!(requests[0].max_tokens, Some(512));
        assert!(requests[0].messages[1].content.contains(&answer.summary.to_string()));
    }

    #[tokio::test]
    async fn test_missing_code_block_still_produces_insight() {
        let (chart, _) = ScriptedClient::replying("I'm afraid I can only describe charts in words.");
        let (insight, insight_requests) = ScriptedClient::replying("Deposits are concentrated in Sindh.");
        let assistant = assistant(chart, insight, regional());

        let answer = assistant.answer("deposits by city").await.unwrap();

        assert!(matches!(answer.chart, ChartOutcome::NoChart));
        assert!(answer.chart.status_line().contains("No chart generated"));
        assert_eq!(answer.insight.text, "Deposits are concentrated in Sindh.");
        assert_eq!(insight_requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chart_service_failure_is_isolated() {
        let (chart, _) = ScriptedClient::failing(401);
        let (insight, _) = ScriptedClient::replying("ok");
        let assistant = assistant(chart, insight, regional());

        let answer = assistant.answer("branch totals").await.unwrap();

        match &answer.chart {
            ChartOutcome::Failed { message } => {
                assert!(message.starts_with("Error: API error 401"));
                assert!(message.contains("Payload:"));
                assert!(message.contains("Bearer [REDACTED]"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(answer.insight.text, "ok");
        assert_eq!(answer.dimension, Some(GroupingDimension::BranchName));
    }

    #[tokio::test]
    async fn test_invalid_spec_is_a_chart_error() {
        let (chart, _) = ScriptedClient::replying(
            "```python\nimport matplotlib.pyplot as plt\nplt.show()\n```",
        );
        let (insight, _) = ScriptedClient::replying("ok");
        let assistant = assistant(chart, insight, regional());

        let answer = assistant.answer("deposits by region").await.unwrap();

        assert!(matches!(answer.chart, ChartOutcome::Failed { .. }));
        assert_eq!(answer.insight.text, "ok");
    }

    #[tokio::test]
    async fn test_insight_failure_is_stringified() {
        let (chart, _) = ScriptedClient::replying(REGION_SPEC);
        let (insight, _) = ScriptedClient::failing(500);
        let assistant = assistant(chart, insight, regional());

        let answer = assistant.answer("deposits by region").await.unwrap();

        assert!(answer.insight.failed);
        assert!(answer.insight.text.starts_with("Insight service error: API error 500"));
        assert!(matches!(answer.chart, ChartOutcome::Rendered(_)));
    }

    #[tokio::test]
    async fn test_unmatched_query_grounds_on_sample_rows() {
        let (chart, chart_requests) = ScriptedClient::replying("no chart");
        let (insight, _) = ScriptedClient::replying("ok");
        let assistant = assistant(chart, insight, regional());

        let answer = assistant.answer("How are we doing?").await.unwrap();

        assert_eq!(answer.dimension, None);
        assert!(matches!(answer.summary, SummaryTable::Sample { ref rows, .. } if rows.len() == 5));

        let requests = chart_requests.lock().unwrap();
        assert_eq!(requests[0].model, "anthropic/claude-3-haiku");
        assert!(requests[0].messages[0].content.contains("User query: \"How are we doing?\""));
    }

    #[test]
    fn test_missing_grouping_column_fails_the_answer() {
        let dataset = Dataset::new(
            regional().records().to_vec(),
            vec!["transaction_id".to_string(), "deposit_amount".to_string()],
        );
        let (chart, _) = ScriptedClient::replying("no chart");
        let (insight, insight_requests) = ScriptedClient::replying("ok");
        let assistant = assistant(chart, insight, dataset);

        let result = tokio_test::block_on(assistant.answer("deposits by region"));

        assert!(matches!(result, Err(AnalysisError::MissingColumn { .. })));
        assert!(insight_requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_plan_without_remote_calls() {
        let (dimension, summary) = plan(&regional(), "Compare personal vs business").unwrap();
        assert_eq!(dimension, Some(GroupingDimension::AccountType));
        assert_eq!(summary.len(), 1);
    }
}
