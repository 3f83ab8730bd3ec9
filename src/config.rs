//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.deposit-assistant.toml` files.

use crate::assistant::AssistantSettings;
use crate::chart::render::CanvasSize;
use crate::llm::EndpointConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".deposit-assistant.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset location.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Chart (code-generation) model settings.
    #[serde(default)]
    pub chart_model: ChartModelConfig,

    /// Insight model settings.
    #[serde(default)]
    pub insight_model: InsightModelConfig,

    /// Chart output settings.
    #[serde(default)]
    pub chart: ChartConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Request timeout in seconds for both models. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Where the deposit transactions live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Spreadsheet or CSV path.
    #[serde(default = "default_dataset_path")]
    pub path: String,

    /// Sheet holding the transactions (spreadsheets only).
    #[serde(default = "default_sheet")]
    pub sheet: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            sheet: default_sheet(),
        }
    }
}

fn default_dataset_path() -> String {
    "Deposit_Chatbot_Data_Schema.xlsx".to_string()
}

fn default_sheet() -> String {
    "Deposit_Transactions".to_string()
}

/// Settings for the model asked to describe a chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartModelConfig {
    /// Model identifier.
    #[serde(default = "default_chart_model")]
    pub name: String,

    /// Chat-completions endpoint.
    #[serde(default = "default_chart_url")]
    pub url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_chart_key_env")]
    pub api_key_env: String,

    /// Value of the `HTTP-Referer` header.
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Value of the `X-Title` header.
    #[serde(default = "default_app_title")]
    pub app_title: String,
}

impl Default for ChartModelConfig {
    fn default() -> Self {
        Self {
            name: default_chart_model(),
            url: default_chart_url(),
            api_key_env: default_chart_key_env(),
            referer: default_referer(),
            app_title: default_app_title(),
        }
    }
}

fn default_chart_model() -> String {
    "anthropic/claude-3-haiku".to_string()
}

fn default_chart_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_chart_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_referer() -> String {
    "http://localhost".to_string()
}

fn default_app_title() -> String {
    "deposit-assistant".to_string()
}

/// Settings for the model asked for a business insight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightModelConfig {
    /// Model identifier.
    #[serde(default = "default_insight_model")]
    pub name: String,

    /// Chat-completions endpoint.
    #[serde(default = "default_insight_url")]
    pub url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_insight_key_env")]
    pub api_key_env: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// System instruction.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for InsightModelConfig {
    fn default() -> Self {
        Self {
            name: default_insight_model(),
            url: default_insight_url(),
            api_key_env: default_insight_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_insight_model() -> String {
    "meta-llama/Llama-3-8b-chat-hf".to_string()
}

fn default_insight_url() -> String {
    "https://api.together.xyz/v1/chat/completions".to_string()
}

fn default_insight_key_env() -> String {
    "TOGETHER_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_system_prompt() -> String {
    crate::llm::prompts::INSIGHT_SYSTEM_PROMPT.to_string()
}

/// Chart output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Where the SVG chart is written.
    #[serde(default = "default_chart_output")]
    pub output: String,

    /// Canvas width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Canvas height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output: default_chart_output(),
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_chart_output() -> String {
    "deposit_chart.svg".to_string()
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    480
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.dataset.path = data.display().to_string();
        }
        if let Some(ref sheet) = args.sheet {
            self.dataset.sheet = sheet.clone();
        }

        if let Some(ref model) = args.chart_model {
            self.chart_model.name = model.clone();
        }
        if let Some(ref model) = args.insight_model {
            self.insight_model.name = model.clone();
        }
        if let Some(temperature) = args.temperature {
            self.insight_model.temperature = temperature;
        }
        if let Some(max_tokens) = args.max_tokens {
            self.insight_model.max_tokens = max_tokens;
        }

        if let Some(timeout) = args.timeout {
            self.general.timeout_seconds = Some(timeout);
        }

        if let Some(ref chart_out) = args.chart_out {
            self.chart.output = chart_out.display().to_string();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Endpoint settings for the chart model, reading its key from the environment.
    pub fn chart_endpoint(&self) -> EndpointConfig {
        EndpointConfig {
            url: self.chart_model.url.clone(),
            api_key: api_key_from_env(&self.chart_model.api_key_env),
            extra_headers: vec![
                ("HTTP-Referer".to_string(), self.chart_model.referer.clone()),
                ("X-Title".to_string(), self.chart_model.app_title.clone()),
            ],
            timeout_seconds: self.general.timeout_seconds,
        }
    }

    /// Endpoint settings for the insight model, reading its key from the environment.
    pub fn insight_endpoint(&self) -> EndpointConfig {
        EndpointConfig {
            url: self.insight_model.url.clone(),
            api_key: api_key_from_env(&self.insight_model.api_key_env),
            extra_headers: Vec::new(),
            timeout_seconds: self.general.timeout_seconds,
        }
    }

    /// Pipeline settings derived from this configuration.
    pub fn assistant_settings(&self, show_progress: bool) -> AssistantSettings {
        AssistantSettings {
            chart_model: self.chart_model.name.clone(),
            insight_model: self.insight_model.name.clone(),
            insight_system_prompt: self.insight_model.system_prompt.clone(),
            temperature: self.insight_model.temperature,
            max_tokens: self.insight_model.max_tokens,
            canvas: CanvasSize {
                width: self.chart.width,
                height: self.chart.height,
            },
            show_progress,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Keys are not validated; a missing one only earns a warning.
fn api_key_from_env(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Some(key),
        _ => {
            warn!("{} is not set; requests will be sent without an API key", var);
            None
        }
    }
}
