//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// deposit-assistant - ask questions about bank deposit data
///
/// Routes a natural-language question to a grouping of the deposit
/// transactions, asks one model for a chart and another for a short
/// business insight.
///
/// Examples:
///   deposit-assistant --query "Show total deposits by region"
///   deposit-assistant --data deposits.csv
///   deposit-assistant --query "deposits by city" --dry-run
///   deposit-assistant --describe
///   deposit-assistant --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Question to answer
    ///
    /// Without it, questions are read interactively from stdin until
    /// EOF, an empty line, `exit` or `quit`.
    #[arg(short, long, value_name = "TEXT")]
    pub query: Option<String>,

    /// Deposit dataset (.xlsx, .xls, .ods or .csv)
    #[arg(short, long, value_name = "FILE", env = "DEPOSIT_DATA")]
    pub data: Option<PathBuf>,

    /// Sheet holding the transactions (spreadsheets only)
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Model asked for the chart specification
    #[arg(long, value_name = "MODEL", env = "DEPOSIT_CHART_MODEL")]
    pub chart_model: Option<String>,

    /// Model asked for the business insight
    #[arg(long, value_name = "MODEL", env = "DEPOSIT_INSIGHT_MODEL")]
    pub insight_model: Option<String>,

    /// Temperature for the insight model (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens in the insight response
    #[arg(long, value_name = "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .deposit-assistant.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a report of the last answer to this file
    ///
    /// Not available with --dry-run, which produces no answer to report.
    #[arg(short, long, value_name = "FILE", conflicts_with = "dry_run")]
    pub output: Option<PathBuf>,

    /// Report format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Where the rendered SVG chart is written
    #[arg(long, value_name = "FILE")]
    pub chart_out: Option<PathBuf>,

    /// Request timeout in seconds for each model call
    ///
    /// By default requests wait until the service answers.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Route and aggregate only; print the summary table without calling any model
    #[arg(long)]
    pub dry_run: bool,

    /// Print a profile of the dataset and exit
    #[arg(long, conflicts_with_all = ["query", "dry_run"])]
    pub describe: bool,

    /// Generate a default .deposit-assistant.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref query) = self.query {
            if query.trim().is_empty() {
                return Err("Query must not be empty".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.max_tokens == Some(0) {
            return Err("Max tokens must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref data) = self.data {
            if !data.exists() {
                return Err(format!("Dataset does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the `[general] verbose` setting; `--quiet` wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
