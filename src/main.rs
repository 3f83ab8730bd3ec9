//! deposit-assistant - natural-language questions over bank deposit data
//!
//! A CLI tool that routes a question to a grouping of the deposit
//! transactions, asks one model for a chart specification and another
//! for a short business insight grounded on the aggregated table.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad config, unreadable dataset, aggregation defect, etc.)

mod analysis;
mod assistant;
mod chart;
mod cli;
mod config;
mod dataset;
mod llm;
mod models;
mod report;

use anyhow::{Context, Result};
use assistant::Assistant;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use dataset::{Dataset, DatasetProfile};
use llm::OpenAiCompatibleClient;
use models::{Answer, ChartOutcome};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Keys and DEPOSIT_* overrides may live in .env
    dotenv::dotenv().ok();

    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging so `[general] verbose` can set the level
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("deposit-assistant v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("Failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .deposit-assistant.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to point at your dataset and choose models.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load the dataset, then answer one query or run the interactive loop.
async fn run(args: Args, config: Config) -> Result<()> {
    let data_path = Path::new(&config.dataset.path);
    println!("📂 Loading dataset: {}", data_path.display());
    let dataset = dataset::load_dataset(data_path, &config.dataset.sheet)
        .with_context(|| format!("Failed to load dataset {}", data_path.display()))?;
    println!("   {} transactions loaded", dataset.len());
    if dataset.missing_amounts() > 0 {
        println!(
            "   ⚠️  {} rows have no usable deposit amount (see log)",
            dataset.missing_amounts()
        );
    }
    let dataset = Arc::new(dataset);

    if args.describe {
        println!("\n{}", DatasetProfile::from_dataset(&dataset));
        return Ok(());
    }

    let session = if args.dry_run {
        println!("\n🔍 Dry run: routing and aggregation only (no model calls)");
        Session::DryRun(dataset)
    } else {
        Session::Live(build_assistant(&config, dataset, !args.quiet)?)
    };

    let mut last_answer = None;

    if let Some(ref query) = args.query {
        last_answer = session.handle(query, &config).await?;
    } else {
        println!("\nAsk a question about deposits (empty line, `exit` or `quit` to leave).");
        while let Some(query) = prompt_query()? {
            if let Some(answer) = session.handle(&query, &config).await? {
                last_answer = Some(answer);
            }
        }
    }

    if let (Some(output), Some(answer)) = (&args.output, &last_answer) {
        report::write_report(answer, output, args.format)?;
        println!("\n📝 Report saved to: {}", output.display());
    }

    Ok(())
}

/// What to do with each query.
enum Session {
    /// Route and aggregate only.
    DryRun(Arc<Dataset>),
    /// Full pipeline with both models.
    Live(Assistant),
}

impl Session {
    async fn handle(&self, query: &str, config: &Config) -> Result<Option<Answer>> {
        match self {
            Session::DryRun(dataset) => {
                let (dimension, summary) = assistant::plan(dataset, query)?;
                match dimension {
                    Some(dimension) => println!("\n📊 Grouped by {}:\n", dimension),
                    None => println!("\n📊 No grouping matched; first rows:\n"),
                }
                println!("{}", summary);
                Ok(None)
            }
            Session::Live(assistant) => {
                let answer = assistant.answer(query).await?;
                present_answer(&answer, Path::new(&config.chart.output))?;
                Ok(Some(answer))
            }
        }
    }
}

/// Build the assistant with one client per model.
fn build_assistant(config: &Config, dataset: Arc<Dataset>, show_progress: bool) -> Result<Assistant> {
    println!("🤖 Chart model:   {}", config.chart_model.name);
    println!("🤖 Insight model: {}", config.insight_model.name);
    if let Some(timeout) = config.general.timeout_seconds {
        println!("   Timeout: {}s", timeout);
    }

    let chart_client = OpenAiCompatibleClient::new(config.chart_endpoint())
        .context("Failed to create chart model client")?;
    let insight_client = OpenAiCompatibleClient::new(config.insight_endpoint())
        .context("Failed to create insight model client")?;

    Ok(Assistant::new(
        dataset,
        Box::new(chart_client),
        Box::new(insight_client),
        config.assistant_settings(show_progress),
    ))
}

/// Print the chart and insight for one answer, saving the SVG if one was rendered.
fn present_answer(answer: &Answer, chart_out: &Path) -> Result<()> {
    println!();
    match &answer.chart {
        ChartOutcome::Rendered(chart) => {
            println!("📈 {}\n", chart.title);
            println!("{}", chart.text);
            std::fs::write(chart_out, &chart.svg)
                .with_context(|| format!("Failed to write chart to {}", chart_out.display()))?;
            println!("\n   Chart saved to: {}", chart_out.display());
        }
        ChartOutcome::NoChart => {
            println!("ℹ️  {}", answer.chart.status_line());
        }
        ChartOutcome::Failed { .. } => {
            println!("⚠️  {}", answer.chart.status_line());
        }
    }

    println!("\n💡 Insight\n");
    println!("{}", answer.insight.text);
    println!("\n   Answered in {:.1}s", answer.metadata.duration_seconds);
    Ok(())
}

/// Read the next query from stdin. `None` ends the session.
fn prompt_query() -> Result<Option<String>> {
    print!("\n❓ ");
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read query from stdin")?;
    if read == 0 {
        return Ok(None);
    }

    let query = line.trim();
    if query.is_empty() || query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit")
    {
        return Ok(None);
    }

    Ok(Some(query.to_string()))
}

/// Where the configuration came from, logged once tracing is set up.
enum ConfigSource {
    Explicit(std::path::PathBuf),
    Default,
    Missing,
    Unreadable(String),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::Default => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigSource::Missing => debug!("No config file found, using defaults"),
            ConfigSource::Unreadable(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::Default)),
        Ok(None) => Ok((Config::default(), ConfigSource::Missing)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(e.to_string()))),
    }
}
