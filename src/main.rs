//! UXLens - UI/UX evaluation result viewer
//!
//! A CLI tool that waits for an evaluation run to finish analysis,
//! normalizes the backend payload and renders a detailed report.
//!
//! Exit codes:
//!   0   - Success
//!   1   - Runtime error (connection, config, backend failure, etc.)
//!   3   - Authentication required
//!   130 - Cancelled with Ctrl-C

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uxlens::analysis::{failed_check_count, score_overview};
use uxlens::api::{ApiClient, FetchError, RunsQuery};
use uxlens::cli::{Args, OutputFormat};
use uxlens::config::{Config, CONFIG_FILE_NAME};
use uxlens::models::{RawPayload, SiteEvaluation};
use uxlens::normalizer::normalize;
use uxlens::poller::{AcquisitionEvent, ResultPoller};
use uxlens::report::{self, ReportOptions};

const EXIT_FAILURE: i32 = 1;
const EXIT_UNAUTHORIZED: i32 = 3;
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_FAILURE);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("UXLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

/// Handle --init-config: generate a default .uxlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(EXIT_FAILURE);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the backend URL, poll interval and report sections.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over `--verbose`/`--quiet` when set.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch to the requested mode. Returns the process exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;
    if config.general.verbose {
        debug!("Verbose output enabled by configuration");
    }

    if let Some(ref input) = args.input {
        return run_offline(&args, &config, input);
    }

    if args.list {
        return run_list(&args, &config).await;
    }

    let run_id = args
        .run_id
        .clone()
        .ok_or_else(|| anyhow!("A run ID is required"))?;
    run_watch(&args, &config, &run_id).await
}

/// Normalize a saved payload without contacting the backend.
fn run_offline(args: &Args, config: &Config, input: &Path) -> Result<i32> {
    info!("Reading payload from: {}", input.display());

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read payload file: {}", input.display()))?;
    let raw: RawPayload = serde_json::from_str(&content)
        .with_context(|| format!("Payload file is not valid JSON: {}", input.display()))?;

    if !raw.is_object() {
        warn!("Payload is not a JSON object; every field falls back to its default");
    }

    let evaluation = normalize(&raw);
    emit_report(args, config, &evaluation)?;
    Ok(0)
}

/// Print the most recent runs.
async fn run_list(args: &Args, config: &Config) -> Result<i32> {
    let client = ApiClient::new(config.api.client_config(args.token.clone()))?;

    let mut query = RunsQuery::latest(args.limit);
    query.status = args.status.map(Into::into);

    info!("Listing runs from: {}", client.base_url());
    let response = match client.list_runs(&query).await {
        Ok(response) => response,
        Err(e) => return Ok(report_fetch_error(&e)),
    };

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&response)?,
        OutputFormat::Markdown => report::generate_runs_table(&response.runs),
    };
    write_output(config.general.output.as_deref(), &output)?;

    if !args.quiet {
        eprintln!(
            "\n📋 Showing {} of {} runs",
            response.runs.len(),
            response.total
        );
    }
    Ok(0)
}

/// Poll the backend until the run's evaluation is ready, then report it.
async fn run_watch(args: &Args, config: &Config, run_id: &str) -> Result<i32> {
    let client = ApiClient::new(config.api.client_config(args.token.clone()))?;
    let interval = Duration::from_secs(config.api.poll_interval_seconds);

    if !args.quiet {
        eprintln!("🔍 Fetching evaluation for run {}", run_id);
        eprintln!("   Backend: {}", client.base_url());
    }

    let mut poller = ResultPoller::new(Arc::new(client), interval);
    let mut subscription = poller.acquire(run_id);
    let spinner = (!args.quiet).then(create_spinner);

    loop {
        tokio::select! {
            event = subscription.next() => match event {
                Some(AcquisitionEvent::Loading) => {
                    debug!("Requesting evaluation for run {}", run_id);
                }
                Some(AcquisitionEvent::Pending) => {
                    info!("Analysis still running, retrying in {}s", interval.as_secs());
                    if let Some(ref pb) = spinner {
                        pb.set_message(format!(
                            "Analysis in progress, checking again every {}s",
                            interval.as_secs()
                        ));
                    }
                }
                Some(AcquisitionEvent::Ready(evaluation)) => {
                    if let Some(ref pb) = spinner {
                        pb.finish_and_clear();
                    }
                    emit_report(args, config, &evaluation)?;
                    return Ok(0);
                }
                Some(AcquisitionEvent::Failed(e)) => {
                    if let Some(ref pb) = spinner {
                        pb.abandon();
                    }
                    return Ok(report_fetch_error(&e));
                }
                None => {
                    return Err(anyhow!("Acquisition for run {} ended without a result", run_id));
                }
            },
            _ = tokio::signal::ctrl_c() => {
                poller.cancel();
                if let Some(ref pb) = spinner {
                    pb.abandon_with_message("Cancelled");
                }
                eprintln!("\n⛔ Cancelled, stopped polling run {}", run_id);
                return Ok(EXIT_CANCELLED);
            }
        }
    }
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Waiting for the evaluation...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Print a fetch failure and map it to an exit code.
fn report_fetch_error(e: &FetchError) -> i32 {
    error!("Fetch failed: {}", e);
    if e.is_unauthorized() {
        eprintln!("\n🔒 Authentication required: {}", e);
        eprintln!("   Pass --token or set UXLENS_TOKEN.");
        EXIT_UNAUTHORIZED
    } else {
        eprintln!("\n❌ Error: {}", e);
        EXIT_FAILURE
    }
}

/// Render the evaluation in the requested format and write it out.
fn emit_report(args: &Args, config: &Config, evaluation: &SiteEvaluation) -> Result<()> {
    let options = ReportOptions::from(&config.report);
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(evaluation)?,
        OutputFormat::Markdown => report::generate_markdown_report(evaluation, &options),
    };

    let destination = config.general.output.as_deref();
    write_output(destination, &output)?;

    if !args.quiet {
        print_summary(evaluation);
        if let Some(path) = destination {
            eprintln!("\n✅ Report saved to: {}", path);
        }
    }
    Ok(())
}

fn print_summary(evaluation: &SiteEvaluation) {
    eprintln!("\n📊 Evaluation Summary:");
    for dimension in score_overview(evaluation) {
        eprintln!(
            "   {} {}: {:.1}",
            dimension.band.emoji(),
            dimension.label,
            dimension.score
        );
    }
    eprintln!(
        "   Pages: {} | Interactions: {} | Workflows: {}",
        evaluation.node_evaluations.len(),
        evaluation.edge_evaluations.len(),
        evaluation.workflow_evaluations.len()
    );
    eprintln!("   Failed checks: {}", failed_check_count(evaluation));
}

/// Write to the given file, or to stdout when no file is configured.
fn write_output(destination: Option<&str>, content: &str) -> Result<()> {
    match destination {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path)),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
