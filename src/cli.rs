//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::RunStatus;
use clap::Parser;
use std::path::PathBuf;

/// UXLens - watch a UI/UX evaluation run and render its results
///
/// Polls the evaluation backend until the analysis of a run completes,
/// then renders page, interaction and workflow scores as Markdown or JSON.
///
/// Examples:
///   uxlens --run-id 3f2c9a
///   uxlens --run-id 3f2c9a --format json --output result.json
///   uxlens --input saved_payload.json
///   uxlens --list --limit 10
///   uxlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Run ID whose evaluation should be fetched
    #[arg(
        short,
        long,
        value_name = "RUN_ID",
        required_unless_present_any = ["init_config", "input", "list"]
    )]
    pub run_id: Option<String>,

    /// Evaluation backend base URL
    ///
    /// Overrides the `[api] base_url` config setting.
    #[arg(long, value_name = "URL", env = "UXLENS_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for authenticated endpoints
    #[arg(long, value_name = "TOKEN", env = "UXLENS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Normalize a saved raw evaluation payload instead of polling
    #[arg(long, value_name = "FILE", conflicts_with_all = ["run_id", "list"])]
    pub input: Option<PathBuf>,

    /// List recent runs instead of fetching one evaluation
    #[arg(long, conflicts_with = "run_id")]
    pub list: bool,

    /// Maximum number of runs to list
    #[arg(long, value_name = "COUNT", requires = "list")]
    pub limit: Option<u32>,

    /// Only list runs with this status
    #[arg(long, value_name = "STATUS", requires = "list")]
    pub status: Option<StatusFilter>,

    /// Output file path for the report (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Seconds to wait before asking again while the analysis is running
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Leave page checklists out of the Markdown report
    #[arg(long)]
    pub no_checklists: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .uxlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .uxlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
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

/// Run status accepted by --status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StatusFilter {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl From<StatusFilter> for RunStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Running => RunStatus::Running,
            StatusFilter::Completed => RunStatus::Completed,
            StatusFilter::Failed => RunStatus::Failed,
            StatusFilter::Stopped => RunStatus::Stopped,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref run_id) = self.run_id {
            if run_id.is_empty() {
                return Err("Run ID must not be empty".to_string());
            }
            if !run_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(
                    "Run ID may only contain letters, digits, '-' and '_'".to_string(),
                );
            }
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.poll_interval == Some(0) {
            return Err("Poll interval must be at least 1 second".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.limit == Some(0) {
            return Err("Limit must be at least 1".to_string());
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            run_id: Some("run-42".to_string()),
            api_url: None,
            token: None,
            input: None,
            list: false,
            limit: None,
            status: None,
            output: None,
            format: OutputFormat::Markdown,
            poll_interval: None,
            timeout: None,
            no_checklists: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_run_id() {
        let mut args = make_args();
        args.run_id = Some("../etc/passwd".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_api_url() {
        let mut args = make_args();
        args.api_url = Some("localhost:8000".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_interval() {
        let mut args = make_args();
        args.poll_interval = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.run_id = None;
        args.input = Some(PathBuf::from("/definitely/not/here.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from(["uxlens", "--run-id", "abc", "--format", "json"]).unwrap();
        assert_eq!(args.run_id.as_deref(), Some("abc"));
        assert_eq!(args.format, OutputFormat::Json);

        assert!(Args::try_parse_from(["uxlens", "--list", "--run-id", "abc"]).is_err());
    }
}
