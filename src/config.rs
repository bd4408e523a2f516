//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.uxlens.toml` files.

use crate::api::ApiClientConfig;
use crate::report::ReportOptions;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".uxlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Evaluation backend settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default report file path. The report goes to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Evaluation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Delay between polls while a run is still being analyzed.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    5
}

impl ApiConfig {
    /// Client settings for these values, authenticating with `token` if given.
    pub fn client_config(&self, token: Option<String>) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.base_url.clone(),
            auth_token: token,
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the per-page check lists.
    #[serde(default = "default_true")]
    pub include_node_checklists: bool,

    /// List passed checks in addition to failed ones.
    #[serde(default = "default_true")]
    pub include_passed_checks: bool,

    /// Include per-element efficiency items for each page.
    #[serde(default)]
    pub include_efficiency_items: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_node_checklists: true,
            include_passed_checks: true,
            include_efficiency_items: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            include_node_checklists: config.include_node_checklists,
            include_efficiency_items: config.include_efficiency_items,
            include_passed_checks: config.include_passed_checks,
        }
    }
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
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(interval) = args.poll_interval {
            self.api.poll_interval_seconds = interval;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        if args.no_checklists {
            self.report.include_node_checklists = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that the file or the command line may have set out of range.
    pub fn validate(&self) -> Result<()> {
        let url = &self.api.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("[api] base_url must start with 'http://' or 'https://'");
        }
        if self.api.poll_interval_seconds == 0 {
            bail!("[api] poll_interval_seconds must be at least 1");
        }
        if self.api.timeout_seconds == 0 {
            bail!("[api] timeout_seconds must be at least 1");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
