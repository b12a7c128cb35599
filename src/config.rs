//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pharmassist.toml` files.

use anyhow::{bail, Context, Result};
use pharmassist::orchestrator::Timing;
use pharmassist::pipeline::{self, STAGE_COUNT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".pharmassist.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Backend settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Local simulation settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default report path. Empty prints the report to stdout.
    #[serde(default)]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Rows fetched by `--history`.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: String::new(),
            verbose: false,
            history_limit: default_history_limit(),
        }
    }
}

fn default_history_limit() -> usize {
    20
}

/// Remote backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Use the backend instead of the local simulation.
    #[serde(default)]
    pub enabled: bool,

    /// Backend API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Delay between status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Give up on a remote analysis after this long and simulate locally.
    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            poll_interval_ms: default_poll_interval(),
            analysis_timeout_seconds: default_analysis_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_analysis_timeout() -> u64 {
    120
}

/// Local simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Duration of each of the seven pipeline stages, in order.
    #[serde(default = "default_step_durations")]
    pub step_durations_ms: Vec<u64>,

    /// Progress increments per stage.
    #[serde(default = "default_progress_ticks")]
    pub progress_ticks: u32,

    /// Latency of the local chat responder.
    #[serde(default = "default_chat_delay")]
    pub chat_delay_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_durations_ms: default_step_durations(),
            progress_ticks: default_progress_ticks(),
            chat_delay_ms: default_chat_delay(),
        }
    }
}

fn default_step_durations() -> Vec<u64> {
    pipeline::STAGES.iter().map(|s| s.duration_ms).collect()
}

fn default_progress_ticks() -> u32 {
    10
}

fn default_chat_delay() -> u64 {
    1500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Reject values the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.simulation.progress_ticks == 0 {
            bail!("simulation.progress_ticks must be at least 1");
        }
        if self.simulation.step_durations_ms.len() > STAGE_COUNT {
            bail!(
                "simulation.step_durations_ms has {} entries, the pipeline has {} stages",
                self.simulation.step_durations_ms.len(),
                STAGE_COUNT
            );
        }
        if self.api.poll_interval_ms == 0 {
            bail!("api.poll_interval_ms must be at least 1");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment variables) take precedence over
    /// config file settings, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if args.remote {
            self.api.enabled = true;
        } else if args.local {
            self.api.enabled = false;
        }

        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }

        if let Some(timeout) = args.timeout {
            self.api.analysis_timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Orchestrator timing derived from the `[api]` and `[simulation]` sections.
    pub fn timing(&self) -> Timing {
        let defaults = pipeline::default_durations();
        let step_durations = defaults
            .iter()
            .enumerate()
            .map(|(i, default)| {
                self.simulation
                    .step_durations_ms
                    .get(i)
                    .map(|ms| Duration::from_millis(*ms))
                    .unwrap_or(*default)
            })
            .collect();

        Timing {
            step_durations,
            progress_ticks: self.simulation.progress_ticks,
            poll_interval: Duration::from_millis(self.api.poll_interval_ms),
            remote_timeout: Duration::from_secs(self.api.analysis_timeout_seconds),
            chat_delay: Duration::from_millis(self.simulation.chat_delay_ms),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
