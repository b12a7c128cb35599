//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use pharmassist::models::AnalysisType;
use std::path::PathBuf;

/// PharmAssist - multi-agent pharmaceutical research assistant
///
/// Runs the seven-agent analysis pipeline for a molecule, prints a report of
/// the market, clinical, patent and regulatory findings, and answers
/// follow-up questions about the result.
///
/// Examples:
///   pharmassist --molecule Aspirin
///   pharmassist --molecule Semaglutide --types market,competitive --format json -o sema.json
///   pharmassist --molecule Metformin --ask "What is the market size?" --ask "Who are the competitors?"
///   pharmassist --molecule Pembrolizumab --remote --api-url http://localhost:8000/api/v1 -i
///   pharmassist --history --remote
///   pharmassist --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Molecule or drug name to analyze
    #[arg(
        short,
        long,
        value_name = "NAME",
        required_unless_present_any = ["init_config", "history"]
    )]
    pub molecule: Option<String>,

    /// Analysis types to run (comma-separated)
    ///
    /// Values: market, clinical, regulatory, competitive
    #[arg(
        short,
        long,
        value_name = "TYPES",
        value_delimiter = ',',
        default_value = "market,clinical,regulatory,competitive"
    )]
    pub types: Vec<AnalysisType>,

    /// Free-text context passed along with the request
    #[arg(long, value_name = "TEXT")]
    pub context: Option<String>,

    /// Run the analysis on the backend instead of simulating it locally
    #[arg(long, env = "PHARMASSIST_REMOTE", conflicts_with = "local")]
    pub remote: bool,

    /// Force local simulation even if the config enables the backend
    #[arg(long, conflicts_with = "remote")]
    pub local: bool,

    /// Backend API root
    #[arg(long, value_name = "URL", env = "PHARMASSIST_API_URL")]
    pub api_url: Option<String>,

    /// Remote analysis timeout in seconds before falling back to simulation
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pharmassist.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Ask a question about the result (repeatable)
    #[arg(short, long, value_name = "QUESTION")]
    pub ask: Vec<String>,

    /// Open an interactive chat prompt after the analysis
    #[arg(short, long)]
    pub interactive: bool,

    /// List past analyses from the backend and exit
    #[arg(long)]
    pub history: bool,

    /// Number of history rows to fetch
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Generate a default .pharmassist.toml configuration file
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

        if !self.history {
            let molecule = self.molecule.as_deref().unwrap_or("");
            if molecule.trim().is_empty() {
                return Err("Molecule name must not be empty".to_string());
            }
            if self.types.is_empty() {
                return Err("At least one analysis type is required".to_string());
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

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.limit == Some(0) {
            return Err("History limit must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is the config file's `general.verbose`; `--quiet`
    /// overrides it.
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
