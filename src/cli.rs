//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Store Insights - AI-augmented analytics for a point-of-sale store
///
/// Restock forecasts, smart alerts, basket analysis and free-text business
/// questions over a sales snapshot. Narratives come from a local Ollama
/// model, with Anthropic as a cloud fallback.
///
/// Examples:
///   store-insights --data snapshot.json forecast --days 14
///   store-insights --data snapshot.json alerts --format json
///   store-insights --data snapshot.json ask "What sold best on Friday?"
///   store-insights status
///   store-insights --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Sales snapshot (JSON) to analyze
    #[arg(
        short,
        long,
        global = true,
        default_value = "store-snapshot.json",
        value_name = "FILE"
    )]
    pub data: PathBuf,

    /// Output file path for the report (stdout when omitted)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, global = true, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .store-insights.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ollama API endpoint URL
    #[arg(long, global = true, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Ollama model used for narratives
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Anthropic API key for the cloud backend
    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Turn AI narratives on or off (true, false)
    #[arg(long, global = true, env = "STORE_INSIGHTS_AI_ENABLED", value_name = "BOOL")]
    pub ai_enabled: Option<bool>,

    /// Store name used in prompts and reports
    #[arg(long, global = true, value_name = "NAME")]
    pub store_name: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .store-insights.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show which backends are reachable and which modules are enabled
    Status,

    /// Restock forecast from recent sales velocity
    Forecast {
        /// Lookback window in days
        #[arg(long, value_name = "DAYS")]
        days: Option<u32>,
    },

    /// Low stock, sales anomalies and void-rate alerts
    Alerts,

    /// Products frequently bought together
    Customers {
        /// Lookback window in days
        #[arg(long, value_name = "DAYS")]
        days: Option<u32>,

        /// Minimum times a pair must appear together
        #[arg(long, value_name = "COUNT")]
        min_occurrences: Option<usize>,
    },

    /// Ask a free-text question about recent sales
    Ask {
        /// The question to answer
        question: String,

        /// Lookback window in days
        #[arg(long, value_name = "DAYS")]
        days: Option<u32>,

        /// Skip the local backend and go straight to the cloud
        #[arg(long)]
        force_cloud: bool,
    },
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

impl Command {
    /// Whether this command reads the sales snapshot.
    pub fn needs_data(&self) -> bool {
        !matches!(self, Command::Status)
    }

    /// Lookback window given on the command line, if any.
    pub fn days(&self) -> Option<u32> {
        match self {
            Command::Forecast { days }
            | Command::Customers { days, .. }
            | Command::Ask { days, .. } => *days,
            Command::Status | Command::Alerts => None,
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
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A command is required (status, forecast, alerts, customers, ask)".to_string());
        };

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(days) = command.days() {
            let max_days = crate::analytics::MAX_WINDOW_DAYS;
            if !(1..=max_days).contains(&i64::from(days)) {
                return Err(format!("Days must be between 1 and {}", max_days));
            }
        }

        if let Command::Ask { question, .. } = command {
            if question.trim().is_empty() {
                return Err("Question must not be empty".to_string());
            }
        }

        if command.needs_data() && !self.data.exists() {
            return Err(format!(
                "Sales snapshot does not exist: {}",
                self.data.display()
            ));
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

    /// Filter directives for the log subscriber. A non-empty `RUST_LOG`
    /// takes precedence over `--verbose` and `--quiet`.
    pub fn log_directives(&self, rust_log: Option<&str>) -> String {
        match rust_log.map(str::trim) {
            Some(directives) if !directives.is_empty() => directives.to_string(),
            _ => self.log_level().to_string().to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            command: Some(Command::Status),
            data: PathBuf::from("store-snapshot.json"),
            output: None,
            format: OutputFormat::Markdown,
            config: None,
            ollama_url: None,
            model: None,
            anthropic_api_key: None,
            ai_enabled: None,
            store_name: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_subcommands() {
        let args = Args::try_parse_from([
            "store-insights",
            "ask",
            "What sold best?",
            "--days",
            "3",
            "--force-cloud",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(
            args.command,
            Some(Command::Ask {
                question: "What sold best?".to_string(),
                days: Some(3),
                force_cloud: true,
            })
        );
        assert_eq!(args.format, OutputFormat::Json);

        let args = Args::try_parse_from(["store-insights", "--ai-enabled", "true", "status"]).unwrap();
        assert_eq!(args.ai_enabled, Some(true));
    }

    #[test]
    fn test_status_needs_no_snapshot() {
        let mut args = make_args();
        args.data = PathBuf::from("/nonexistent/snapshot.json");
        assert!(args.validate().is_ok());

        args.command = Some(Command::Alerts);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_requires_command() {
        let mut args = make_args();
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_days_and_url() {
        let mut args = make_args();
        args.command = Some(Command::Forecast { days: Some(0) });
        assert!(args.validate().is_err());

        args.command = Some(Command::Ask {
            question: "Ventas?".to_string(),
            days: Some(u32::MAX),
            force_cloud: false,
        });
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
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
    fn test_log_directives() {
        let mut args = make_args();
        args.verbose = true;

        assert_eq!(args.log_directives(None), "debug");
        assert_eq!(args.log_directives(Some("  ")), "debug");
        assert_eq!(
            args.log_directives(Some("store_insights::gateway=trace")),
            "store_insights::gateway=trace"
        );
    }
}
