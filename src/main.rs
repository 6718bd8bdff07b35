//! Store Insights - AI-augmented analytics for a point-of-sale store
//!
//! A CLI that computes restock forecasts, alerts and basket analysis from a
//! sales snapshot and asks a local or cloud model to narrate them.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, snapshot, AI unavailable for a question, etc.)

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use store_insights::analytics::{BusinessQuery, CustomerInsights, DemandForecast, SmartAlerts};
use store_insights::cli::{Args, Command, OutputFormat};
use store_insights::config::{Config, CONFIG_FILE_NAME};
use store_insights::gateway::Gateway;
use store_insights::models::AnalysisEnvelope;
use store_insights::registry::ModuleRegistry;
use store_insights::report::{self, MarkdownSection};
use store_insights::store::{SalesStore, SnapshotStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("Store Insights v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Command failed: {}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .store-insights.toml.
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
    println!("   Edit it to enable AI, pick models, and tune alert thresholds.");
    Ok(())
}

/// Initialize logging from `RUST_LOG` or the verbosity flags.
fn init_logging(args: &Args) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = EnvFilter::try_new(args.log_directives(rust_log.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let gateway = Arc::new(Gateway::new(&config.ai).context("Failed to set up AI gateway")?);

    let Some(command) = args.command.clone() else {
        return Ok(());
    };

    let output = match command {
        Command::Status => {
            let registry = ModuleRegistry::new(gateway, &config);
            let status = with_spinner(&args, "Probing AI backends...", registry.status()).await;
            match args.format {
                OutputFormat::Json => report::generate_json_report(&status)?,
                OutputFormat::Markdown => report::generate_status_markdown(&status),
            }
        }
        Command::Forecast { days } => {
            let module = DemandForecast::new(load_store(&args.data)?, gateway, &config);
            let envelope = with_spinner(&args, "Forecasting demand...", module.run(days)).await?;
            render(&args, &config, &envelope)?
        }
        Command::Alerts => {
            let module = SmartAlerts::new(load_store(&args.data)?, gateway, &config);
            let envelope = with_spinner(&args, "Checking alerts...", module.run()).await?;
            render(&args, &config, &envelope)?
        }
        Command::Customers {
            days,
            min_occurrences,
        } => {
            let module = CustomerInsights::new(load_store(&args.data)?, gateway, &config);
            let envelope = with_spinner(
                &args,
                "Analyzing baskets...",
                module.run(days, min_occurrences),
            )
            .await?;
            render(&args, &config, &envelope)?
        }
        Command::Ask {
            question,
            days,
            force_cloud,
        } => {
            let module = BusinessQuery::new(load_store(&args.data)?, gateway, &config);
            let envelope = with_spinner(
                &args,
                "Asking the AI...",
                module.ask(&question, days, force_cloud),
            )
            .await?;
            render(&args, &config, &envelope)?
        }
    };

    write_output(&args, &output)
}

/// Run a future behind a spinner unless in quiet mode.
async fn with_spinner<F: Future>(args: &Args, message: &'static str, future: F) -> F::Output {
    if args.quiet {
        return future.await;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let output = future.await;
    spinner.finish_and_clear();
    output
}

fn render<T>(args: &Args, config: &Config, envelope: &AnalysisEnvelope<T>) -> Result<String>
where
    T: MarkdownSection + serde::Serialize,
{
    Ok(match args.format {
        OutputFormat::Json => report::generate_json_report(envelope)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(envelope, &config.general.currency_symbol)
        }
    })
}

fn write_output(args: &Args, output: &str) -> Result<()> {
    match args.output {
        Some(ref path) => {
            std::fs::write(path, output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                eprintln!("✅ Report saved to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }
    Ok(())
}

fn load_store(path: &Path) -> Result<Arc<dyn SalesStore>> {
    info!("Loading sales snapshot from: {}", path.display());
    let store = SnapshotStore::load(path)
        .with_context(|| format!("Failed to load sales snapshot {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

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
