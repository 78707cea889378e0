//! Pricing Runner (upa-pr) - Main entry point
//!
//! Loads a TOML run configuration and a JSON unit list, prices every
//! available unit and prints the price table. Optionally writes the committed
//! prices as JSON for the persistence side.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use upa_common::config::{load_units, resolve_config_path, RunConfig, CONFIG_ENV_VAR};
use upa_common::{commit_prices, price_units, CalibrationMode, PricingStrategy};

mod report;

/// Output format for the price table
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Command-line arguments for upa-pr
#[derive(Parser, Debug)]
#[command(name = "upa-pr")]
#[command(about = "Unit pricing allocation runner")]
#[command(version)]
struct Args {
    /// Run configuration (TOML)
    #[arg(short, long, env = "UPA_CONFIG")]
    config: Option<PathBuf>,

    /// Unit records (JSON array)
    #[arg(short, long, env = "UPA_UNITS")]
    units: PathBuf,

    /// Price table output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Write committed prices to this JSON file
    #[arg(long)]
    commit: Option<PathBuf>,

    /// Override the configured pricing strategy (budget_share, bound_clamp)
    #[arg(long)]
    strategy: Option<String>,

    /// Override the configured calibration mode (spread_rate, median_split)
    #[arg(long)]
    calibration: Option<String>,
}

/// Default filter directive for both crates at `level`
fn default_filter(level: &str) -> String {
    format!("upa_pr={0},upa_common={0}", level.trim())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing before anything logs; RUST_LOG wins over the config
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_overrides = from_env.is_some();
    let (filter, filter_handle) = reload::Layer::new(
        from_env.unwrap_or_else(|| EnvFilter::new(default_filter("info"))),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR)
        .context("Failed to resolve run configuration")?;
    let mut config = RunConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    if !env_overrides {
        filter_handle
            .reload(EnvFilter::new(default_filter(&config.logging.level)))
            .context("Failed to apply configured log level")?;
    }

    info!("Run configuration: {}", config_path.display());

    if let Some(s) = &args.strategy {
        config.pricing.strategy =
            PricingStrategy::from_str(s).ok_or_else(|| anyhow!("Unknown pricing strategy: {}", s))?;
    }
    if let Some(s) = &args.calibration {
        config.pricing.calibration = CalibrationMode::from_str(s)
            .ok_or_else(|| anyhow!("Unknown calibration mode: {}", s))?;
    }

    let mut units = load_units(&args.units)
        .with_context(|| format!("Failed to load units from {}", args.units.display()))?;
    info!("Loaded {} units from {}", units.len(), args.units.display());

    let table = price_units(&config.pricing_input(units.clone()));

    match args.format {
        OutputFormat::Text => print!("{}", report::render_text(&table)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&table).context("Failed to serialize price table")?
        ),
    }

    if let Some(path) = &args.commit {
        let records = commit_prices(&mut units, &table, config.pricing.strategy);
        let json = serde_json::to_string_pretty(&records)
            .context("Failed to serialize committed prices")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} committed prices to {}", records.len(), path.display());
    }

    Ok(())
}
