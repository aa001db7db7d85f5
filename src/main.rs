//! Autospec Trends - CLI entry point
//!
//! Reads `fullspecs.csv` and writes `City_aei.png`, `Highway_aei.png` and
//! `api.png` into the current directory.

use anyhow::{Context, Result};
use autospec_trends::config::{AppConfig, DEFAULT_INPUT};
use autospec_trends::pipeline;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "autospec_trends")]
#[command(about = "Annualized mileage and price growth per make", long_about = None)]
struct Cli {
    /// Transposed spec sheet CSV
    #[arg(value_name = "FILE", default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Directory the charts are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::new(cli.input, cli.output_dir);

    pipeline::run(&config)
        .with_context(|| format!("processing {}", config.input().display()))?;

    Ok(())
}
