use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use page_skew::{analyze, Cli, SkewConfig};

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.default_log_filter());

    let config = match &cli.config {
        Some(path) => SkewConfig::load(path)
            .with_context(|| format!("Failed to load config: {:?}", path))?,
        None => SkewConfig::default(),
    };

    let report = analyze(&cli.input, &config, cli.visualize)
        .with_context(|| format!("Could not determine skew of {:?}", cli.input))?;

    println!("{report}");
    println!(
        "{}",
        report
            .automation_line()
            .context("Failed to serialize result")?
    );

    Ok(())
}
