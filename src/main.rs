//! Dealbot CLI binary

use anyhow::Context;
use clap::Parser;
use dealbot::cli::{Cli, Commands, DealbotApp};
use dealbot::config::{Config, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.command.config_path().map(|p| p.as_path()))
        .context("failed to load configuration")?;

    init_logging(&config.logging);

    match cli.command {
        Commands::Serve { bind, .. } => {
            let app = DealbotApp::new(config)?;
            app.serve(bind.as_deref()).await?;
        }

        Commands::Chat { .. } => {
            let app = DealbotApp::new(config)?;
            app.chat().await?;
        }

        Commands::Config { .. } => {
            print!("{}", config.to_redacted_toml()?);
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level; logs go to stderr so `chat` output stays clean
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
