//! LaunchWarden - launchd service inspector and controller
//!
//! Main entry point for the LaunchWarden CLI.

mod cli;
mod commands;

use std::path::Path;

use clap::Parser;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use launchwarden_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

use crate::cli::Cli;

/// Initialize tracing with console and rolling-file output.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&logging.dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("launchwarden")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&logging.dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keeps the background writer alive until exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> = std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        // Console layer on stderr so command output stays clean.
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = ConfigLoader::load_or_default(path)?;

    let validation = ConfigValidator::validate(&config);
    if !validation.is_valid() {
        let errors: Vec<String> = validation.errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Logging to {} disabled: {}", config.logging.dir.display(), e);
    }

    for warning in &ConfigValidator::validate(&config).warnings {
        warn!("Config: {}: {}", warning.path, warning.message);
    }

    if let Err(e) = commands::run(cli.command, config).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
