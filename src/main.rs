//! Stablewatch - Stablecoin supply and large-transfer tracker

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stablewatch::adapters::cli::{CliApp, Command, OnceCmd, RunCmd};
use stablewatch::adapters::console::{ConsoleReporter, ReportFormat};
use stablewatch::adapters::{ExplorerClient, LlamaClient};
use stablewatch::application::{PollSettings, ProviderLimiters, Schedule, Scheduler, TokenPoller};
use stablewatch::config::{load_config_or_default, loader::LoggingSection, Config};
use stablewatch::domain::{Chain, SUPPORTED_TOKENS};
use stablewatch::ports::ReportSink;

type LiveScheduler = Scheduler<LlamaClient, ExplorerClient>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (API keys go here, not in the TOML file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    match app.command {
        Command::Run(ref cmd) => {
            let config = prepare(&app, cmd.config.as_deref())?;
            run_command(cmd, config).await
        }
        Command::Once(ref cmd) => {
            let config = prepare(&app, cmd.config.as_deref())?;
            once_command(cmd, config).await
        }
        Command::Tokens => {
            init_logging(app.verbose, app.debug, &LoggingSection::default())?;
            tokens_command();
            Ok(())
        }
    }
}

/// Load config, then install logging from it
fn prepare(app: &CliApp, path: Option<&Path>) -> Result<Config> {
    let config = load_config_or_default(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    init_logging(app.verbose, app.debug, &config.logging)?;
    Ok(config)
}

fn init_logging(verbose: bool, debug: bool, logging: &LoggingSection) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let file_layer = if logging.log_to_file {
        let path = PathBuf::from(shellexpand::tilde(&logging.log_file).into_owned());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn build_scheduler(config: &Config) -> Result<LiveScheduler> {
    let keys = config
        .resolve_api_keys()
        .context("Explorer API keys are not configured (see .env.example)")?;
    tracing::info!("API keys verified");

    let aggregator = LlamaClient::new(config.llama_config())
        .context("Failed to create aggregator client")?;
    let explorer = ExplorerClient::new(config.explorer_config(&keys))
        .context("Failed to create explorer client")?;

    let poller = TokenPoller::new(
        Arc::new(aggregator),
        Arc::new(explorer),
        ProviderLimiters::from(config),
        PollSettings::from(config),
    );

    Scheduler::new(poller, Schedule::from(config)).context("Failed to create scheduler")
}

fn reporter(format: ReportFormat, config: &Config) -> ConsoleReporter {
    ConsoleReporter::new(format, PollSettings::from(config).window)
}

async fn run_command(cmd: &RunCmd, config: Config) -> Result<()> {
    tracing::info!("Starting stablewatch...");

    let scheduler = build_scheduler(&config)?;
    let reporter = reporter(cmd.format, &config);

    // Setup Ctrl+C handler
    let stopper = scheduler.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        stopper.stop();
    });

    let schedule = scheduler.schedule();
    tracing::info!(
        "Reporting every {}s (tick timeout {}s)",
        schedule.interval.as_secs(),
        schedule.tick_timeout.as_secs()
    );

    scheduler.run(&reporter).await?;

    let status = scheduler.status().await;
    tracing::info!(
        "stablewatch stopped after {} ticks (last tick errors: {})",
        status.ticks_completed,
        status.last_tick_errors.map_or_else(|| "n/a".to_string(), |n| n.to_string())
    );
    Ok(())
}

async fn once_command(cmd: &OnceCmd, config: Config) -> Result<()> {
    let scheduler = build_scheduler(&config)?;
    let reporter = reporter(cmd.format, &config);

    let report = scheduler.run_once().await;
    reporter
        .publish(&report)
        .context("Failed to write report")?;

    if let Some(errors) = scheduler.status().await.last_tick_errors.filter(|n| *n > 0) {
        tracing::warn!("Report has {} fetch errors", errors);
    }
    Ok(())
}

fn tokens_command() {
    println!("{:<6} {:<12} {:<9} CONTRACT", "TOKEN", "LOOKUP", "CHAIN");
    for token in SUPPORTED_TOKENS {
        for chain in Chain::ALL {
            if let Some(address) = token.contract_address(chain) {
                println!(
                    "{:<6} {:<12} {:<9} {}",
                    token.symbol,
                    token.aggregator_lookup_key,
                    chain.to_string(),
                    address
                );
            }
        }
    }
}
