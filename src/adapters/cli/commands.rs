//! CLI Command Definitions
//!
//! Argument parsing for the stablewatch binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::adapters::console::ReportFormat;

/// Stablewatch - Stablecoin supply and large-transfer tracker
#[derive(Parser, Debug)]
#[command(
    name = "stablewatch",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Stablecoin supply and large-transfer tracker for Ethereum and BSC",
    long_about = "Stablewatch polls DefiLlama for circulating supply and Etherscan/BscScan \
                  for recent transfers of USDT, USDC and BUSD, reporting every transfer \
                  above the configured threshold."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll on the configured interval until Ctrl+C
    Run(RunCmd),

    /// Poll once, print the report, and exit
    Once(OnceCmd),

    /// List tracked tokens and their contracts
    Tokens,
}

/// Start the polling loop
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file (default: config/default.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Single poll
#[derive(Parser, Debug)]
pub struct OnceCmd {
    /// Path to configuration file (default: config/default.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}
