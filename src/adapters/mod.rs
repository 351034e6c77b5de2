//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Llama: DefiLlama stablecoins API (SupplyPort)
//! - Explorer: Etherscan / BscScan token-transfer API (ExplorerPort)
//! - Console: text and JSON tick reports (ReportSink)
//! - CLI: Command-line interface definitions

pub mod llama;
pub mod explorer;
pub mod console;
pub mod cli;

pub use llama::LlamaClient;
pub use explorer::ExplorerClient;
pub use console::{ConsoleReporter, ReportFormat};
pub use cli::CliApp;
