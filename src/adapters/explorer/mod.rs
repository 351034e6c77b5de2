//! Chain Explorer Adapter
//!
//! Implementation of the ExplorerPort over the Etherscan-family API
//! (Etherscan for Ethereum, BscScan for BSC).

mod client;
mod types;

pub use client::{ExplorerClient, ExplorerConfig, ExplorerEndpoint};
pub use types::{TokenTransfer, TokenTxResponse, TokenTxResult};
