//! Stablewatch - Stablecoin supply and large-transfer tracker
//!
//! Polls a stablecoin aggregator and two chain explorers on a fixed interval,
//! reporting circulating supply and the largest recent transfers of USDT,
//! USDC and BUSD on Ethereum and BSC.
//!
//! # Modules
//!
//! - `domain`: Core types and pure logic (tokens, transfers, ranking, poll results)
//! - `ports`: Trait abstractions (SupplyPort, ExplorerPort, ReportSink) and test mocks
//! - `application`: Rate limiting, fetchers, token poller, and tick scheduler
//! - `adapters`: External implementations (DefiLlama, Etherscan/BscScan, console, CLI)
//! - `config`: Configuration loading and validation

pub mod domain;
pub mod ports;
pub mod application;
pub mod adapters;
pub mod config;
