//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - Circulating-supply data (stablecoin aggregator)
//! - Token-transfer history (chain explorers)
//! - Report delivery (console, channels)

pub mod supply;
pub mod explorer;
pub mod report;
pub mod mocks;

pub use supply::{PeggedAsset, SupplyPort};
pub use explorer::{ExplorerPort, PageRequest};
pub use report::ReportSink;
