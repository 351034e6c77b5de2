//! DefiLlama Adapter
//!
//! Implementation of the SupplyPort over the DefiLlama stablecoins API.

mod client;
mod types;

pub use client::{LlamaClient, LlamaConfig, DEFAULT_LLAMA_URL};
pub use types::{PeggedAssetRecord, StablecoinsResponse};
