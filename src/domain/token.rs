//! Tracked tokens and the chains they live on.

use serde::Serialize;
use std::fmt;

/// Blockchain network hosting a deployment of each tracked token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Bsc,
}

impl Chain {
    /// Every supported chain, in report order
    pub const ALL: [Chain; 2] = [Chain::Ethereum, Chain::Bsc];

    /// Default explorer API endpoint (Etherscan-compatible)
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Chain::Ethereum => "https://api.etherscan.io/api",
            Chain::Bsc => "https://api.bscscan.com/api",
        }
    }

    /// Human-facing explorer site, used for transaction links
    pub fn explorer_url(&self) -> &'static str {
        match self {
            Chain::Ethereum => "https://etherscan.io",
            Chain::Bsc => "https://bscscan.com",
        }
    }

    /// Environment variable holding this chain's explorer API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETHERSCAN_API_KEY",
            Chain::Bsc => "BSCSCAN_API_KEY",
        }
    }

    /// Placeholder value shipped in sample `.env` files
    pub fn placeholder_api_key(&self) -> &'static str {
        match self {
            Chain::Ethereum => "your_etherscan_api_key_here",
            Chain::Bsc => "your_bscscan_api_key_here",
        }
    }

    pub fn tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url(), hash)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Ethereum => write!(f, "ETHEREUM"),
            Chain::Bsc => write!(f, "BSC"),
        }
    }
}

/// A stablecoin identified across both chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TokenSpec {
    /// Ticker symbol (USDT, USDC, ...)
    pub symbol: &'static str,
    /// Name or symbol the aggregator lists this asset under
    pub aggregator_lookup_key: &'static str,
    /// Contract address per chain
    #[serde(skip)]
    pub contracts: &'static [(Chain, &'static str)],
}

impl TokenSpec {
    /// Contract address on the given chain, if the token is deployed there
    pub fn contract_address(&self, chain: Chain) -> Option<&'static str> {
        self.contracts
            .iter()
            .find(|(c, _)| *c == chain)
            .map(|(_, address)| *address)
    }
}

impl fmt::Display for TokenSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol)
    }
}

pub const USDT: TokenSpec = TokenSpec {
    symbol: "USDT",
    aggregator_lookup_key: "Tether",
    contracts: &[
        (Chain::Ethereum, "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
        (Chain::Bsc, "0x55d398326f99059fF775485246999027B3197955"),
    ],
};

pub const USDC: TokenSpec = TokenSpec {
    symbol: "USDC",
    aggregator_lookup_key: "USD Coin",
    contracts: &[
        (Chain::Ethereum, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        (Chain::Bsc, "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
    ],
};

pub const BUSD: TokenSpec = TokenSpec {
    symbol: "BUSD",
    aggregator_lookup_key: "Binance USD",
    contracts: &[
        (Chain::Ethereum, "0x4Fabb145d64652a948d72533023f6E7A623C7C53"),
        (Chain::Bsc, "0xe9e7CEA3DedcA5984780Bafc599bD69ADd087D56"),
    ],
};

/// The fixed set of tracked tokens, in report order
pub const SUPPORTED_TOKENS: &[TokenSpec] = &[USDT, USDC, BUSD];
