//! Etherscan-family `tokentx` wire types
//!
//! Etherscan and BscScan share one response shape. `result` is a list of
//! transfers on success and a plain error string otherwise.

use serde::Deserialize;

use crate::domain::{FetchError, Origin, RawTransaction, NO_RECORDS_MESSAGE};

#[derive(Debug, Clone, Deserialize)]
pub struct TokenTxResponse {
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub result: TokenTxResult,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenTxResult {
    Transfers(Vec<TokenTransfer>),
    Text(String),
}

impl Default for TokenTxResult {
    fn default() -> Self {
        TokenTxResult::Transfers(Vec::new())
    }
}

/// One transfer. Numbers arrive as decimal strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenTransfer {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub token_decimal: String,
    pub time_stamp: String,
    pub block_number: String,
}

impl TokenTransfer {
    /// None when a numeric field does not parse
    pub fn to_raw(&self) -> Option<RawTransaction> {
        if self.hash.is_empty() {
            return None;
        }
        Some(RawTransaction {
            hash: self.hash.clone(),
            from_address: self.from.clone(),
            to_address: self.to.clone(),
            raw_value: self.value.clone(),
            token_decimals: self.token_decimal.trim().parse().ok()?,
            timestamp: self.time_stamp.trim().parse().ok()?,
            block_number: self.block_number.trim().parse().ok()?,
        })
    }
}

impl TokenTxResponse {
    pub fn is_success(&self) -> bool {
        self.status == "1" && self.message == "OK"
    }

    /// Success page as raw transfers, anything else as a provider error
    pub fn into_page(self, origin: Origin) -> Result<Vec<RawTransaction>, FetchError> {
        if !self.is_success() {
            if self.status == "0" && self.message == NO_RECORDS_MESSAGE {
                return Err(FetchError::no_records(origin));
            }
            let detail = match &self.result {
                TokenTxResult::Text(text) if !text.is_empty() => format!("{}: {}", self.message, text),
                _ => self.message.clone(),
            };
            return Err(FetchError::provider(origin, detail));
        }

        let transfers = match self.result {
            TokenTxResult::Transfers(transfers) => transfers,
            TokenTxResult::Text(text) => {
                return Err(FetchError::parse(
                    origin,
                    format!("expected a transfer list, got text '{}'", text),
                ));
            }
        };

        Ok(transfers
            .iter()
            .filter_map(|transfer| {
                let raw = transfer.to_raw();
                if raw.is_none() {
                    tracing::debug!("Dropping malformed transfer {:?} from {}", transfer.hash, origin);
                }
                raw
            })
            .collect())
    }
}
