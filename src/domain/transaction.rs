//! Token transfer records
//!
//! `RawTransaction` is what an explorer returns, with the transfer amount
//! still in base units. `NormalizedTransaction` adds the whole-token value,
//! computed with decimal arithmetic from the transfer's own decimals field.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Largest scale `Decimal` can represent
const MAX_DECIMAL_SCALE: u32 = 28;

/// Digit count that always fits a `u128`
const MAX_UNIT_DIGITS: usize = 38;

/// Why a single transfer could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Invalid raw value: {0:?}")]
    InvalidValue(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Zero-value transfer")]
    ZeroValue,
}

/// Token transfer as reported by a chain explorer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTransaction {
    pub hash: String,
    pub from_address: String,
    pub to_address: String,
    /// Amount in base units, arbitrary precision
    pub raw_value: String,
    pub token_decimals: u32,
    /// Unix seconds
    pub timestamp: u64,
    pub block_number: u64,
}

impl RawTransaction {
    /// Key identifying the same transfer seen twice across pages
    pub fn dedup_key(&self) -> (&str, &str, &str, &str) {
        (
            &self.hash,
            &self.from_address,
            &self.to_address,
            &self.raw_value,
        )
    }

    /// Whole-token value: `raw_value / 10^token_decimals`
    pub fn normalized_value(&self) -> Result<Decimal, NormalizeError> {
        let digits = self.raw_value.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NormalizeError::InvalidValue(self.raw_value.clone()));
        }

        // Drop fractional digits the mantissa could never hold
        let mut digits = digits.trim_start_matches('0');
        let mut decimals = self.token_decimals;
        while digits.len() > MAX_UNIT_DIGITS && decimals > 0 {
            digits = &digits[..digits.len() - 1];
            decimals -= 1;
        }

        let units: u128 = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|_| NormalizeError::OutOfRange(self.raw_value.clone()))?
        };

        decimal_from_units(units, decimals)
            .ok_or_else(|| NormalizeError::OutOfRange(self.raw_value.clone()))
    }
}

/// Builds `units / 10^decimals`.
///
/// Exact whenever the result fits in a `Decimal` (96-bit mantissa, scale
/// <= 28). Beyond that, least significant fractional digits are dropped
/// until it fits; the integer part is never truncated.
fn decimal_from_units(mut units: u128, mut decimals: u32) -> Option<Decimal> {
    while decimals > MAX_DECIMAL_SCALE {
        units /= 10;
        decimals -= 1;
    }

    loop {
        let mantissa = i128::try_from(units).ok();
        if let Some(value) =
            mantissa.and_then(|m| Decimal::try_from_i128_with_scale(m, decimals).ok())
        {
            return Some(value);
        }
        if decimals == 0 {
            return None;
        }
        units /= 10;
        decimals -= 1;
    }
}

/// Transfer with its whole-token value. Invariant: `value > 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTransaction {
    #[serde(flatten)]
    pub raw: RawTransaction,
    pub value: Decimal,
}

impl NormalizedTransaction {
    pub fn from_raw(raw: RawTransaction) -> Result<Self, NormalizeError> {
        let value = raw.normalized_value()?;
        if value.is_zero() {
            return Err(NormalizeError::ZeroValue);
        }
        Ok(Self { raw, value })
    }
}
