//! Slippage-bounded minimum output.
//!
//! `min_out = floor(amount_in × (100 − slippage%) / 100)`, evaluated in
//! integer arithmetic. The percentage is held as a `Decimal` with at most
//! six decimal places (micro-percent), so the keep ratio is exact and
//! amounts never pass through a float.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::str::FromStr;

/// Keep ratio resolution: 100% == 100 × 10^6.
const KEEP_SCALE: u128 = 1_000_000;
/// Decimal places representable at `KEEP_SCALE`.
const MAX_DECIMALS: u32 = 6;
const FULL_KEEP: u128 = 100 * KEEP_SCALE;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlippageError {
    #[error("slippage {0}% is outside [0, 100)")]
    OutOfRange(Decimal),

    #[error("slippage {0:?} is not a decimal number")]
    NotANumber(String),

    #[error("slippage {0}% has more than 6 decimal places")]
    TooPrecise(Decimal),
}

/// Validated slippage tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slippage {
    percent: Decimal,
    /// (100 − percent) × 10^6, exact.
    keep_micro: u128,
}

impl Slippage {
    pub fn from_percent(percent: Decimal) -> Result<Self, SlippageError> {
        if percent < Decimal::ZERO || percent >= dec!(100) {
            return Err(SlippageError::OutOfRange(percent));
        }
        if percent.normalize().scale() > MAX_DECIMALS {
            return Err(SlippageError::TooPrecise(percent));
        }

        let keep_micro = ((dec!(100) - percent) * Decimal::from(KEEP_SCALE as u64))
            .trunc()
            .to_u128()
            .ok_or(SlippageError::OutOfRange(percent))?;

        Ok(Self { percent, keep_micro })
    }

    pub fn percent(&self) -> Decimal {
        self.percent
    }

    /// Minimum acceptable output for `amount_in`. Never exceeds `amount_in`.
    pub fn min_amount_out(&self, amount_in: u64) -> u64 {
        let scaled = u128::from(amount_in) * self.keep_micro / FULL_KEEP;
        u64::try_from(scaled).unwrap_or(amount_in)
    }
}

impl Default for Slippage {
    /// 0.3%
    fn default() -> Self {
        Self {
            percent: dec!(0.3),
            keep_micro: 99_700_000,
        }
    }
}

impl FromStr for Slippage {
    type Err = SlippageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let percent = Decimal::from_str(s.trim())
            .map_err(|_| SlippageError::NotANumber(s.to_string()))?;
        Self::from_percent(percent)
    }
}

impl fmt::Display for Slippage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent.normalize())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
