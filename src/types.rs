//! Shared types for the volume bot.
//!
//! These types form the data model used across the chain client, the
//! balance inspector and the swap-cycle controller. They are kept free of
//! I/O so every other module can depend on them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::strategy::slippage::Slippage;

/// Hex digits in a canonical Aptos account address (32 bytes).
pub const ADDRESS_HEX_LEN: usize = 64;

/// Decimals used for human-readable amounts when the token's own
/// decimals are not known.
pub const DEFAULT_DISPLAY_DECIMALS: u32 = 6;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// An on-chain account / object address in canonical form:
/// exactly one `0x` prefix followed by 64 lowercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address has {0} hex digits, at most 64 allowed")]
    TooLong(usize),

    #[error("address contains non-hex character {0:?}")]
    InvalidChar(char),
}

/// Normalize a textual address: strip one optional `0x` prefix, validate
/// the hex body, left-pad to 64 digits and lowercase.
///
/// Idempotent: `normalize_address(normalize_address(x)?) == normalize_address(x)`.
pub fn normalize_address(raw: &str) -> Result<String, AddressError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if body.is_empty() {
        return Err(AddressError::Empty);
    }
    if body.len() > ADDRESS_HEX_LEN {
        return Err(AddressError::TooLong(body.len()));
    }
    if let Some(bad) = body.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(AddressError::InvalidChar(bad));
    }

    Ok(format!(
        "0x{:0>width$}",
        body.to_ascii_lowercase(),
        width = ADDRESS_HEX_LEN
    ))
}

impl Address {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        normalize_address(raw).map(Self)
    }

    /// Build an address from 32 raw bytes (e.g. a derived authentication key).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated display form, e.g. `0x1a2b…9f0e`.
    pub fn short(&self) -> String {
        let body = &self.0[2..];
        format!("0x{}…{}", &body[..4], &body[body.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

// ---------------------------------------------------------------------------
// Token pair
// ---------------------------------------------------------------------------

/// The two fixed tokens the bot alternates between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token_a: Address,
    pub token_b: Address,
}

impl TokenPair {
    pub fn new(token_a: Address, token_b: Address) -> Self {
        Self { token_a, token_b }
    }

    /// (from, to) for a swap direction.
    pub fn route(&self, direction: SwapDirection) -> (&Address, &Address) {
        match direction {
            SwapDirection::AToB => (&self.token_a, &self.token_b),
            SwapDirection::BToA => (&self.token_b, &self.token_a),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    AToB,
    BToA,
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::AToB => write!(f, "A→B"),
            SwapDirection::BToA => write!(f, "B→A"),
        }
    }
}

// ---------------------------------------------------------------------------
// Balance
// ---------------------------------------------------------------------------

/// Result of a balance read. Absence and failure are both spendable as
/// zero, but stay distinguishable from a confirmed amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Balance {
    /// Amount reported by the chain (may be zero).
    Available(u64),
    /// No balance resource exists for this wallet/token.
    Missing,
    /// Every query path failed.
    Unavailable { reason: String },
}

impl Balance {
    /// Spendable amount in base units; zero unless confirmed.
    pub fn amount(&self) -> u64 {
        match self {
            Balance::Available(n) => *n,
            Balance::Missing | Balance::Unavailable { .. } => 0,
        }
    }

    /// True when the chain actually answered (amount or confirmed absence).
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, Balance::Unavailable { .. })
    }

    pub fn is_positive(&self) -> bool {
        self.amount() > 0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Available(n) => write!(f, "{n}"),
            Balance::Missing => write!(f, "0 (no store)"),
            Balance::Unavailable { reason } => write!(f, "0 (unavailable: {reason})"),
        }
    }
}

/// Render a base-unit amount with the given number of decimals,
/// trimming trailing zeros: `1_500_000` @ 6 → `"1.5"`.
pub fn format_token_amount(amount: u64, decimals: u32) -> String {
    Decimal::from_i128_with_scale(i128::from(amount), decimals)
        .normalize()
        .to_string()
}

// ---------------------------------------------------------------------------
// Token name
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenName {
    /// Symbol read from on-chain metadata.
    Symbol(String),
    /// Metadata lookup failed; holds a truncated-address display string.
    Fallback(String),
}

impl TokenName {
    pub fn as_str(&self) -> &str {
        match self {
            TokenName::Symbol(s) | TokenName::Fallback(s) => s,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TokenName::Symbol(_))
    }
}

impl fmt::Display for TokenName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Swap intent
// ---------------------------------------------------------------------------

/// One swap attempt: built right before submission, consumed by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
    pub from: Address,
    pub to: Address,
    pub amount_in: u64,
    pub min_amount_out: u64,
}

impl SwapIntent {
    pub fn new(from: Address, to: Address, amount_in: u64, slippage: &Slippage) -> Self {
        Self {
            from,
            to,
            amount_in,
            min_amount_out: slippage.min_amount_out(amount_in),
        }
    }
}

impl fmt::Display for SwapIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} (min out {})",
            self.amount_in,
            self.from.short(),
            self.to.short(),
            self.min_amount_out
        )
    }
}

/// Hash of a submitted transaction, as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Account info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub sequence_number: u64,
    pub authentication_key: String,
}

// ---------------------------------------------------------------------------
// Cycle statistics
// ---------------------------------------------------------------------------

/// Snapshot of the controller's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CycleStats {
    pub cycle_count: u64,
    pub is_running: bool,
    pub swaps_executed: u64,
    pub failed_cycles: u64,
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} swaps={} failed={} running={}",
            self.cycle_count, self.swaps_executed, self.failed_cycles, self.is_running
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures talking to the chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Node returned {status}: {message}")]
    Node { status: u16, message: String },

    #[error("Unexpected node response: {0}")]
    Decode(String),

    #[error("Transaction simulation failed: {vm_status}")]
    SimulationFailed { vm_status: String },

    #[error("Transaction {hash} failed on-chain: {vm_status}")]
    ExecutionFailed { hash: TxHash, vm_status: String },

    #[error("Transaction {hash} not confirmed within {timeout_secs}s")]
    ConfirmationTimeout { hash: TxHash, timeout_secs: u64 },

    #[error("Signing failed: {0}")]
    Signing(String),
}

impl ChainError {
    /// True for a 404 from the node (resource / account does not exist).
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::Node { status: 404, .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
