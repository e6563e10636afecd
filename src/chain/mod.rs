//! Blockchain access.
//!
//! Defines the `ChainClient` trait the engine trades through, and provides:
//! - `wallet` — Ed25519 identity and address derivation
//! - `aptos` — fullnode REST implementation (balances, metadata, swaps)

pub mod aptos;
pub mod wallet;

use async_trait::async_trait;

use crate::types::{AccountInfo, Address, Balance, ChainError, SwapIntent, TokenName, TxHash};

/// Abstraction over the chain the bot trades on.
///
/// Reads degrade to tagged values (`Balance::Missing`, `TokenName::Fallback`)
/// instead of failing; only writes and the diagnostic account lookup return
/// errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The wallet's account address.
    fn address(&self) -> Address;

    /// Current balance of `token` held by the wallet. Never cached.
    async fn token_balance(&self, token: &Address) -> Balance;

    /// Display symbol for `token`.
    async fn token_name(&self, token: &Address) -> TokenName;

    /// Simulate, sign, submit and confirm a router swap.
    async fn execute_swap(&self, intent: &SwapIntent) -> Result<TxHash, ChainError>;

    /// Account sequence number and auth key (diagnostics only).
    async fn account_info(&self) -> Result<AccountInfo, ChainError>;
}
