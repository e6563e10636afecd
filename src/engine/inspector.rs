//! Balance inspector — read-only diagnostics over the chain client.
//!
//! Reports both tokens' names and balances for humans, and answers the
//! "is there anything to trade" question for the startup gate. Nothing
//! here fails: unreadable values are logged and reported as tagged zeros.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::chain::ChainClient;
use crate::types::{
    format_token_amount, Address, Balance, TokenName, TokenPair, DEFAULT_DISPLAY_DECIMALS,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreflightError {
    #[error("Wallet {address} holds no balance in either token; nothing to trade")]
    EmptyWallet { address: Address },
}

/// One token's line in a balance report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReport {
    pub token: Address,
    pub name: TokenName,
    pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub address: Address,
    /// `None` when the account lookup failed.
    pub sequence_number: Option<u64>,
    pub token_a: TokenReport,
    pub token_b: TokenReport,
}

impl BalanceReport {
    pub fn has_tradable_balance(&self) -> bool {
        self.token_a.balance.is_positive() || self.token_b.balance.is_positive()
    }
}

pub struct BalanceInspector {
    client: Arc<dyn ChainClient>,
    pair: TokenPair,
}

impl BalanceInspector {
    pub fn new(client: Arc<dyn ChainClient>, pair: TokenPair) -> Self {
        Self { client, pair }
    }

    pub fn pair(&self) -> &TokenPair {
        &self.pair
    }

    /// Fetch and log the wallet's account info and both token balances.
    pub async fn check_all_balances(&self) -> BalanceReport {
        let address = self.client.address();
        info!(address = %address, "=== Balance check ===");

        let sequence_number = match self.client.account_info().await {
            Ok(account) => {
                info!(sequence_number = account.sequence_number, "Account info");
                Some(account.sequence_number)
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch account info");
                None
            }
        };

        let (token_a, token_b) = futures::join!(
            self.token_report(&self.pair.token_a),
            self.token_report(&self.pair.token_b),
        );

        for (label, report) in [("A", &token_a), ("B", &token_b)] {
            if let Balance::Unavailable { reason } = &report.balance {
                warn!(token = %report.token, reason = %reason, "Balance {label} unavailable, treating as zero");
            }
            info!(
                token = %report.token,
                name = %report.name,
                balance = %format_token_amount(report.balance.amount(), DEFAULT_DISPLAY_DECIMALS),
                raw = report.balance.amount(),
                "Token {label}"
            );
        }

        BalanceReport {
            address,
            sequence_number,
            token_a,
            token_b,
        }
    }

    /// True iff either token balance is strictly positive.
    pub async fn has_enough_balance(&self) -> bool {
        let (a, b) = futures::join!(
            self.client.token_balance(&self.pair.token_a),
            self.client.token_balance(&self.pair.token_b),
        );
        for balance in [&a, &b] {
            if !balance.is_confirmed() {
                warn!(balance = %balance, "Balance read failed during tradability check");
            }
        }
        a.is_positive() || b.is_positive()
    }

    /// Startup gate: refuse to run a wallet that holds neither token.
    pub async fn ensure_tradable(&self) -> Result<(), PreflightError> {
        if self.has_enough_balance().await {
            Ok(())
        } else {
            Err(PreflightError::EmptyWallet {
                address: self.client.address(),
            })
        }
    }

    async fn token_report(&self, token: &Address) -> TokenReport {
        let (name, balance) = futures::join!(
            self.client.token_name(token),
            self.client.token_balance(token),
        );
        TokenReport {
            token: token.clone(),
            name,
            balance,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
