//! Scripted chain for integration testing.
//!
//! Provides a deterministic `ChainClient` that holds balances in memory,
//! fills every swap at exactly its minimum output, and records each swap
//! attempt with the (tokio) time it happened. Swaps can be forced to fail
//! or held open until the test releases them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use hyperion_volume::chain::ChainClient;
use hyperion_volume::types::*;

pub fn token_a() -> Address {
    Address::parse("0xa").unwrap()
}

pub fn token_b() -> Address {
    Address::parse("0xb").unwrap()
}

pub fn pair() -> TokenPair {
    TokenPair::new(token_a(), token_b())
}

pub struct ScriptedChain {
    balances: Mutex<HashMap<Address, u64>>,
    names: HashMap<Address, String>,
    attempts: Mutex<Vec<(SwapIntent, Instant)>>,
    balance_reads: AtomicUsize,
    fail_swaps: AtomicBool,
    hold_swaps: AtomicBool,
    /// Signalled when a held swap has started.
    pub swap_started: Notify,
    /// Releases one held swap.
    pub release_swap: Notify,
}

impl ScriptedChain {
    pub fn new(balance_a: u64, balance_b: u64) -> Self {
        let balances = HashMap::from([(token_a(), balance_a), (token_b(), balance_b)]);
        Self {
            balances: Mutex::new(balances),
            names: HashMap::new(),
            attempts: Mutex::new(Vec::new()),
            balance_reads: AtomicUsize::new(0),
            fail_swaps: AtomicBool::new(false),
            hold_swaps: AtomicBool::new(false),
            swap_started: Notify::new(),
            release_swap: Notify::new(),
        }
    }

    pub fn with_names(mut self, a: &str, b: &str) -> Self {
        self.names.insert(token_a(), a.to_string());
        self.names.insert(token_b(), b.to_string());
        self
    }

    /// Every subsequent swap fails simulation.
    pub fn fail_swaps(&self) {
        self.fail_swaps.store(true, Ordering::SeqCst);
    }

    /// Every subsequent swap blocks until `release_swap` is notified.
    pub fn hold_swaps(&self) {
        self.hold_swaps.store(true, Ordering::SeqCst);
    }

    pub fn balance(&self, token: &Address) -> u64 {
        self.balances.lock().unwrap().get(token).copied().unwrap_or(0)
    }

    pub fn attempts(&self) -> Vec<(SwapIntent, Instant)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    fn address(&self) -> Address {
        Address::parse("0xcafe").unwrap()
    }

    async fn token_balance(&self, token: &Address) -> Balance {
        self.balance_reads.fetch_add(1, Ordering::SeqCst);
        match self.balances.lock().unwrap().get(token) {
            Some(amount) => Balance::Available(*amount),
            None => Balance::Missing,
        }
    }

    async fn token_name(&self, token: &Address) -> TokenName {
        match self.names.get(token) {
            Some(symbol) => TokenName::Symbol(symbol.clone()),
            None => TokenName::Fallback(token.short()),
        }
    }

    async fn execute_swap(&self, intent: &SwapIntent) -> Result<TxHash, ChainError> {
        let n = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push((intent.clone(), Instant::now()));
            attempts.len()
        };

        if self.hold_swaps.load(Ordering::SeqCst) {
            self.swap_started.notify_one();
            self.release_swap.notified().await;
        }

        if self.fail_swaps.load(Ordering::SeqCst) {
            return Err(ChainError::SimulationFailed {
                vm_status: "Move abort: E_OUTPUT_LESS_THAN_MINIMUM".into(),
            });
        }

        let mut balances = self.balances.lock().unwrap();
        let from = balances.entry(intent.from.clone()).or_insert(0);
        *from = from.saturating_sub(intent.amount_in);
        *balances.entry(intent.to.clone()).or_insert(0) += intent.min_amount_out;

        Ok(TxHash(format!("0x{n:064x}")))
    }

    async fn account_info(&self) -> Result<AccountInfo, ChainError> {
        Ok(AccountInfo {
            sequence_number: self.attempt_count() as u64,
            authentication_key: self.address().to_string(),
        })
    }
}
