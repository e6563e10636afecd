//! Swap cycle controller — the run/stop state machine.
//!
//! `Idle → Running → Idle`. While running, cycles execute strictly one after
//! another: read balances, swap all of A into B, re-read B, swap all of B
//! back into A, sleeping a random interval after each swap. A failed cycle
//! is logged and followed by a fixed backoff; the loop itself only ends on
//! `stop()`. Stop is cooperative: the in-flight swap or sleep completes, and
//! the flag is checked before every following step.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::inspector::BalanceInspector;
use crate::chain::ChainClient;
use crate::strategy::{Pacing, Slippage};
use crate::types::{Balance, CycleStats, SwapDirection, SwapIntent, TokenName, TokenPair, TxHash};

/// Display names used when on-chain symbols cannot be resolved.
pub const PLACEHOLDER_NAME_A: &str = "TOKEN_A";
pub const PLACEHOLDER_NAME_B: &str = "TOKEN_B";

/// How a cycle ended (errors are reported separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// All applicable swaps and sleeps ran.
    Completed { swaps: u32 },
    /// Neither token had a balance; nothing was attempted.
    EmptyWallet,
    /// A stop request was observed between steps.
    Stopped { swaps: u32 },
}

/// Display names for the pair, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairLabels {
    pub a: String,
    pub b: String,
}

impl PairLabels {
    fn route(&self, direction: SwapDirection) -> (&str, &str) {
        match direction {
            SwapDirection::AToB => (&self.a, &self.b),
            SwapDirection::BToA => (&self.b, &self.a),
        }
    }
}

pub struct SwapCycleController {
    client: Arc<dyn ChainClient>,
    inspector: BalanceInspector,
    pair: TokenPair,
    slippage: Slippage,
    pacing: Pacing,
    /// Cleared by `stop()`; the loop exits at its next check.
    running: AtomicBool,
    /// Held by the loop from claim until it has fully exited.
    loop_active: AtomicBool,
    cycle_count: AtomicU64,
    swaps_executed: AtomicU64,
    failed_cycles: AtomicU64,
}

impl SwapCycleController {
    pub fn new(client: Arc<dyn ChainClient>, pair: TokenPair, slippage: Slippage, pacing: Pacing) -> Self {
        let inspector = BalanceInspector::new(Arc::clone(&client), pair.clone());
        Self {
            client,
            inspector,
            pair,
            slippage,
            pacing,
            running: AtomicBool::new(false),
            loop_active: AtomicBool::new(false),
            cycle_count: AtomicU64::new(0),
            swaps_executed: AtomicU64::new(0),
            failed_cycles: AtomicU64::new(0),
        }
    }

    pub fn inspector(&self) -> &BalanceInspector {
        &self.inspector
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> CycleStats {
        CycleStats {
            cycle_count: self.cycle_count.load(Ordering::SeqCst),
            is_running: self.is_running(),
            swaps_executed: self.swaps_executed.load(Ordering::SeqCst),
            failed_cycles: self.failed_cycles.load(Ordering::SeqCst),
        }
    }

    /// Request a cooperative stop. The current step finishes first.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Stopping trading...");
        } else {
            debug!("Stop requested while idle");
        }
    }

    /// Run the trading loop until `stop()` is called.
    ///
    /// Returns `None` without doing anything while a loop is alive, including
    /// one that was asked to stop and is still finishing its current step.
    /// Otherwise returns the final counters once the loop has exited.
    pub async fn start(&self) -> Option<CycleStats> {
        if self
            .loop_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            if self.is_running() {
                warn!("Trading is already running");
            } else {
                warn!("Previous trading loop is still stopping; start ignored");
            }
            return None;
        }
        let _active = LoopGuard(&self.loop_active);
        self.running.store(true, Ordering::SeqCst);

        info!(
            slippage = %self.slippage,
            min_sleep_secs = self.pacing.min_sleep_secs(),
            max_sleep_secs = self.pacing.max_sleep_secs(),
            "Starting volume trading"
        );

        let labels = self.resolve_labels().await;
        self.inspector.check_all_balances().await;

        while self.is_running() {
            let cycle = self.cycle_count.fetch_add(1, Ordering::SeqCst) + 1;
            info!(cycle, "=== Starting cycle {cycle} ===");

            match self.run_cycle(&labels).await {
                Ok(CycleOutcome::Completed { swaps }) => {
                    info!(cycle, swaps, "Cycle {cycle} complete");
                }
                Ok(CycleOutcome::Stopped { swaps }) => {
                    info!(cycle, swaps, "Stop observed, leaving cycle {cycle}");
                }
                Ok(CycleOutcome::EmptyWallet) => {
                    error!(
                        cycle,
                        "Wallet holds no {} or {}; cannot trade", labels.a, labels.b
                    );
                    self.backoff(self.pacing.empty_wallet_backoff, "Re-checking balances")
                        .await;
                }
                Err(e) => {
                    self.failed_cycles.fetch_add(1, Ordering::SeqCst);
                    error!(cycle, error = %format!("{e:#}"), "Cycle {cycle} failed");
                    self.backoff(self.pacing.failed_cycle_backoff, "Continuing with next cycle")
                        .await;
                }
            }
        }

        let stats = self.stats();
        info!(
            cycles = stats.cycle_count,
            swaps = stats.swaps_executed,
            failed = stats.failed_cycles,
            "Trading loop stopped"
        );
        Some(stats)
    }

    /// One cycle: A→B with the full A balance, then B→A with the full
    /// (re-read) B balance.
    pub(crate) async fn run_cycle(&self, labels: &PairLabels) -> Result<CycleOutcome> {
        let balance_a = self.read_balance(SwapDirection::AToB).await;
        let balance_b = self.read_balance(SwapDirection::BToA).await;
        debug!(a = balance_a, b = balance_b, "Balances");

        if balance_a == 0 && balance_b == 0 {
            return Ok(CycleOutcome::EmptyWallet);
        }

        let mut swaps = 0;

        if balance_a > 0 {
            self.swap(SwapDirection::AToB, balance_a, labels).await?;
            swaps += 1;
            if !self.is_running() {
                return Ok(CycleOutcome::Stopped { swaps });
            }
            self.random_sleep().await;
        }

        if !self.is_running() {
            return Ok(CycleOutcome::Stopped { swaps });
        }

        // B may have just grown from the A→B leg.
        let balance_b = self.read_balance(SwapDirection::BToA).await;
        if balance_b > 0 {
            self.swap(SwapDirection::BToA, balance_b, labels).await?;
            swaps += 1;
            if !self.is_running() {
                return Ok(CycleOutcome::Stopped { swaps });
            }
            self.random_sleep().await;
        }

        Ok(CycleOutcome::Completed { swaps })
    }

    /// Balance of the source token for `direction`.
    async fn read_balance(&self, direction: SwapDirection) -> u64 {
        let (token, _) = self.pair.route(direction);
        let balance = self.client.token_balance(token).await;
        if let Balance::Unavailable { reason } = &balance {
            warn!(token = %token, reason = %reason, "Balance unavailable, treating as zero");
        }
        balance.amount()
    }

    async fn swap(&self, direction: SwapDirection, amount_in: u64, labels: &PairLabels) -> Result<TxHash> {
        let (from, to) = self.pair.route(direction);
        let (from_name, to_name) = labels.route(direction);
        let intent = SwapIntent::new(from.clone(), to.clone(), amount_in, &self.slippage);

        info!(
            direction = %direction,
            amount_in,
            min_amount_out = intent.min_amount_out,
            "Swapping {from_name} -> {to_name}"
        );

        let hash = self
            .client
            .execute_swap(&intent)
            .await
            .with_context(|| format!("{from_name} -> {to_name} swap of {amount_in} failed"))?;

        self.swaps_executed.fetch_add(1, Ordering::SeqCst);
        info!(hash = %hash, "{from_name} -> {to_name} swap confirmed");
        Ok(hash)
    }

    async fn random_sleep(&self) {
        let pause = self.pacing.next_sleep();
        info!(secs = pause.as_secs(), "Sleeping");
        tokio::time::sleep(pause).await;
    }

    /// Fixed wait between cycles, skipped once a stop has been requested.
    async fn backoff(&self, wait: Duration, what: &str) {
        if !self.is_running() {
            return;
        }
        info!(wait_secs = wait.as_secs(), "{what} after backoff");
        tokio::time::sleep(wait).await;
    }

    async fn resolve_labels(&self) -> PairLabels {
        let (a, b) = futures::join!(
            self.client.token_name(&self.pair.token_a),
            self.client.token_name(&self.pair.token_b),
        );

        let label = |name: TokenName, placeholder: &str| match name {
            TokenName::Symbol(symbol) => symbol,
            TokenName::Fallback(shown) => {
                warn!(token = %shown, placeholder, "Token symbol unresolved, using placeholder");
                placeholder.to_string()
            }
        };

        let labels = PairLabels {
            a: label(a, PLACEHOLDER_NAME_A),
            b: label(b, PLACEHOLDER_NAME_B),
        };
        info!(token = %self.pair.token_a, name = %labels.a, "Token A");
        info!(token = %self.pair.token_b, name = %labels.b, "Token B");
        labels
    }
}

/// Releases the loop claim on exit, including when the task is aborted.
struct LoopGuard<'a>(&'a AtomicBool);

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
