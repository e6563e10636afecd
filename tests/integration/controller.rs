//! Swap cycle controller driven end to end against the scripted chain.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use hyperion_volume::engine::SwapCycleController;
use hyperion_volume::strategy::pacing::{EMPTY_WALLET_BACKOFF, FAILED_CYCLE_BACKOFF};
use hyperion_volume::strategy::{Pacing, Slippage};

use crate::mock_chain::{pair, token_a, token_b, ScriptedChain};

fn controller(chain: &Arc<ScriptedChain>) -> Arc<SwapCycleController> {
    Arc::new(SwapCycleController::new(
        chain.clone(),
        pair(),
        Slippage::default(),
        Pacing::default(),
    ))
}

/// Poll `done` on the (usually paused) tokio clock.
async fn wait_until(mut done: impl FnMut() -> bool) {
    while !done() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn test_stop_mid_swap_finishes_swap_then_exits() {
    let chain = Arc::new(ScriptedChain::new(1000, 0).with_names("USDT", "USDC"));
    chain.hold_swaps();
    let ctl = controller(&chain);

    let handle = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.start().await }
    });

    chain.swap_started.notified().await;
    assert!(ctl.is_running());

    // A second start while running is a no-op.
    assert!(ctl.start().await.is_none());

    ctl.stop();
    assert!(!ctl.is_running());
    chain.release_swap.notify_one();

    let stats = handle.await.unwrap().expect("first start runs the loop");
    assert!(!stats.is_running);
    assert_eq!(stats.cycle_count, 1);
    assert_eq!(stats.swaps_executed, 1);
    assert_eq!(stats.failed_cycles, 0);

    // The in-flight swap landed; nothing ran after it.
    assert_eq!(chain.attempt_count(), 1);
    assert_eq!(chain.balance(&token_a()), 0);
    assert_eq!(chain.balance(&token_b()), 997);
    // Two reads for the startup report, two for the cycle, no B re-read.
    assert_eq!(chain.balance_reads(), 4);
}

#[tokio::test]
async fn test_restart_while_stopping_never_overlaps_swaps() {
    let chain = Arc::new(ScriptedChain::new(1000, 0));
    chain.hold_swaps();
    let ctl = controller(&chain);

    let first = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.start().await }
    });
    chain.swap_started.notified().await;

    // Stop, then try to start again while the first swap is still in flight.
    ctl.stop();
    assert!(ctl.start().await.is_none());
    assert!(!ctl.is_running());
    assert_eq!(chain.attempt_count(), 1);

    chain.release_swap.notify_one();
    let stats = first.await.unwrap().expect("first loop ran");
    assert!(!stats.is_running);
    assert_eq!(stats.swaps_executed, 1);
    assert_eq!(chain.attempt_count(), 1);

    // Once the first loop has exited, a new one may start.
    let second = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.start().await }
    });
    chain.swap_started.notified().await;
    assert!(ctl.is_running());
    assert_eq!(chain.attempt_count(), 2);
    ctl.stop();
    chain.release_swap.notify_one();

    let stats = second.await.unwrap().expect("second loop ran");
    assert!(!stats.is_running);
    assert_eq!(stats.swaps_executed, 2);
    assert_eq!(chain.attempt_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cycles_alternate_direction_with_full_balances() {
    let chain = Arc::new(ScriptedChain::new(1000, 0));
    let ctl = controller(&chain);

    let handle = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.start().await }
    });

    wait_until(|| chain.attempt_count() >= 4).await;
    ctl.stop();
    let stats = handle.await.unwrap().unwrap();

    let intents: Vec<_> = chain.attempts().into_iter().map(|(intent, _)| intent).collect();
    let expected = [
        (token_a(), token_b(), 1000, 997),
        (token_b(), token_a(), 997, 994),
        (token_a(), token_b(), 994, 991),
        (token_b(), token_a(), 991, 988),
    ];
    for (intent, (from, to, amount_in, min_out)) in intents.iter().zip(expected) {
        assert_eq!(intent.from, from);
        assert_eq!(intent.to, to);
        assert_eq!(intent.amount_in, amount_in);
        assert_eq!(intent.min_amount_out, min_out);
    }

    assert!(stats.cycle_count >= 2);
    assert_eq!(stats.failed_cycles, 0);
    assert_eq!(stats.swaps_executed as usize, chain.attempt_count());
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycles_back_off_and_continue() {
    let chain = Arc::new(ScriptedChain::new(1000, 0));
    chain.fail_swaps();
    let ctl = controller(&chain);

    let handle = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.start().await }
    });

    wait_until(|| chain.attempt_count() >= 3).await;
    ctl.stop();
    let stats = handle.await.unwrap().unwrap();

    assert!(stats.failed_cycles >= 3);
    assert_eq!(stats.failed_cycles, stats.cycle_count);
    assert_eq!(stats.swaps_executed, 0);
    assert_eq!(chain.balance(&token_a()), 1000);

    let times: Vec<Instant> = chain.attempts().into_iter().map(|(_, at)| at).collect();
    for window in times.windows(2) {
        assert!(window[1] - window[0] >= FAILED_CYCLE_BACKOFF);
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_wallet_waits_and_never_swaps() {
    let chain = Arc::new(ScriptedChain::new(0, 0));
    let ctl = controller(&chain);

    assert!(ctl.inspector().ensure_tradable().await.is_err());

    let started = Instant::now();
    let handle = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.start().await }
    });

    wait_until(|| ctl.stats().cycle_count >= 3).await;
    assert!(started.elapsed() >= EMPTY_WALLET_BACKOFF * 2);

    ctl.stop();
    let stats = handle.await.unwrap().unwrap();
    assert_eq!(stats.failed_cycles, 0);
    assert_eq!(stats.swaps_executed, 0);
    assert_eq!(chain.attempt_count(), 0);
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let chain = Arc::new(ScriptedChain::new(5, 5));
    let ctl = controller(&chain);

    ctl.stop();
    assert!(!ctl.is_running());
    assert_eq!(ctl.stats().cycle_count, 0);
    assert_eq!(chain.attempt_count(), 0);
}
