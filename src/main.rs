//! HYPERION-VOLUME — alternating two-token swap loop on Aptos.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! checks the wallet has something to trade, then runs the swap loop
//! until SIGINT/SIGTERM.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use hyperion_volume::chain::aptos::{AptosClient, RouterCall, TxOptions};
use hyperion_volume::chain::ChainClient;
use hyperion_volume::config::AppConfig;
use hyperion_volume::engine::SwapCycleController;
use hyperion_volume::logging::init_logging;

const BANNER: &str = r#"
 _   ___   ______  _____ ____  ___ ___  _   _
| | | \ \ / /  _ \| ____|  _ \|_ _/ _ \| \ | |
| |_| |\ V /| |_) |  _| | |_) || | | | |  \| |
|  _  | | | |  __/| |___|  _ < | | |_| | |\  |
|_| |_| |_| |_|   |_____|_| \_\___\___/|_| \_|

  Volume loop — alternating swaps on Aptos
  v0.1.0
"#;

/// How long a stopping loop gets to finish its current step.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load().context("Invalid configuration")?;

    init_logging(cfg.log_level);

    println!("{BANNER}");
    info!(
        network = %cfg.network,
        node = %cfg.node_url,
        router = %cfg.router,
        function = %cfg.router_function,
        token_a = %cfg.pair.token_a,
        token_b = %cfg.pair.token_b,
        slippage = %cfg.slippage,
        min_sleep_secs = cfg.pacing.min_sleep_secs(),
        max_sleep_secs = cfg.pacing.max_sleep_secs(),
        "HYPERION-VOLUME starting up"
    );

    // -- Initialise components -------------------------------------------

    let wallet = cfg.wallet().context("Invalid PRIVATE_KEY")?;
    let client = AptosClient::new(
        wallet,
        &cfg.node_url,
        RouterCall::new(cfg.router.clone(), cfg.router_function.clone()),
        TxOptions {
            max_gas_amount: cfg.max_gas_amount,
            ..TxOptions::default()
        },
    )?;
    let client: Arc<dyn ChainClient> = Arc::new(client);
    info!(address = %client.address(), "Wallet loaded");

    let controller = Arc::new(SwapCycleController::new(
        client,
        cfg.pair.clone(),
        cfg.slippage,
        cfg.pacing.clone(),
    ));

    // -- Startup gate ----------------------------------------------------

    if let Err(e) = controller.inspector().ensure_tradable().await {
        error!(error = %e, "Startup check failed");
        return Err(e.into());
    }

    // -- Main loop -------------------------------------------------------

    let mut trading = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.start().await }
    });

    info!("Trading loop running. Press Ctrl+C to stop.");

    tokio::select! {
        finished = &mut trading => {
            // Only a panic ends the loop without a stop request.
            let stats = finished.map_err(|e| anyhow!("Trading loop aborted: {e}"))?;
            warn!(stats = ?stats, "Trading loop exited on its own");
        }
        signal = shutdown_signal() => {
            let signal = signal?;
            info!(signal, "Shutdown signal received");
            controller.stop();

            match tokio::time::timeout(SHUTDOWN_GRACE, &mut trading).await {
                Ok(Ok(stats)) => {
                    if let Some(stats) = stats {
                        info!(%stats, "Final statistics");
                    }
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Trading loop aborted");
                    return Err(anyhow!("Trading loop aborted: {e}"));
                }
                Err(_) => {
                    warn!(
                        grace_secs = SHUTDOWN_GRACE.as_secs(),
                        stats = %controller.stats(),
                        "Trading loop still busy after grace period, exiting anyway"
                    );
                    trading.abort();
                }
            }
        }
    }

    info!("HYPERION-VOLUME shut down cleanly.");
    Ok(())
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl+C")?;
                Ok("SIGINT")
            }
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        Ok("SIGINT")
    }
}
