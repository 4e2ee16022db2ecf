//! Trading loop command
//!
//! Runs one strategy cycle per interval until Ctrl+C. Cycle failures are
//! logged and the loop carries on; nothing here retries within a cycle.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use zaif_grid_bot::strategy::StrategyController;
use zaif_grid_bot::Config;

use super::build_client;

pub fn run(config_path: Option<PathBuf>, debug: bool, interval_secs: Option<u64>) -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = Config::load(config_path.as_deref())?;
    if debug {
        config.runner.debug = true;
    }
    if let Some(secs) = interval_secs {
        config.runner.interval_secs = secs;
    }
    config.validate().context("Invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config))
}

async fn run_async(config: Config) -> Result<()> {
    let observe_only = config.runner.debug;
    let mode_str = if observe_only { "OBSERVE" } else { "LIVE" };

    info!("=== ZAIF GRID BOT - {} MODE ===", mode_str);
    info!("Market: {}", config.exchange.currency_pair);
    info!(
        "Grid step: {} | Take profit: {} | Max positions: {}",
        config.strategy.buy_range,
        config.strategy.take_profit_range,
        config.strategy.max_position_count
    );
    info!("Cycle interval: {} seconds", config.runner.interval_secs);

    if !observe_only {
        warn!("LIVE TRADING MODE - REAL MONEY AT RISK!");
        warn!("Press Ctrl+C within 5 seconds to abort...");
        for i in (1..=5).rev() {
            info!("Starting in {} seconds...", i);
            sleep(Duration::from_secs(1)).await;
        }
    }

    let client = build_client(&config)?;
    let mut controller = StrategyController::new(
        client,
        &config.strategy,
        config.exchange.trade_history_count,
    )
    .observe_only(observe_only);

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating shutdown...");
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => {
                error!("Error setting up signal handler: {}", e);
            }
        }
    });

    let mut cycle_interval = interval(Duration::from_secs(config.runner.interval_secs));
    cycle_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Starting trading loop...");

    loop {
        tokio::select! {
            _ = cycle_interval.tick() => {
                match controller.run_cycle().await {
                    Ok(outcome) => debug!("Cycle outcome: {:?}", outcome),
                    Err(e) if e.is_exchange_failure() => {
                        error!("Trading cycle error: {}", e);
                    }
                    Err(e) => warn!("Cycle skipped: {}", e),
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!(
        "Trading loop ended after {} cycles in {} mode",
        controller.cycle_count(),
        controller.mode()
    );
    Ok(())
}
