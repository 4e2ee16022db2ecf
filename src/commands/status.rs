//! One-shot status command
//!
//! Fetches a snapshot and logs the account, resting orders and the decision
//! the strategy would take, without touching any order.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use zaif_grid_bot::strategy::StrategyController;
use zaif_grid_bot::Config;

use super::build_client;

pub fn run(config_path: Option<PathBuf>) -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = Config::load(config_path.as_deref())?;
    config.runner.debug = true;
    config.validate().context("Invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async {
        let client = build_client(&config)?;
        let mut controller = StrategyController::new(
            client,
            &config.strategy,
            config.exchange.trade_history_count,
        )
        .observe_only(true);

        controller
            .run_cycle()
            .await
            .context("Failed to fetch market snapshot")?;

        if let Some(snapshot) = controller.last_snapshot() {
            for order in &snapshot.active_orders {
                info!(
                    "{} #{} price={} amount={}",
                    order.side, order.id, order.price, order.amount
                );
            }
            if let Some(trade) = snapshot.last_trade() {
                info!(
                    "Last trade: price={} ours_buy={}",
                    trade.price, trade.initiated_by_us
                );
            }
            info!(
                "Best bid={:?} best ask={:?} funds_jpy={} funds_btc={}",
                snapshot.best_bid(),
                snapshot.best_ask(),
                snapshot.account.funds_jpy,
                snapshot.account.funds_btc
            );
        }
        Ok(())
    })
}
