//! CLI subcommands

pub mod run;
pub mod status;

use anyhow::{Context, Result};
use zaif_grid_bot::zaif::ZaifClient;
use zaif_grid_bot::Config;

/// Build the Zaif gateway from configuration
pub(crate) fn build_client(config: &Config) -> Result<ZaifClient> {
    let api_key = config.exchange.api_key.clone().unwrap_or_default();
    let api_secret = config.exchange.api_secret.clone().unwrap_or_default();

    ZaifClient::with_config(api_key, api_secret, config.exchange.client_config())
        .context("Failed to create Zaif client")
}
