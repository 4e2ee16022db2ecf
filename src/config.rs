//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for API credentials. Every section and field is
//! optional; missing values fall back to the defaults below.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::GridBotError;
use crate::tick::TickRules;
use crate::zaif::{ClientConfig, DEPTH_API_URL, PRIVATE_API_URL};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub strategy: StrategyConfig,
    pub runner: RunnerConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// Load from `path` if given, otherwise start from defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Load API credentials from environment if set
    pub fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("ZAIF_API_KEY") {
            self.exchange.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("ZAIF_API_SECRET") {
            self.exchange.api_secret = Some(api_secret);
        }
    }

    /// Reject settings the strategy cannot run with
    ///
    /// Credentials are required in observe-only mode too: every cycle reads
    /// the account through the signed private API.
    pub fn validate(&self) -> crate::error::Result<()> {
        let s = &self.strategy;
        if s.buy_range <= Decimal::ZERO || s.buy_range >= Decimal::ONE {
            return Err(GridBotError::Config(format!(
                "buy_range must be in (0, 1), got {}",
                s.buy_range
            )));
        }
        if s.take_profit_range <= Decimal::ZERO {
            return Err(GridBotError::Config(format!(
                "take_profit_range must be positive, got {}",
                s.take_profit_range
            )));
        }
        if s.max_position_count == 0 {
            return Err(GridBotError::Config(
                "max_position_count must be at least 1".to_string(),
            ));
        }
        if s.market_entry_take_profit <= Decimal::ZERO {
            return Err(GridBotError::Config(
                "market_entry_take_profit must be positive".to_string(),
            ));
        }
        if self.runner.interval_secs == 0 {
            return Err(GridBotError::Config(
                "interval_secs must be at least 1".to_string(),
            ));
        }
        if self.exchange.price_tick <= Decimal::ZERO {
            return Err(GridBotError::Config(format!(
                "price_tick must be positive, got {}",
                self.exchange.price_tick
            )));
        }
        if self.exchange.trade_history_count == 0 {
            return Err(GridBotError::Config(
                "trade_history_count must be at least 1".to_string(),
            ));
        }
        if !self.exchange.has_credentials() {
            return Err(GridBotError::Config(
                "API credentials missing; set ZAIF_API_KEY and ZAIF_API_SECRET".to_string(),
            ));
        }
        Ok(())
    }
}

/// Exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    pub private_endpoint: String,
    pub depth_endpoint: String,
    pub currency_pair: String,
    pub timeout_secs: u64,
    pub min_request_interval_ms: u64,
    /// Trades fetched per cycle; only the latest is used
    pub trade_history_count: usize,
    pub entry_comment: String,
    pub market_sell_comment: String,
    pub market_sell_price: Decimal,
    pub price_tick: Decimal,
    pub amount_scale: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            api_key: None,
            api_secret: None,
            private_endpoint: PRIVATE_API_URL.to_string(),
            depth_endpoint: DEPTH_API_URL.to_string(),
            currency_pair: "btc_jpy".to_string(),
            timeout_secs: 30,
            min_request_interval_ms: 200,
            trade_history_count: 3,
            entry_comment: "fromBot".to_string(),
            market_sell_comment: "sell_with_market_price".to_string(),
            market_sell_price: dec!(5),
            price_tick: dec!(5),
            amount_scale: 4,
        }
    }
}

impl ExchangeConfig {
    pub fn has_credentials(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        filled(&self.api_key) && filled(&self.api_secret)
    }

    pub fn tick_rules(&self) -> TickRules {
        TickRules::new(self.price_tick, self.amount_scale)
    }

    /// HTTP client settings for [`crate::zaif::ZaifClient`]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_endpoints(self.private_endpoint.clone(), self.depth_endpoint.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_min_request_interval(Duration::from_millis(self.min_request_interval_ms))
            .with_tick_rules(self.tick_rules())
            .with_comments(self.entry_comment.clone(), self.market_sell_comment.clone());
        config.currency_pair = self.currency_pair.clone();
        config.market_sell_price = self.market_sell_price;
        config
    }
}

/// Grid strategy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Fractional grid step between entries
    pub buy_range: Decimal,
    /// Fractional take-profit markup over the entry price
    pub take_profit_range: Decimal,
    /// Ceiling on open positions (resting exit orders)
    pub max_position_count: usize,
    /// Take-profit limit used for market-style entries with no price reference
    pub market_entry_take_profit: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            buy_range: dec!(0.0005),
            take_profit_range: dec!(0.01),
            max_position_count: 500,
            market_entry_take_profit: dec!(50000000),
        }
    }
}

/// Cycle loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Seconds between cycles
    pub interval_secs: u64,
    /// Observe and log only, never cancel or submit
    pub debug: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            interval_secs: 2,
            debug: false,
        }
    }
}
