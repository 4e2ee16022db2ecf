//! Zaif API Client
//!
//! HTTP client for the Zaif BTC/JPY market implementing [`ExchangeGateway`]:
//! - Signed private API calls (`get_info2`, `active_orders`, `trade_history`,
//!   `trade`, `cancel_order`)
//! - Public order book depth
//! - Request pacing and a bounded request timeout
//!
//! Calls are never retried here. A failed call fails the current cycle and
//! the controller re-observes state on the next one.
//!
//! # Example
//!
//! ```no_run
//! use zaif_grid_bot::gateway::ExchangeGateway;
//! use zaif_grid_bot::zaif::{ClientConfig, ZaifClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ZaifClient::with_config("api_key", "api_secret", ClientConfig::default())?;
//!
//!     let book = client.fetch_order_book().await?;
//!     println!("best bid: {:?}", book.best_bid());
//!
//!     let account = client.fetch_account().await?;
//!     println!("JPY available: {}", account.funds_jpy);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use urlencoding::encode;

use super::auth::{Credentials, NonceGenerator};
use super::types::*;
use crate::common::{RateLimiter, RateLimiterConfig};
use crate::error::{GridBotError, Result};
use crate::gateway::ExchangeGateway;
use crate::tick::TickRules;
use crate::types::{
    AccountSnapshot, ActiveOrder, OrderBookSnapshot, OrderId, OrderSide, TradeRecord,
};

/// Private (trading) API endpoint
pub const PRIVATE_API_URL: &str = "https://api.zaif.jp/tapi";

/// Public depth endpoint for BTC/JPY
pub const DEPTH_API_URL: &str = "https://api.zaif.jp/api/1/depth/btc_jpy";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub private_endpoint: String,
    pub depth_endpoint: String,
    pub currency_pair: String,
    /// Request timeout duration
    pub timeout: Duration,
    pub rate_limiter: RateLimiterConfig,
    pub tick_rules: TickRules,
    /// Comment attached to grid entries
    pub entry_comment: String,
    /// Comment attached to liquidation sells
    pub market_sell_comment: String,
    /// Limit price low enough that an ask fills against any bid
    pub market_sell_price: Decimal,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            private_endpoint: PRIVATE_API_URL.to_string(),
            depth_endpoint: DEPTH_API_URL.to_string(),
            currency_pair: "btc_jpy".to_string(),
            timeout: Duration::from_secs(30),
            rate_limiter: RateLimiterConfig::default(),
            tick_rules: TickRules::default(),
            entry_comment: "fromBot".to_string(),
            market_sell_comment: "sell_with_market_price".to_string(),
            market_sell_price: dec!(5),
        }
    }
}

impl ClientConfig {
    /// Point the client at other endpoints (test servers, proxies)
    pub fn with_endpoints(
        mut self,
        private_endpoint: impl Into<String>,
        depth_endpoint: impl Into<String>,
    ) -> Self {
        self.private_endpoint = private_endpoint.into();
        self.depth_endpoint = depth_endpoint.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set minimum spacing between requests
    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.rate_limiter = self.rate_limiter.with_min_interval(interval);
        self
    }

    pub fn with_tick_rules(mut self, rules: TickRules) -> Self {
        self.tick_rules = rules;
        self
    }

    pub fn with_comments(
        mut self,
        entry_comment: impl Into<String>,
        market_sell_comment: impl Into<String>,
    ) -> Self {
        self.entry_comment = entry_comment.into();
        self.market_sell_comment = market_sell_comment.into();
        self
    }
}

/// Zaif Exchange API Client
#[derive(Clone)]
pub struct ZaifClient {
    credentials: Credentials,
    http_client: Client,
    rate_limiter: RateLimiter,
    nonces: Arc<NonceGenerator>,
    config: ClientConfig,
}

impl ZaifClient {
    /// Create a client with default endpoints and settings
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, api_secret, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// Every gateway call except the depth fetch is signed, so empty
    /// credentials are rejected here.
    pub fn with_config(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let credentials = Credentials::new(api_key, api_secret);
        if credentials.is_empty() {
            return Err(GridBotError::Config(
                "API key and secret must not be empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| GridBotError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            http_client,
            rate_limiter: RateLimiter::new(config.rate_limiter.clone()),
            nonces: Arc::new(NonceGenerator::new()),
            config,
        })
    }

    /// Signed POST to the private API, returning the unwrapped `return` value
    async fn private_call(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<serde_json::Value> {
        self.rate_limiter.acquire().await;

        let body = encode_form(&self.nonces.next(), method, params);
        let signature = self.credentials.sign(&body);
        debug!("Zaif private call: {}", method);

        let response = self
            .http_client
            .post(&self.config.private_endpoint)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("key", self.credentials.api_key())
            .header("sign", signature)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GridBotError::Transport(format!(
                "{} returned HTTP {}: {}",
                method, status, text
            )));
        }

        let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(&text)?;
        envelope.into_result()
    }

    async fn private_call_as<R: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<R> {
        let value = self.private_call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl ExchangeGateway for ZaifClient {
    async fn fetch_account(&self) -> Result<AccountSnapshot> {
        let info: AccountInfo = self.private_call_as("get_info2", &[]).await?;
        Ok(info.into())
    }

    async fn fetch_active_orders(&self) -> Result<Vec<ActiveOrder>> {
        let value = self
            .private_call(
                "active_orders",
                &[("currency_pair", self.config.currency_pair.clone())],
            )
            .await?;
        active_orders_from_value(value)
    }

    async fn fetch_trade_history(&self, limit: usize) -> Result<Vec<TradeRecord>> {
        let value = self
            .private_call(
                "trade_history",
                &[
                    ("count", limit.to_string()),
                    ("order", "DESC".to_string()),
                    ("currency_pair", self.config.currency_pair.clone()),
                ],
            )
            .await?;
        let mut trades = trades_from_value(value)?;
        trades.truncate(limit);
        Ok(trades)
    }

    async fn fetch_order_book(&self) -> Result<OrderBookSnapshot> {
        self.rate_limiter.acquire().await;

        let response = self
            .http_client
            .get(&self.config.depth_endpoint)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GridBotError::Transport(format!(
                "depth returned HTTP {}: {}",
                status, text
            )));
        }

        let depth: DepthResponse = serde_json::from_str(&text)?;
        depth.into_snapshot()
    }

    async fn submit_entry(
        &self,
        price: Decimal,
        take_profit: Decimal,
        amount: Decimal,
    ) -> Result<OrderId> {
        let rules = &self.config.tick_rules;
        let params = [
            ("currency_pair", self.config.currency_pair.clone()),
            ("action", OrderSide::Entry.as_action().to_string()),
            ("price", rules.format_price(price)),
            ("limit", rules.format_price(take_profit)),
            ("amount", rules.format_amount(amount)),
            ("comment", self.config.entry_comment.clone()),
        ];

        let result: TradeResult = self.private_call_as("trade", &params).await?;
        info!(
            "Entry placed: id={} price={} limit={} amount={} received={} remains={}",
            result.order_id, params[2].1, params[3].1, params[4].1, result.received, result.remains
        );
        Ok(OrderId(result.order_id))
    }

    async fn cancel_order(&self, id: OrderId) -> Result<()> {
        let result: CancelResult = self
            .private_call_as("cancel_order", &[("order_id", id.to_string())])
            .await?;
        info!("Order cancelled: id={}", result.order_id);
        Ok(())
    }

    async fn sell_market(&self, amount: Decimal) -> Result<()> {
        let rules = &self.config.tick_rules;
        let amount = rules.format_amount(amount);
        let params = [
            ("currency_pair", self.config.currency_pair.clone()),
            ("action", OrderSide::Exit.as_action().to_string()),
            ("price", rules.format_price(self.config.market_sell_price)),
            ("amount", amount.clone()),
            ("comment", self.config.market_sell_comment.clone()),
        ];

        let result: TradeResult = self.private_call_as("trade", &params).await?;
        info!(
            "Market sell placed: amount={} received={} remains={}",
            amount, result.received, result.remains
        );
        Ok(())
    }

    fn tick_rules(&self) -> TickRules {
        self.config.tick_rules
    }
}

/// Build the form body that gets signed and sent
fn encode_form(nonce: &str, method: &str, params: &[(&str, String)]) -> String {
    let mut body = format!("nonce={}&method={}", nonce, encode(method));
    for (key, value) in params {
        body.push_str(&format!("&{}={}", encode(key), encode(value)));
    }
    body
}
