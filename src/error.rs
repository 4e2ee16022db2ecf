//! Error types for the gateway and the decision engine

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::OrderId;

/// Errors surfaced by one trading cycle
///
/// None of these are fatal to the controller: every variant degrades to
/// "skip this cycle" and the next cycle re-observes exchange state.
#[derive(Debug, Error)]
pub enum GridBotError {
    /// Network failure, timeout or non-2xx HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    /// The exchange answered with `success != 1`
    #[error("Exchange error: {0}")]
    Exchange(String),

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid order book: {0}")]
    InvalidOrderBook(String),

    /// The ask side ran out before the budget did
    #[error("Insufficient liquidity: book exhausted with {remaining} JPY of {budget} JPY unspent")]
    InsufficientLiquidity { budget: Decimal, remaining: Decimal },

    #[error("Insufficient funds: {available} JPY available")]
    InsufficientFunds { available: Decimal },

    /// Sequential cancellation stopped at `order_id`
    #[error("Cancellation of order {order_id} failed after {} cancelled, {} left: {reason}", cancelled.len(), remaining.len())]
    CancellationFailed {
        order_id: OrderId,
        reason: String,
        cancelled: Vec<OrderId>,
        remaining: Vec<OrderId>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GridBotError {
    /// True for failures that come from talking to the exchange
    pub fn is_exchange_failure(&self) -> bool {
        matches!(
            self,
            GridBotError::Transport(_)
                | GridBotError::Exchange(_)
                | GridBotError::Parse(_)
                | GridBotError::InvalidOrderBook(_)
        )
    }
}

impl From<reqwest::Error> for GridBotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GridBotError::Transport(format!("request timed out: {}", err))
        } else if err.is_decode() {
            GridBotError::Parse(err.to_string())
        } else {
            GridBotError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GridBotError {
    fn from(err: serde_json::Error) -> Self {
        GridBotError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GridBotError>;
