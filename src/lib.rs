//! Zaif Grid Bot
//!
//! Automated grid trading on the Zaif BTC/JPY market: steps resting buy
//! entries down below the market, lets the exchange place a take-profit
//! sell for each fill, and liquidates everything once all position slots
//! are used and the price keeps falling.

pub mod common;
pub mod config;
pub mod error;
pub mod gateway;
pub mod strategy;
pub mod tick;
pub mod types;
pub mod zaif;

pub use config::Config;
pub use error::{GridBotError, Result};
pub use gateway::ExchangeGateway;
pub use types::*;
