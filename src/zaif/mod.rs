//! Zaif exchange integration
//!
//! Implements the [`ExchangeGateway`](crate::gateway::ExchangeGateway)
//! contract for the BTC/JPY market.

pub mod auth;
pub mod client;
pub mod types;

pub use auth::{sign_request, Credentials, NonceGenerator};
pub use client::{ClientConfig, ZaifClient, DEPTH_API_URL, PRIVATE_API_URL};
