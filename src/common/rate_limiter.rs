//! Request pacing for exchange clients
//!
//! Enforces a minimum spacing between consecutive requests. Zaif rejects
//! bursts on the private API, and spacing calls also keeps nonces ordered
//! on the wire.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Configuration for the rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Minimum time between two requests
    pub min_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(200),
        }
    }
}

impl RateLimiterConfig {
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }
}

/// Spacing limiter shared by clones of a client
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use zaif_grid_bot::common::{RateLimiter, RateLimiterConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let limiter = RateLimiter::new(
///         RateLimiterConfig::default().with_min_interval(Duration::from_millis(10)),
///     );
///     limiter.acquire().await;
///     // Make API request...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    next_slot: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            next_slot: Arc::new(Mutex::new(None)),
            min_interval: config.min_interval,
        }
    }

    /// Wait until the next request slot opens, then claim it
    pub async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        if let Some(slot) = *next_slot {
            if slot > now {
                sleep_until(slot).await;
            }
        }
        *next_slot = Some(Instant::now() + self.min_interval);
    }
}
