//! Authentication utilities for the Zaif private API
//!
//! Requests carry the API key in the `key` header and an HMAC-SHA512 of the
//! form body in the `sign` header. Each body includes a nonce that must be
//! strictly greater than the one before it.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::sync::atomic::{AtomicU64, Ordering};

type HmacSha512 = Hmac<Sha512>;

/// Generate the hex HMAC-SHA512 signature of a request body
///
/// # Example
///
/// ```
/// use zaif_grid_bot::zaif::auth::sign_request;
///
/// let signature = sign_request("nonce=1700000000.001&method=get_info2", "secret");
/// assert_eq!(signature.len(), 128);
/// ```
pub fn sign_request(body: &str, secret: &str) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// API credentials container
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_empty() || self.api_secret.is_empty()
    }

    pub fn sign(&self, body: &str) -> String {
        sign_request(body, &self.api_secret)
    }
}

/// Strictly increasing nonce source
///
/// Nonces are unix seconds with three fractional digits. Calls within the
/// same second step the fraction by 0.001.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    last_millis: AtomicU64,
}

impl NonceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> String {
        let floor = (Utc::now().timestamp().max(0) as u64) * 1000;
        let mut prev = self.last_millis.load(Ordering::SeqCst);
        loop {
            let candidate = floor.max(prev + 1);
            match self.last_millis.compare_exchange(
                prev,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return format!("{}.{:03}", candidate / 1000, candidate % 1000),
                Err(actual) => prev = actual,
            }
        }
    }
}
