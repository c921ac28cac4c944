//! Per-peer rate limiting for the public API.
//!
//! Uses actix-governor with the built-in PeerIpKeyExtractor. Limits are
//! refilled per second with a configurable burst.

use actix_governor::{Governor, GovernorConfigBuilder, PeerIpKeyExtractor};

/// Configuration for the API rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained requests per second per IP.
    pub per_second: u32,
    /// Requests allowed in a short burst.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 10,
            burst: 50,
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            per_second: env_u32("RATE_LIMIT_PER_SECOND").unwrap_or(defaults.per_second),
            burst: env_u32("RATE_LIMIT_BURST").unwrap_or(defaults.burst),
        }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
}

/// Type alias for the Governor middleware with default settings.
pub type RateLimiter = Governor<PeerIpKeyExtractor, governor::middleware::NoOpMiddleware>;

/// Create the limiter applied to every endpoint.
pub fn general_limiter(config: &RateLimitConfig) -> RateLimiter {
    // Replenish one cell every 1/per_second seconds.
    let period_ms = 1000 / u64::from(config.per_second.max(1));

    let governor_config = GovernorConfigBuilder::default()
        .milliseconds_per_request(period_ms.max(1))
        .burst_size(config.burst.max(1))
        .finish()
        .expect("rate limiter config with non-zero period and burst");

    Governor::new(&governor_config)
}
