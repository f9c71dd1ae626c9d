// ============================================================================
// Rate Limiting Configuration
// ============================================================================

use super::env_parse;

const DEFAULT_REQUESTS_PER_MINUTE: u32 = 100;
const DEFAULT_BURST_SIZE: u32 = 10;

/// Global token bucket settings
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Sustained refill rate
    pub requests_per_minute: u32,
    /// Bucket capacity
    pub burst_size: u32,
}

impl RateLimitConfig {
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            requests_per_minute: env_parse("RATE_LIMIT_RPM", DEFAULT_REQUESTS_PER_MINUTE),
            burst_size: env_parse("RATE_LIMIT_BURST", DEFAULT_BURST_SIZE),
        };
        if config.requests_per_minute == 0 || config.burst_size == 0 {
            anyhow::bail!(
                "RATE_LIMIT_RPM and RATE_LIMIT_BURST must be greater than zero (got {} and {})",
                config.requests_per_minute,
                config.burst_size
            );
        }
        Ok(config)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            burst_size: DEFAULT_BURST_SIZE,
        }
    }
}
