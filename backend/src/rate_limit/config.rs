//! Rate limiter configuration loaded via OrthoConfig.

use std::num::NonZeroU32;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;

use super::RateLimitPolicy;

/// Settings read from `RATE_LIMITER_*` environment variables.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "RATE_LIMITER")]
pub struct RateLimitSettings {
    /// Apply per-client limits to inbound requests.
    #[ortho_config(default = true)]
    pub enabled: bool,
    /// Sustained requests per second per client.
    pub rps: Option<u32>,
    /// Bucket capacity per client.
    pub burst: Option<u32>,
    /// Identify clients by `Forwarded`/`X-Forwarded-For` rather than the
    /// socket peer. Enable only behind a proxy that sets those headers.
    #[ortho_config(default = false)]
    pub trust_proxy: bool,
}

fn non_zero_or(value: Option<u32>, fallback: NonZeroU32, name: &str) -> NonZeroU32 {
    match value {
        None => fallback,
        Some(raw) => NonZeroU32::new(raw).unwrap_or_else(|| {
            warn!(setting = name, fallback = fallback.get(), "zero is not a valid rate limit");
            fallback
        }),
    }
}

impl RateLimitSettings {
    /// Limiter policy with defaults for unset values.
    #[must_use]
    pub fn policy(&self) -> RateLimitPolicy {
        let defaults = RateLimitPolicy::default();
        RateLimitPolicy {
            requests_per_second: non_zero_or(self.rps, defaults.requests_per_second, "rps"),
            burst: non_zero_or(self.burst, defaults.burst, "burst"),
            ..defaults
        }
    }
}
