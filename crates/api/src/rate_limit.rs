//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-IP rate limiting with tower_governor. Mobile clients stream frames,
//! so the burst is sized for a short stream of polling requests.

use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tracing::debug;

use crate::settings::ServerSettings;

/// Governor config keyed by peer IP, reporting X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests allowed immediately
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 10,
        }
    }
}

impl From<&ServerSettings> for RateLimitConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            per_second: settings.rate_limit_per_second,
            burst_size: settings.rate_limit_burst,
        }
    }
}

/// Build the governor config.
///
/// Returns None for a zero period or burst. Requires the service to be
/// served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
}

/// Periodically drop idle per-IP limiter state
pub fn spawn_limiter_cleanup(config: Arc<DefaultGovernorConfig>, interval: Duration) {
    let limiter = config.limiter().clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            debug!("Rate limiter tracking {} clients", limiter.len());
            limiter.retain_recent();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = ServerSettings {
            rate_limit_per_second: 2,
            rate_limit_burst: 5,
            ..Default::default()
        };
        let config = RateLimitConfig::from(&settings);
        assert_eq!(config.per_second, 2);
        assert_eq!(config.burst_size, 5);
        assert_eq!(RateLimitConfig::from(&ServerSettings::default()), RateLimitConfig::default());
    }

    #[test]
    fn test_create_governor_config() {
        assert!(create_governor_config(&RateLimitConfig::default()).is_some());
    }

    #[test]
    fn test_zero_burst_rejected() {
        let config = RateLimitConfig {
            per_second: 1,
            burst_size: 0,
        };
        assert!(create_governor_config(&config).is_none());
    }
}
