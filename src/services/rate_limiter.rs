// src/services/rate_limiter.rs
// DOCUMENTATION: Per-client request rate limiting
// PURPOSE: Build a keyed governor limiter from the limiter settings

use crate::config::env::LimiterConfig;
use crate::services::{LifecycleState, TaskTracker};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Token bucket per client IP; a no-op when the limiter is disabled
pub struct ClientRateLimiter {
    limiter: Option<DefaultKeyedRateLimiter<IpAddr>>,
}

impl ClientRateLimiter {
    pub fn from_config(config: &LimiterConfig) -> Self {
        if !config.enabled {
            log::info!("Rate limiter disabled");
            return Self { limiter: None };
        }

        let rps = NonZeroU32::new(config.rps).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
        log::info!("Rate limiter enabled (rps={}, burst={})", rps, burst);

        Self {
            limiter: Some(RateLimiter::keyed(Quota::per_second(rps).allow_burst(burst))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Whether a request from `client` may proceed
    pub fn check(&self, client: IpAddr) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&client).is_ok(),
            None => true,
        }
    }

    /// Forget clients whose buckets have fully refilled
    pub fn cleanup(&self) {
        if let Some(limiter) = &self.limiter {
            let before = limiter.len();
            limiter.retain_recent();
            limiter.shrink_to_fit();
            let after = limiter.len();

            if before > after {
                log::debug!(
                    "Rate limiter cleanup: removed {} idle clients ({} remaining)",
                    before - after,
                    after
                );
            }
        }
    }
}

/// Start background cleanup task
/// DOCUMENTATION: Periodically drops idle client buckets. Runs as tracked
/// work and returns once the lifecycle reaches `Draining`.
pub fn start_cleanup_task(
    limiter: Arc<ClientRateLimiter>,
    interval_seconds: u64,
    tracker: &TaskTracker,
    mut states: watch::Receiver<LifecycleState>,
) {
    if !limiter.is_enabled() {
        return;
    }

    tracker.spawn("rate limiter cleanup", async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));

        loop {
            tokio::select! {
                _ = interval.tick() => limiter.cleanup(),
                changed = states.changed() => {
                    let state = *states.borrow_and_update();
                    if changed.is_err()
                        || matches!(state, LifecycleState::Draining | LifecycleState::Terminated)
                    {
                        break;
                    }
                }
            }
        }

        log::debug!("Rate limiter cleanup stopped");
        Ok(())
    });
}
