//! Sliding-window request rate limiting.
//!
//! Each caller key owns the timestamps of its admitted requests inside the
//! trailing window. A request is admitted when fewer than `max_requests`
//! entries remain after pruning; rejected requests are not recorded.

use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::{
    config::{RateLimitConfig, RateLimitKeyMode},
    error::{AppError, AppResult},
    services::clock::Clock,
};

/// Bucket name used when every caller shares one window
const SHARED_BUCKET: &str = "*";

#[derive(Debug, Clone)]
struct RequestStamp {
    descriptor: String,
    at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    key_mode: RateLimitKeyMode,
    windows: Arc<DashMap<String, VecDeque<RequestStamp>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(
        max_requests: usize,
        window: Duration,
        key_mode: RateLimitKeyMode,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        if max_requests == 0 || window <= Duration::zero() {
            return Err(AppError::Misconfigured(
                "Rate limit needs a positive request count and window".to_string(),
            ));
        }
        Ok(Self {
            max_requests,
            window,
            key_mode,
            windows: Arc::new(DashMap::new()),
            clock,
        })
    }

    pub fn from_config(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let window = i64::try_from(config.window_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AppError::Misconfigured("Rate limit window is too large".to_string()))?;
        Self::new(config.max_requests, window, config.key_mode, clock)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn bucket<'a>(&self, caller_key: &'a str) -> &'a str {
        match self.key_mode {
            RateLimitKeyMode::PerKey => caller_key,
            RateLimitKeyMode::Shared => SHARED_BUCKET,
        }
    }

    /// Admit or reject one request from `caller_key`
    pub fn check(&self, caller_key: &str, descriptor: &str) -> AppResult<()> {
        let now = self.clock.now();
        let bucket = self.bucket(caller_key);

        // The entry guard locks this key for prune, check and append
        let mut entries = self.windows.entry(bucket.to_string()).or_default();

        while entries
            .front()
            .is_some_and(|oldest| now - oldest.at >= self.window)
        {
            entries.pop_front();
        }

        if entries.len() >= self.max_requests {
            let oldest = entries.front();
            // Whole seconds, rounded up, until the oldest stamp leaves the window
            let retry_after = oldest
                .map(|oldest| {
                    let remaining = (oldest.at + self.window - now).num_milliseconds();
                    (remaining + 999) / 1000
                })
                .unwrap_or(0)
                .max(1);

            tracing::warn!(
                bucket = %bucket,
                descriptor = %descriptor,
                oldest = oldest.map(|o| o.descriptor.as_str()).unwrap_or_default(),
                retry_after_secs = retry_after,
                "Rate limit exceeded"
            );

            return Err(AppError::TooManyRequests {
                message: format!(
                    "Too many requests. Limit: {} requests per {} seconds.",
                    self.max_requests,
                    self.window.num_seconds()
                ),
                retry_after: retry_after as u64,
            });
        }

        entries.push_back(RequestStamp {
            descriptor: descriptor.to_string(),
            at: now,
        });
        Ok(())
    }

    /// Number of requests currently counted against `caller_key`
    #[cfg(test)]
    pub(crate) fn in_window(&self, caller_key: &str) -> usize {
        let now = self.clock.now();
        self.windows
            .get(self.bucket(caller_key))
            .map(|entries| entries.iter().filter(|e| now - e.at < self.window).count())
            .unwrap_or(0)
    }

    /// Recent request descriptors for `caller_key`, oldest first
    #[cfg(test)]
    pub(crate) fn recent_requests(&self, caller_key: &str) -> Vec<String> {
        self.windows
            .get(self.bucket(caller_key))
            .map(|entries| entries.iter().map(|e| e.descriptor.clone()).collect())
            .unwrap_or_default()
    }

    /// Drop keys whose every entry has left the window
    pub fn purge_idle(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, entries| {
            entries
                .back()
                .is_some_and(|newest| now - newest.at < self.window)
        });
        let purged = before.saturating_sub(self.windows.len());
        if purged > 0 {
            tracing::debug!(purged, "Purged idle rate-limit windows");
        }
        purged
    }
}
