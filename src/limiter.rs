//! Sliding-window rate limiter
//!
//! Tracks request timestamps per identifier and admits a request iff fewer
//! than the ceiling landed within the window. Message types with a configured
//! ceiling get their own `(identifier, type)` bucket, checked instead of the
//! identifier's global bucket.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Seconds until a retry can succeed; 0 when allowed
    pub retry_after_seconds: u64,
}

/// Point-in-time rate-limit statistics for one bucket
#[derive(Debug, Clone, serde::Serialize)]
pub struct BucketStats {
    pub limit: u32,
    pub window_seconds: u64,
    pub current_count: usize,
    pub remaining: u32,
    pub reset_at: Option<DateTime<Utc>>,
    pub retry_after_seconds: u64,
}

#[derive(Default)]
struct Buckets {
    requests: HashMap<String, Vec<Instant>>,
    type_requests: HashMap<(String, String), Vec<Instant>>,
}

/// Sliding-window rate limiter with optional per-type ceilings
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    per_type_limits: HashMap<String, u32>,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    pub fn new(limit: u32, window_seconds: u64, per_type_limits: HashMap<String, u32>) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_seconds),
            per_type_limits,
            buckets: Mutex::new(Buckets::default()),
        }
    }

    /// Check and record one request for `identifier`
    ///
    /// When `message_type` has a configured ceiling, that ceiling is used
    /// instead of the global one, with its own bucket.
    pub fn check(&self, identifier: &str, message_type: Option<&str>) -> Decision {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap();

        let (timestamps, limit) = match message_type {
            Some(t) if self.per_type_limits.contains_key(t) => {
                let limit = self.per_type_limits[t];
                let entry = buckets
                    .type_requests
                    .entry((identifier.to_string(), t.to_string()))
                    .or_default();
                (entry, limit)
            }
            _ => {
                let entry = buckets.requests.entry(identifier.to_string()).or_default();
                (entry, self.limit)
            }
        };

        timestamps.retain(|ts| now.duration_since(*ts) < self.window);

        if timestamps.len() >= limit as usize {
            // A ceiling of 0 denies with an empty bucket
            let retry_after_seconds = timestamps
                .iter()
                .min()
                .map(|oldest| {
                    self.window
                        .saturating_sub(now.duration_since(*oldest))
                        .as_secs()
                        + 1
                })
                .unwrap_or_else(|| self.window.as_secs());
            return Decision {
                allowed: false,
                retry_after_seconds,
            };
        }

        timestamps.push(now);
        Decision {
            allowed: true,
            retry_after_seconds: 0,
        }
    }

    /// Current statistics for an identifier's bucket without recording a request
    pub fn get_stats(&self, identifier: &str, message_type: Option<&str>) -> BucketStats {
        let now = Instant::now();
        let buckets = self.buckets.lock().unwrap();

        let (timestamps, limit) = match message_type {
            Some(t) if self.per_type_limits.contains_key(t) => (
                buckets
                    .type_requests
                    .get(&(identifier.to_string(), t.to_string())),
                self.per_type_limits[t],
            ),
            _ => (buckets.requests.get(identifier), self.limit),
        };

        let live: Vec<Instant> = timestamps
            .map(|ts| {
                ts.iter()
                    .copied()
                    .filter(|t| now.duration_since(*t) < self.window)
                    .collect()
            })
            .unwrap_or_default();

        let reset_at = live.iter().min().map(|oldest| {
            let until_reset = self.window.saturating_sub(now.duration_since(*oldest));
            Utc::now() + ChronoDuration::from_std(until_reset).unwrap_or_else(|_| ChronoDuration::zero())
        });

        let retry_after_seconds = if live.len() >= limit as usize {
            live.iter()
                .min()
                .map(|oldest| {
                    self.window
                        .saturating_sub(now.duration_since(*oldest))
                        .as_secs()
                        + 1
                })
                .unwrap_or(0)
        } else {
            0
        };

        BucketStats {
            limit,
            window_seconds: self.window.as_secs(),
            current_count: live.len(),
            remaining: limit.saturating_sub(live.len() as u32),
            reset_at,
            retry_after_seconds,
        }
    }

    /// Drop tracked requests: one `(identifier, type)` bucket, every bucket
    /// for an identifier, or everything
    pub fn clear(&self, identifier: Option<&str>, message_type: Option<&str>) {
        let mut buckets = self.buckets.lock().unwrap();
        match (identifier, message_type) {
            (None, _) => {
                buckets.requests.clear();
                buckets.type_requests.clear();
            }
            (Some(id), Some(t)) => {
                buckets.type_requests.remove(&(id.to_string(), t.to_string()));
            }
            (Some(id), None) => {
                buckets.requests.remove(id);
                buckets.type_requests.retain(|(i, _), _| i != id);
            }
        }
    }
}
