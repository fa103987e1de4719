//! Rate limit detection and backoff policy for GitHub API responses.
//!
//! GitHub signals an exhausted quota with a 403 or 429 status together with
//! `X-RateLimit-Remaining: 0` and an `X-RateLimit-Reset` unix timestamp. The
//! client sleeps until the reset instant plus a small buffer and retries the
//! same request. [`RateLimitPolicy`] decides how long that loop may go on.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Extra seconds slept past the advertised reset instant.
pub const DEFAULT_RESET_BUFFER_SECONDS: u64 = 2;

/// Rate limit information extracted from GitHub API response headers.
///
/// # Example
///
/// ```
/// use prsync::github::rate_limit::RateLimitInfo;
///
/// let info = RateLimitInfo::new(Some(5000), 0, 1_700_000_000);
/// assert!(info.is_exhausted());
/// assert_eq!(info.seconds_until_reset(1_699_999_990), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests allowed in the current window, when advertised.
    limit: Option<u32>,
    /// Remaining requests in the current window.
    remaining: u32,
    /// Unix timestamp when the rate limit resets.
    reset_at: u64,
}

impl RateLimitInfo {
    /// Creates a new rate limit info instance.
    #[must_use]
    pub const fn new(limit: Option<u32>, remaining: u32, reset_at: u64) -> Self {
        Self {
            limit,
            remaining,
            reset_at,
        }
    }

    /// Reads the rate limit headers from a response.
    ///
    /// Returns `None` unless both the remaining-calls and reset headers are
    /// present and numeric.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = parse_header(headers, REMAINING_HEADER)?;
        let reset_at = parse_header(headers, RESET_HEADER)?;
        let limit = parse_header(headers, LIMIT_HEADER);
        Some(Self::new(limit, remaining, reset_at))
    }

    /// Returns the maximum requests allowed in the current window.
    #[must_use]
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Returns the remaining requests in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns the Unix timestamp when the rate limit resets.
    #[must_use]
    pub const fn reset_at(&self) -> u64 {
        self.reset_at
    }

    /// Returns true if the rate limit has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Seconds from `now_unix` until the reset instant, or 0 if it passed.
    #[must_use]
    pub const fn seconds_until_reset(&self, now_unix: u64) -> u64 {
        self.reset_at.saturating_sub(now_unix)
    }
}

fn parse_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Returns the exhausted quota carried by a response, if it is a rate-limit
/// rejection.
///
/// Only 403 and 429 count, and only when the headers say no calls remain.
#[must_use]
pub fn rate_limit_rejection(status: StatusCode, headers: &HeaderMap) -> Option<RateLimitInfo> {
    if !matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
        return None;
    }
    RateLimitInfo::from_headers(headers).filter(RateLimitInfo::is_exhausted)
}

/// How the client waits out an exhausted rate limit.
///
/// The default keeps retrying forever, which stalls a run for as long as the
/// quota stays exhausted. Set `max_retries` to fail instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Added to the computed wait so the retry lands after the reset.
    pub reset_buffer: Duration,
    /// Number of rate-limit retries allowed per request; `None` is unbounded.
    pub max_retries: Option<u32>,
    /// Upper bound for a single sleep; `None` sleeps the full wait.
    pub max_sleep: Option<Duration>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            reset_buffer: Duration::from_secs(DEFAULT_RESET_BUFFER_SECONDS),
            max_retries: None,
            max_sleep: None,
        }
    }
}

impl RateLimitPolicy {
    /// Duration to sleep for the given rejection observed at `now_unix`.
    #[must_use]
    pub fn sleep_for(&self, info: &RateLimitInfo, now_unix: u64) -> Duration {
        let wait = Duration::from_secs(info.seconds_until_reset(now_unix)) + self.reset_buffer;
        self.max_sleep.map_or(wait, |cap| wait.min(cap))
    }

    /// Returns true when another retry is allowed after `retries_so_far`.
    #[must_use]
    pub fn allows_retry(&self, retries_so_far: u32) -> bool {
        self.max_retries.is_none_or(|max| retries_so_far < max)
    }
}

/// Blocks the calling thread; replaced in tests to observe backoff.
pub trait Sleeper: Send + Sync {
    /// Suspends the current thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeper backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
