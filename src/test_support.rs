//! Deterministic collaborators and payload builders for tests.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! integration tests under `tests/`.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use mockable::Clock;
use serde_json::{Value, json};

use crate::github::rate_limit::Sleeper;

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Creates a clock that always reports `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(now)
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Sleeper that records requested durations instead of blocking.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Durations requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// Minimal pulls-endpoint item for `number` last updated at `updated_at`.
#[must_use]
pub fn pull_request_payload(number: u64, updated_at: DateTime<Utc>) -> Value {
    json!({
        "id": 1_000_000 + number,
        "number": number,
        "state": "open",
        "title": format!("Pull request {number}"),
        "user": { "login": "octocat" },
        "updated_at": updated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    })
}

/// Minimal reviews-endpoint item.
#[must_use]
pub fn review_payload(id: u64, state: &str, submitted_at: Option<DateTime<Utc>>) -> Value {
    json!({
        "id": id,
        "state": state,
        "user": { "login": "reviewer" },
        "body": format!("review {id}"),
        "submitted_at": submitted_at
            .map(|instant| instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
    })
}
