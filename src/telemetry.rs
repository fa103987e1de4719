//! Structured telemetry events and sinks.
//!
//! Human-readable progress goes through `tracing`. Telemetry events are the
//! machine-readable counterpart: one JSON object per notable state change,
//! which an orchestrator can scrape from stderr.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Records the current database schema version after migrations apply.
    SchemaVersionRecorded {
        /// Diesel migration version string (e.g. `20260105000000`).
        schema_version: String,
    },
    /// A batch of pull requests was appended to the raw table.
    PullRequestBatchFlushed {
        /// Pipeline name.
        pipeline: String,
        /// Rows written by this batch.
        rows: u64,
        /// Rows written by the run so far.
        total: u64,
    },
    /// Reviews of one pull request were merged into the raw table.
    ReviewsUpserted {
        /// Repository in `<owner>/<repo>` form.
        repo: String,
        /// Pull request whose reviews were merged.
        pr_number: u64,
        /// Review rows merged.
        rows: u64,
    },
    /// A run finished and advanced its watermark.
    WatermarkCommitted {
        /// Pipeline name.
        pipeline: String,
        /// RFC 3339 timestamp stored as the new watermark.
        last_success_ts: String,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// Telemetry sinks for assertions in tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::{Mutex, PoisonError};

    use super::{TelemetryEvent, TelemetrySink};

    /// Sink that keeps every event in memory.
    #[derive(Debug, Default)]
    pub struct RecordingTelemetrySink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingTelemetrySink {
        /// Removes and returns the recorded events.
        #[must_use]
        pub fn take(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .drain(..)
                .collect()
        }
    }

    impl TelemetrySink for RecordingTelemetrySink {
        fn record(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }
}
