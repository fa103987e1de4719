//! Incremental GitHub pull request and review ingestion into a warehouse.
//!
//! The crate pages through the GitHub REST API with a blocking client that
//! follows `Link` cursors and sleeps through rate limits, appends pull
//! request snapshots newer than a per-pipeline watermark, and merges the
//! reviews of recently updated pull requests so reruns converge on one row
//! per review.

pub mod config;
pub mod github;
pub mod persistence;
pub mod sync;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{Pipeline, PrsyncConfig};
pub use github::{
    GitHubClient, IntakeError, PersonalAccessToken, RateLimitPolicy, RepositoryLocator,
};
pub use persistence::{PersistenceError, Warehouse, migrate_database};
pub use sync::{SyncContext, run_pull_request_sync, run_review_sync};
pub use telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink};
