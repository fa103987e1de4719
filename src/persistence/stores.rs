//! Store traits the sync orchestrators write through.
//!
//! [`super::Warehouse`] implements all of them against `SQLite`; tests swap
//! in mocks to exercise failure paths.

use chrono::{DateTime, Utc};

use crate::github::{PullRequestRecord, ReviewRecord};

use super::PersistenceError;

/// Append-only log of successful run instants, keyed by pipeline name.
pub trait WatermarkStore {
    /// Returns the most recently written watermark for `pipeline`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the state table cannot be read.
    fn get_last_success(&mut self, pipeline: &str)
    -> Result<Option<DateTime<Utc>>, PersistenceError>;

    /// Appends `instant` as the newest watermark for `pipeline`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the row cannot be written.
    fn set_last_success(
        &mut self,
        pipeline: &str,
        instant: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;
}

/// Append-only sink for pull request snapshots.
pub trait PullRequestSink {
    /// Appends `batch` atomically, returning the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when any row fails; no row of the batch
    /// is kept in that case.
    fn insert_pull_requests(
        &mut self,
        repo: &str,
        batch: &[PullRequestRecord],
        ingested_at: DateTime<Utc>,
    ) -> Result<u64, PersistenceError>;
}

/// Keyed sink for pull request reviews.
#[cfg_attr(test, mockall::automock)]
pub trait ReviewSink {
    /// Distinct pull request numbers stored for `repo`, most recently
    /// updated first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails.
    fn recent_pull_request_numbers(
        &mut self,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<u64>, PersistenceError>;

    /// Merges `reviews` of one pull request on `(repo, review_id)`.
    ///
    /// Returns the number of reviews merged. Re-running with the same input
    /// leaves one row per review.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when staging or merging fails; the merge
    /// is rolled back in that case.
    fn upsert_reviews(
        &mut self,
        repo: &str,
        pr_number: u64,
        reviews: &[ReviewRecord],
        ingested_at: DateTime<Utc>,
    ) -> Result<u64, PersistenceError>;
}
