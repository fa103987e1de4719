//! Review sync over a window of recently updated pull requests.
//!
//! Reviews are not watermarked. Each run takes the most recently updated
//! pull requests already in the warehouse, re-fetches their complete review
//! lists and merges them on `(repo, review_id)`, which makes a rerun safe.

use mockable::Clock;
use tracing::info;

use crate::github::{GitHubClient, IntakeError, RepositoryLocator, ReviewRecord};
use crate::persistence::ReviewSink;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::pull_requests::DEFAULT_PER_PAGE;
use super::{read_error, write_error};

/// Default number of recent pull requests whose reviews are refreshed.
pub const DEFAULT_REVIEW_WINDOW: u32 = 200;

/// Tunables for a review sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSyncSettings {
    /// Pull requests visited per run.
    pub recent_window: u32,
    /// Items per API page.
    pub per_page: u8,
}

impl Default for ReviewSyncSettings {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_REVIEW_WINDOW,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Outcome of a successful review sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSyncReport {
    /// Review rows merged across all pull requests.
    pub upserted: u64,
    /// Pull requests visited, in visiting order.
    pub pull_requests: Vec<u64>,
}

/// Refreshes reviews for a repository's recent pull requests.
pub struct ReviewSync<'a> {
    client: &'a GitHubClient,
    clock: &'a dyn Clock,
    telemetry: &'a dyn TelemetrySink,
    settings: ReviewSyncSettings,
}

impl<'a> ReviewSync<'a> {
    /// Creates a review sync over `client`.
    #[must_use]
    pub const fn new(
        client: &'a GitHubClient,
        clock: &'a dyn Clock,
        telemetry: &'a dyn TelemetrySink,
        settings: ReviewSyncSettings,
    ) -> Self {
        Self {
            client,
            clock,
            telemetry,
            settings,
        }
    }

    /// Re-fetches and merges reviews for the recent window of `repository`.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::DependencyMissing`] when no pull requests are
    /// stored for the repository, or the first client, record or warehouse
    /// error. Pull requests merged before a failure keep their rows.
    pub fn run<W: ReviewSink>(
        &self,
        repository: &RepositoryLocator,
        warehouse: &mut W,
    ) -> Result<ReviewSyncReport, IntakeError> {
        let repo = repository.full_name();
        let pull_requests = warehouse
            .recent_pull_request_numbers(&repo, self.settings.recent_window)
            .map_err(|error| read_error(&error))?;
        if pull_requests.is_empty() {
            return Err(IntakeError::DependencyMissing {
                message: format!(
                    "no pull requests stored for {repo} in github_pull_requests; \
                     run the pull request sync first"
                ),
            });
        }

        let per_page = self.settings.per_page.to_string();
        let mut upserted = 0_u64;
        for &pr_number in &pull_requests {
            let reviews = self
                .client
                .paginate(
                    &repository.reviews_path(pr_number),
                    &[("per_page", per_page.as_str())],
                )
                .map(|item| item.and_then(ReviewRecord::from_payload))
                .collect::<Result<Vec<_>, _>>()?;

            let rows = warehouse
                .upsert_reviews(&repo, pr_number, &reviews, self.clock.utc())
                .map_err(|error| write_error(&error))?;
            if rows > 0 {
                info!(repo = %repo, pr_number, rows, "[merge] upserted reviews");
                self.telemetry.record(TelemetryEvent::ReviewsUpserted {
                    repo: repo.clone(),
                    pr_number,
                    rows,
                });
            }
            upserted = upserted.saturating_add(rows);
        }

        info!(
            repo = %repo,
            upserted,
            "Upserted {upserted} review rows into github_pull_request_reviews"
        );
        Ok(ReviewSyncReport {
            upserted,
            pull_requests,
        })
    }
}
