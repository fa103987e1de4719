//! Entry points for schedulers and the CLI.
//!
//! Each entry point opens its own warehouse connection, runs one pipeline
//! and returns the number of rows it wrote. Run the pull request sync before
//! the review sync: the latter reads the pull requests the former stored.
//!
//! Concurrent runs of the same pipeline are not locked against each other.
//! Two overlapping pull request runs append duplicate snapshots and may
//! commit watermarks out of order, so callers must serialise them.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::config::PrsyncConfig;
use crate::github::{
    DEFAULT_API_BASE, GitHubClient, IntakeError, PersonalAccessToken, RateLimitPolicy,
    RepositoryLocator, Sleeper, ThreadSleeper,
};
use crate::persistence::Warehouse;
use crate::telemetry::{NoopTelemetrySink, TelemetrySink};

use super::pull_requests::{PullRequestSync, PullRequestSyncSettings};
use super::read_error;
use super::reviews::{ReviewSync, ReviewSyncSettings};

/// Everything a sync run needs, resolved from configuration.
pub struct SyncContext {
    repository: RepositoryLocator,
    token: PersonalAccessToken,
    api_base: String,
    database_url: String,
    rate_limit: RateLimitPolicy,
    pull_requests: PullRequestSyncSettings,
    reviews: ReviewSyncSettings,
    clock: Arc<dyn Clock + Send + Sync>,
    sleeper: Arc<dyn Sleeper>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncContext")
            .field("repository", &self.repository)
            .field("token", &self.token)
            .field("api_base", &self.api_base)
            .field("database_url", &self.database_url)
            .field("rate_limit", &self.rate_limit)
            .field("pull_requests", &self.pull_requests)
            .field("reviews", &self.reviews)
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    /// Creates a context with default settings against the public API.
    #[must_use]
    pub fn new(
        repository: RepositoryLocator,
        token: PersonalAccessToken,
        database_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            token,
            api_base: DEFAULT_API_BASE.to_owned(),
            database_url: database_url.into(),
            rate_limit: RateLimitPolicy::default(),
            pull_requests: PullRequestSyncSettings::default(),
            reviews: ReviewSyncSettings::default(),
            clock: Arc::new(DefaultClock),
            sleeper: Arc::new(ThreadSleeper),
            telemetry: Arc::new(NoopTelemetrySink),
        }
    }

    /// Resolves a context from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingToken`] without a token, or
    /// [`IntakeError::Configuration`] when the repository or database URL is
    /// missing or a setting is out of range.
    pub fn from_config(config: &PrsyncConfig) -> Result<Self, IntakeError> {
        config.validate()?;
        let token = PersonalAccessToken::new(config.resolve_token()?)?;
        let (owner, repo) = config.require_repository_info()?;
        let repository = RepositoryLocator::from_owner_repo(owner, repo)?;
        let database_url = config.require_database_url()?;

        let mut context = Self::new(repository, token, database_url)
            .with_rate_limit_policy(config.rate_limit_policy())
            .with_pull_request_settings(config.pull_request_settings())
            .with_review_settings(config.review_settings());
        if let Some(api_base) = config.api_base.as_deref() {
            context = context.with_api_base(api_base);
        }
        Ok(context)
    }

    /// Targets a different API base, such as GitHub Enterprise or a mock.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Replaces the rate-limit policy.
    #[must_use]
    pub const fn with_rate_limit_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    /// Replaces the pull request sync settings.
    #[must_use]
    pub const fn with_pull_request_settings(mut self, settings: PullRequestSyncSettings) -> Self {
        self.pull_requests = settings;
        self
    }

    /// Replaces the review sync settings.
    #[must_use]
    pub const fn with_review_settings(mut self, settings: ReviewSyncSettings) -> Self {
        self.reviews = settings;
        self
    }

    /// Replaces the clock used for run starts and rate-limit waits.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the sleeper used during rate-limit backoff.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Repository being synced.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryLocator {
        &self.repository
    }

    /// Warehouse database URL.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    fn client(&self) -> Result<GitHubClient, IntakeError> {
        Ok(GitHubClient::new(self.token.clone(), &self.api_base)?
            .with_rate_limit_policy(self.rate_limit)
            .with_clock(Arc::clone(&self.clock))
            .with_sleeper(Arc::clone(&self.sleeper)))
    }

    fn open_warehouse(&self) -> Result<Warehouse, IntakeError> {
        Warehouse::open(&self.database_url, self.telemetry.as_ref())
            .map_err(|error| read_error(&error))
    }
}

/// Runs the incremental pull request sync described by `context`.
///
/// Returns the number of snapshot rows appended.
///
/// # Errors
///
/// Returns the first configuration, client, record or warehouse error; the
/// watermark is left unchanged in that case.
pub fn run_pull_request_sync(context: &SyncContext) -> Result<u64, IntakeError> {
    let client = context.client()?;
    let mut warehouse = context.open_warehouse()?;
    let report = PullRequestSync::new(
        &client,
        context.clock.as_ref(),
        context.telemetry.as_ref(),
        context.pull_requests,
    )
    .run(&context.repository, &mut warehouse)?;
    Ok(report.inserted)
}

/// Runs the review sync described by `context`.
///
/// Returns the number of review rows merged.
///
/// # Errors
///
/// Returns [`IntakeError::DependencyMissing`] when no pull requests are
/// stored for the repository, otherwise the first client, record or
/// warehouse error.
pub fn run_review_sync(context: &SyncContext) -> Result<u64, IntakeError> {
    let client = context.client()?;
    let mut warehouse = context.open_warehouse()?;
    let report = ReviewSync::new(
        &client,
        context.clock.as_ref(),
        context.telemetry.as_ref(),
        context.reviews,
    )
    .run(&context.repository, &mut warehouse)?;
    Ok(report.upserted)
}
