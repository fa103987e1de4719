//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prsync.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRSYNC_OWNER`, `PRSYNC_TOKEN`, or legacy
//!    `GITHUB_TOKEN`
//! 4. **Command-line arguments** – `--owner`/`-o`, `--token`/`-t`, and so on
//!
//! # Configuration File
//!
//! ```toml
//! owner = "octocat"
//! repo = "hello-world"
//! token = "ghp_example"
//! database_url = "warehouse.sqlite"
//! pipeline = "all"
//! lookback_days = 90
//! review_window = 200
//! rate_limit_max_retries = 5
//! ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::github::error::IntakeError;
use crate::github::rate_limit::{DEFAULT_RESET_BUFFER_SECONDS, RateLimitPolicy};
use crate::sync::pull_requests::{
    DEFAULT_BATCH_SIZE, DEFAULT_LOOKBACK_DAYS, DEFAULT_PER_PAGE, PullRequestSyncSettings,
};
use crate::sync::reviews::{DEFAULT_REVIEW_WINDOW, ReviewSyncSettings};

/// Largest page size GitHub accepts.
const MAX_PER_PAGE: u8 = 100;

/// Which sync pipelines a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Only the watermark-driven pull request sync.
    PullRequests,
    /// Only the review sync.
    Reviews,
    /// Pull requests first, then reviews.
    All,
}

impl Pipeline {
    /// Whether the pull request sync runs.
    #[must_use]
    pub const fn includes_pull_requests(self) -> bool {
        matches!(self, Self::PullRequests | Self::All)
    }

    /// Whether the review sync runs.
    #[must_use]
    pub const fn includes_reviews(self) -> bool {
        matches!(self, Self::Reviews | Self::All)
    }
}

impl FromStr for Pipeline {
    type Err = IntakeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pull-requests" | "pull_requests" | "prs" => Ok(Self::PullRequests),
            "reviews" => Ok(Self::Reviews),
            "all" => Ok(Self::All),
            other => Err(IntakeError::Configuration {
                message: format!(
                    "unknown pipeline '{other}' (expected pull-requests, reviews, or all)"
                ),
            }),
        }
    }
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `PRSYNC_TOKEN`, `GITHUB_TOKEN`, or `--token`: Authentication token
/// - `PRSYNC_OWNER` or `--owner`: Repository owner
/// - `PRSYNC_REPO` or `--repo`: Repository name
/// - `PRSYNC_DATABASE_URL` or `--database-url`: Warehouse `SQLite` path
/// - `PRSYNC_PIPELINE` or `--pipeline`: `pull-requests`, `reviews`, or `all`
///
/// # Example
///
/// ```no_run
/// use prsync::PrsyncConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = PrsyncConfig::load().expect("failed to load configuration");
/// let token = config.resolve_token().expect("token required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRSYNC",
    discovery(
        dotfile_name = ".prsync.toml",
        config_file_name = "prsync.toml",
        app_name = "prsync"
    )
)]
pub struct PrsyncConfig {
    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PRSYNC_TOKEN` or `GITHUB_TOKEN` (legacy)
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Repository owner (e.g., "octocat").
    ///
    /// Can be provided via:
    /// - CLI: `--owner <OWNER>` or `-o <OWNER>`
    /// - Environment: `PRSYNC_OWNER`
    /// - Config file: `owner = "..."`
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name (e.g., "hello-world").
    ///
    /// Can be provided via:
    /// - CLI: `--repo <REPO>` or `-r <REPO>`
    /// - Environment: `PRSYNC_REPO`
    /// - Config file: `repo = "..."`
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// GitHub REST API base URL; defaults to `https://api.github.com`.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Warehouse `SQLite` database URL/path.
    ///
    /// Can be provided via:
    /// - CLI: `--database-url <PATH>`
    /// - Environment: `PRSYNC_DATABASE_URL`
    /// - Config file: `database_url = "..."`
    #[ortho_config()]
    pub database_url: Option<String>,

    /// Pipelines to run: `pull-requests`, `reviews`, or `all` (default).
    #[ortho_config(cli_short = 'p')]
    pub pipeline: Option<String>,

    /// First-run lookback window for the pull request sync, in days.
    #[ortho_config()]
    pub lookback_days: u32,

    /// Pull requests written per transaction.
    #[ortho_config()]
    pub batch_size: u32,

    /// Items requested per API page (1 to 100).
    #[ortho_config()]
    pub per_page: u8,

    /// Recent pull requests whose reviews are refreshed each run.
    #[ortho_config()]
    pub review_window: u32,

    /// Seconds added to the rate-limit reset time before retrying.
    #[ortho_config()]
    pub rate_limit_buffer_seconds: u64,

    /// Rate-limit retries per request before giving up; unset retries
    /// indefinitely.
    #[ortho_config()]
    pub rate_limit_max_retries: Option<u32>,

    /// Ceiling on a single rate-limit sleep, in seconds.
    #[ortho_config()]
    pub rate_limit_max_sleep_seconds: Option<u64>,

    /// Items scanned past the first one at or below the cutoff, to tolerate
    /// imperfect `updated_at` ordering.
    #[ortho_config()]
    pub ordering_safety_margin: u32,

    /// Runs database migrations and exits.
    ///
    /// Can be provided via:
    /// - CLI: `--migrate-db`
    /// - Config file: `migrate_db = true`
    #[ortho_config()]
    pub migrate_db: bool,
}

impl Default for PrsyncConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            repo: None,
            api_base: None,
            database_url: None,
            pipeline: None,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            batch_size: u32::try_from(DEFAULT_BATCH_SIZE).unwrap_or(u32::MAX),
            per_page: DEFAULT_PER_PAGE,
            review_window: DEFAULT_REVIEW_WINDOW,
            rate_limit_buffer_seconds: DEFAULT_RESET_BUFFER_SECONDS,
            rate_limit_max_retries: None,
            rate_limit_max_sleep_seconds: None,
            ordering_safety_margin: 0,
            migrate_db: false,
        }
    }
}

impl PrsyncConfig {
    /// Resolves the token from configuration or the legacy `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingToken`] when no token source provides a
    /// value.
    pub fn resolve_token(&self) -> Result<String, IntakeError> {
        self.token_or(env::var("GITHUB_TOKEN").ok())
    }

    fn token_or(&self, fallback: Option<String>) -> Result<String, IntakeError> {
        self.token
            .clone()
            .or(fallback)
            .filter(|token| !token.trim().is_empty())
            .ok_or(IntakeError::MissingToken)
    }

    /// Returns owner and repo if both are configured.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when owner or repo is missing.
    pub fn require_repository_info(&self) -> Result<(&str, &str), IntakeError> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Ok((owner.as_str(), repo.as_str())),
            (None, _) => Err(IntakeError::Configuration {
                message: "repository owner is required (use --owner or -o)".to_owned(),
            }),
            (_, None) => Err(IntakeError::Configuration {
                message: "repository name is required (use --repo or -r)".to_owned(),
            }),
        }
    }

    /// Returns the database URL or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when no database URL is
    /// configured.
    pub fn require_database_url(&self) -> Result<&str, IntakeError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| IntakeError::Configuration {
                message: "database URL is required (use --database-url or PRSYNC_DATABASE_URL)"
                    .to_owned(),
            })
    }

    /// Parses the selected pipelines, defaulting to [`Pipeline::All`].
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] for an unknown pipeline name.
    pub fn pipeline(&self) -> Result<Pipeline, IntakeError> {
        self.pipeline
            .as_deref()
            .map_or(Ok(Pipeline::All), Pipeline::from_str)
    }

    /// Validates that numeric settings are in range and the pipeline name
    /// is known.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] describing the first invalid
    /// setting.
    pub fn validate(&self) -> Result<(), IntakeError> {
        self.pipeline()?;
        if self.lookback_days == 0 {
            return Err(invalid("lookback_days must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be at least 1"));
        }
        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(invalid("per_page must be between 1 and 100"));
        }
        if self.review_window == 0 {
            return Err(invalid("review_window must be at least 1"));
        }
        Ok(())
    }

    /// Builds the client's rate-limit policy.
    #[must_use]
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            reset_buffer: Duration::from_secs(self.rate_limit_buffer_seconds),
            max_retries: self.rate_limit_max_retries,
            max_sleep: self.rate_limit_max_sleep_seconds.map(Duration::from_secs),
        }
    }

    /// Builds the pull request sync settings.
    #[must_use]
    pub fn pull_request_settings(&self) -> PullRequestSyncSettings {
        PullRequestSyncSettings {
            lookback: TimeDelta::days(i64::from(self.lookback_days)),
            batch_size: usize::try_from(self.batch_size).unwrap_or(usize::MAX),
            per_page: self.per_page,
            ordering_safety_margin: usize::try_from(self.ordering_safety_margin)
                .unwrap_or(usize::MAX),
        }
    }

    /// Builds the review sync settings.
    #[must_use]
    pub const fn review_settings(&self) -> ReviewSyncSettings {
        ReviewSyncSettings {
            recent_window: self.review_window,
            per_page: self.per_page,
        }
    }
}

fn invalid(message: &str) -> IntakeError {
    IntakeError::Configuration {
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests;
