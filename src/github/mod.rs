//! GitHub REST access for the ingestion pipelines.
//!
//! This module wraps a blocking `reqwest` client that authenticates with a
//! personal access token, follows `Link` pagination cursors, and waits out
//! rate-limit rejections. Errors are mapped into [`IntakeError`] variants so
//! that the sync orchestrators can abort a run with a precise cause.

pub mod client;
pub mod error;
pub mod locator;
pub mod models;
pub mod pagination;
pub mod rate_limit;

#[cfg(test)]
pub(crate) mod mock_server;

pub use client::{ApiResponse, DEFAULT_API_BASE, GitHubClient, Paginator};
pub use error::IntakeError;
pub use locator::{PersonalAccessToken, RepositoryLocator, RepositoryName, RepositoryOwner};
pub use models::{PullRequestRecord, ReviewRecord};
pub use pagination::PageCursor;
pub use rate_limit::{RateLimitInfo, RateLimitPolicy, Sleeper, ThreadSleeper};
