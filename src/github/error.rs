//! Error types exposed by the ingestion layer.

use thiserror::Error;

use super::rate_limit::RateLimitInfo;

/// Errors surfaced while talking to GitHub or writing to the warehouse.
///
/// Every variant aborts the current run. The only failure handled
/// internally is a rate-limit response, which the client sleeps through
/// unless its [`RateLimitPolicy`](super::RateLimitPolicy) gives up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    /// The repository identifier is incomplete.
    #[error("repository must be given as <owner>/<repo>")]
    MissingPathSegments,

    /// A URL could not be parsed.
    #[error("URL is invalid: {0}")]
    InvalidUrl(String),

    /// The authentication token was missing.
    #[error("personal access token is required (use --token, PRSYNC_TOKEN, or GITHUB_TOKEN)")]
    MissingToken,

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401 response.
        message: String,
    },

    /// GitHub answered with a non-success status that is not a rate limit.
    #[error("GitHub returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// GitHub's `message` field, or a placeholder when absent.
        message: String,
    },

    /// GitHub answered successfully but the body was not usable.
    #[error("GitHub API error: {message}")]
    Api {
        /// Description of the malformed response.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// The rate limit stayed exhausted beyond the configured retry policy.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Rate limit info from the last rejected response.
        rate_limit: Option<RateLimitInfo>,
        /// Human-readable summary.
        message: String,
    },

    /// An API item lacked a field needed to store it.
    #[error("invalid {entity} record: {message}")]
    InvalidRecord {
        /// Entity kind, e.g. `pull request` or `review`.
        entity: &'static str,
        /// Decoding error detail.
        message: String,
    },

    /// Review sync ran before any pull requests were ingested.
    #[error("dependency missing: {message}")]
    DependencyMissing {
        /// Explanation naming the missing parent data.
        message: String,
    },

    /// Persisting a batch, merging reviews, or committing a watermark failed.
    #[error("warehouse write failed: {message}")]
    Write {
        /// Error detail from the persistence layer.
        message: String,
    },

    /// Local I/O failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },

    /// Configuration could not be loaded or was invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },
}
