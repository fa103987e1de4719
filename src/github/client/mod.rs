//! Blocking GitHub REST client with cursor pagination and rate-limit backoff.
//!
//! The client is deliberately synchronous: a sync run fetches a page, writes
//! it, and only then asks for the next one. A rate-limit rejection blocks
//! the calling thread until the quota resets.

use std::sync::Arc;
use std::time::Duration;

use mockable::{Clock, DefaultClock};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LINK, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::error::IntakeError;
use super::locator::PersonalAccessToken;
use super::pagination::{PageCursor, page_items};
use super::rate_limit::{
    RateLimitInfo, RateLimitPolicy, Sleeper, ThreadSleeper, rate_limit_rejection,
};

/// Public GitHub REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A decoded successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
    /// Cursor to the next page when the response advertises one.
    pub next: Option<PageCursor>,
    /// Rate limit headers carried by the response.
    pub rate_limit: Option<RateLimitInfo>,
}

/// Authenticated GitHub REST client.
pub struct GitHubClient {
    http: Client,
    api_base: Url,
    token: PersonalAccessToken,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock + Send + Sync>,
    sleeper: Arc<dyn Sleeper>,
}

impl GitHubClient {
    /// Builds a client for `api_base` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidUrl`] when `api_base` is not a URL and
    /// [`IntakeError::Configuration`] when the HTTP client cannot be built.
    pub fn new(token: PersonalAccessToken, api_base: &str) -> Result<Self, IntakeError> {
        let parsed_base = Url::parse(api_base.trim())
            .map_err(|error| IntakeError::InvalidUrl(format!("{api_base}: {error}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("prsync/", env!("CARGO_PKG_VERSION"))),
        );

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|error| IntakeError::Configuration {
                message: format!("failed to configure GitHub HTTP client: {error}"),
            })?;

        Ok(Self {
            http,
            api_base: parsed_base,
            token,
            policy: RateLimitPolicy::default(),
            clock: Arc::new(DefaultClock),
            sleeper: Arc::new(ThreadSleeper),
        })
    }

    /// Replaces the rate-limit retry policy.
    #[must_use]
    pub const fn with_rate_limit_policy(mut self, policy: RateLimitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the clock used to compute rate-limit waits.
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

    /// Performs one GET, sleeping through rate-limit rejections.
    ///
    /// `path` is either an absolute URL or a path below the API base.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Http`] for non-success statuses,
    /// [`IntakeError::Authentication`] for 401, [`IntakeError::Network`] for
    /// transport failures, [`IntakeError::Api`] for undecodable bodies and
    /// [`IntakeError::RateLimitExceeded`] once the policy stops retrying.
    pub fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, IntakeError> {
        let url = self.resolve(path)?;
        self.fetch_url(&url, query)
    }

    /// Lazily iterates over every item of a paginated collection.
    ///
    /// Nothing is requested until the first item is pulled. The sequence is
    /// not resumable: after an error it ends, and a fresh call with the same
    /// query starts again from the first page.
    #[must_use]
    pub fn paginate<'client>(
        &'client self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Paginator<'client> {
        let owned_query = query
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        Paginator {
            client: self,
            pending: Some(PendingPage::First {
                path: path.to_owned(),
                query: owned_query,
            }),
            buffered: Vec::new().into_iter(),
            pages_fetched: 0,
        }
    }

    fn resolve(&self, path: &str) -> Result<Url, IntakeError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|error| IntakeError::InvalidUrl(error.to_string()));
        }
        let joined = format!(
            "{}/{}",
            self.api_base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|error| IntakeError::InvalidUrl(error.to_string()))
    }

    fn fetch_url<Q>(&self, url: &Url, query: &Q) -> Result<ApiResponse, IntakeError>
    where
        Q: Serialize + ?Sized,
    {
        let mut retries: u32 = 0;
        loop {
            let response = self.send(url, query)?;
            let Some(info) = rate_limit_rejection(response.status(), response.headers()) else {
                return decode_response(response);
            };

            if !self.policy.allows_retry(retries) {
                return Err(IntakeError::RateLimitExceeded {
                    rate_limit: Some(info),
                    message: format!(
                        "GET {url} still rate limited after {retries} retries (resets at {reset})",
                        reset = info.reset_at()
                    ),
                });
            }

            let wait = self.policy.sleep_for(&info, self.now_unix());
            warn!(
                url = %url,
                reset_at = info.reset_at(),
                sleep_secs = wait.as_secs(),
                "rate limit exhausted; sleeping until reset"
            );
            self.sleeper.sleep(wait);
            retries = retries.saturating_add(1);
        }
    }

    fn send<Q>(&self, url: &Url, query: &Q) -> Result<Response, IntakeError>
    where
        Q: Serialize + ?Sized,
    {
        self.http
            .get(url.clone())
            .bearer_auth(self.token.value())
            .query(query)
            .send()
            .map_err(|error| IntakeError::Network {
                message: format!("GET {url} failed: {error}"),
            })
    }

    fn now_unix(&self) -> u64 {
        // A clock before the epoch leaves the full reset wait in place.
        u64::try_from(self.clock.utc().timestamp()).unwrap_or(0)
    }
}

fn decode_response(response: Response) -> Result<ApiResponse, IntakeError> {
    let status = response.status();
    let rate_limit = RateLimitInfo::from_headers(response.headers());
    if let Some(info) = rate_limit {
        debug!(
            limit = ?info.limit(),
            remaining = info.remaining(),
            reset_at = info.reset_at(),
            "GitHub rate limit status"
        );
    }

    if !status.is_success() {
        let message = response
            .text()
            .ok()
            .and_then(|body| extract_github_message(&body))
            .unwrap_or_else(|| "unknown error".to_owned());
        return Err(map_http_error(status, message));
    }

    let next = response
        .headers()
        .get(LINK)
        .and_then(|value| value.to_str().ok())
        .and_then(PageCursor::from_link_header);

    let body: Value = response.json().map_err(|error| IntakeError::Api {
        message: format!("response JSON decoding failed: {error}"),
    })?;

    Ok(ApiResponse {
        status: status.as_u16(),
        body,
        next,
        rate_limit,
    })
}

fn map_http_error(status: StatusCode, message: String) -> IntakeError {
    if status == StatusCode::UNAUTHORIZED {
        IntakeError::Authentication { message }
    } else {
        IntakeError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

enum PendingPage {
    First {
        path: String,
        query: Vec<(String, String)>,
    },
    Next(PageCursor),
}

/// Lazy item sequence over a paginated collection.
///
/// Yields `Err` at most once; the sequence is finished afterwards.
pub struct Paginator<'client> {
    client: &'client GitHubClient,
    pending: Option<PendingPage>,
    buffered: std::vec::IntoIter<Value>,
    pages_fetched: u32,
}

impl Paginator<'_> {
    /// Number of pages requested so far.
    #[must_use]
    pub const fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    fn load(&mut self, page: PendingPage) -> Result<(), IntakeError> {
        let response = match page {
            PendingPage::First { path, query } => {
                let url = self.client.resolve(&path)?;
                self.client.fetch_url(&url, &query)?
            }
            PendingPage::Next(cursor) => {
                let url = self.client.resolve(cursor.as_str())?;
                let no_query: &[(&str, &str)] = &[];
                self.client.fetch_url(&url, no_query)?
            }
        };
        self.pages_fetched = self.pages_fetched.saturating_add(1);
        self.pending = response.next.map(PendingPage::Next);
        self.buffered = page_items(response.body)?.into_iter();
        Ok(())
    }
}

impl Iterator for Paginator<'_> {
    type Item = Result<Value, IntakeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffered.next() {
                return Some(Ok(item));
            }
            let page = self.pending.take()?;
            if let Err(error) = self.load(page) {
                self.pending = None;
                return Some(Err(error));
            }
        }
    }
}
