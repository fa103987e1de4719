//! Wiremock-backed GitHub stand-in for unit tests.
//!
//! Wiremock is async while the client blocks, so the server is driven from
//! a private Tokio runtime and the client runs on the test thread.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use super::client::GitHubClient;
use super::locator::PersonalAccessToken;
use crate::test_support::{FixedClock, RecordingSleeper};

pub(crate) const TEST_TOKEN: &str = "test-token";

pub(crate) struct MockGitHub {
    server: MockServer,
    runtime: Runtime,
    pub(crate) sleeper: Arc<RecordingSleeper>,
}

impl MockGitHub {
    pub(crate) fn start() -> Self {
        let runtime = Runtime::new().expect("tokio runtime should start");
        let server = runtime.block_on(MockServer::start());
        Self {
            server,
            runtime,
            sleeper: Arc::new(RecordingSleeper::default()),
        }
    }

    pub(crate) fn uri(&self) -> String {
        self.server.uri()
    }

    pub(crate) fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    pub(crate) fn received_requests(&self) -> Vec<Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    /// Client against this server whose clock is frozen at `now`.
    pub(crate) fn client(&self, now: DateTime<Utc>) -> GitHubClient {
        let token = PersonalAccessToken::new(TEST_TOKEN).expect("token should be valid");
        GitHubClient::new(token, &self.uri())
            .expect("client should build")
            .with_clock(Arc::new(FixedClock::new(now)))
            .with_sleeper(self.sleeper.clone())
    }

    /// Serves `pages` at `api_path`, linking each page to the next.
    ///
    /// The first page is matched by the absence of a `page` parameter, later
    /// pages by `page=<n>`, mirroring GitHub's `Link` URLs.
    pub(crate) fn mount_pages(&self, api_path: &str, pages: Vec<Value>) {
        let total = pages.len();
        for (index, body) in pages.into_iter().enumerate() {
            let page_number = index + 1;
            let mut response = ResponseTemplate::new(200).set_body_json(body);
            if page_number < total {
                let next_url = format!(
                    "{}{api_path}?per_page=100&page={}",
                    self.uri(),
                    page_number + 1
                );
                response =
                    response.insert_header("Link", format!("<{next_url}>; rel=\"next\"").as_str());
            }

            let matcher = Mock::given(method("GET")).and(path(api_path));
            let mock = if page_number == 1 {
                matcher.and(query_param_is_missing("page"))
            } else {
                matcher.and(query_param("page", page_number.to_string()))
            };
            self.mount(mock.respond_with(response));
        }
    }
}
