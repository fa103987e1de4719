//! GitHub fixtures shared by the sync integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use prsync::test_support::{FixedClock, RecordingSleeper, pull_request_payload, review_payload};
use prsync::{PersonalAccessToken, RepositoryLocator, SyncContext};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, path_regex, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::runtime::SharedRuntime;

/// Repository every fixture targets.
pub const REPOSITORY: &str = "octo/repo";

/// Watermark pipeline name for [`REPOSITORY`].
pub const PIPELINE: &str = "github_prs::octo/repo";

const PULLS_PATH: &str = "/repos/octo/repo/pulls";

/// Instant every sync run in these tests starts at.
///
/// # Panics
///
/// Panics if the hard-coded timestamp is invalid.
pub fn run_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("run start should be a valid timestamp"))
}

/// `updated_at` of the item at 1-based `position` in the served list.
///
/// Items are a minute apart, newest first, and item 150 sits exactly one
/// day before [`run_start`].
pub fn updated_at_of(position: u64) -> DateTime<Utc> {
    let offset = 150_i64 - i64::try_from(position).unwrap_or(i64::MAX);
    run_start() - TimeDelta::days(1) + TimeDelta::minutes(offset)
}

/// Splits `count` pull requests, newest first, into pages of `per_page`.
pub fn pull_request_pages(count: u64, per_page: u64) -> Vec<Value> {
    let items: Vec<Value> = (1..=count)
        .map(|position| pull_request_payload(position, updated_at_of(position)))
        .collect();
    let chunk = usize::try_from(per_page.max(1)).unwrap_or(usize::MAX);
    if items.is_empty() {
        return vec![json!([])];
    }
    items
        .chunks(chunk)
        .map(|page| Value::Array(page.to_vec()))
        .collect()
}

/// Serves `pages` from the pulls endpoint, linking each page to the next.
pub fn mount_pull_request_pages(runtime: &SharedRuntime, server: &MockServer, pages: Vec<Value>) {
    let total = pages.len();
    for (page_number, body) in (1_usize..).zip(pages) {
        let mut response = ResponseTemplate::new(200).set_body_json(body);
        if page_number < total {
            let next = format!(
                "{}{PULLS_PATH}?per_page=100&page={}",
                server.uri(),
                page_number + 1
            );
            response = response.insert_header("Link", format!("<{next}>; rel=\"next\"").as_str());
        }
        let matcher = Mock::given(method("GET")).and(path(PULLS_PATH));
        let mock = if page_number == 1 {
            matcher.and(query_param_is_missing("page"))
        } else {
            matcher.and(query_param("page", page_number.to_string()))
        };
        runtime.block_on(mock.respond_with(response).mount(server));
    }
}

/// Serves `review_count` reviews for `pr_number` and an empty list for every
/// other pull request.
pub fn mount_reviews(
    runtime: &SharedRuntime,
    server: &MockServer,
    pr_number: u64,
    review_count: u64,
) {
    let reviews: Vec<Value> = (1..=review_count)
        .map(|offset| {
            review_payload(
                pr_number * 100 + offset,
                "APPROVED",
                Some(updated_at_of(pr_number)),
            )
        })
        .collect();
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(format!("{PULLS_PATH}/{pr_number}/reviews")))
            .respond_with(ResponseTemplate::new(200).set_body_json(reviews))
            .mount(server),
    );
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path_regex(r"^/repos/octo/repo/pulls/\d+/reviews$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .with_priority(10)
            .mount(server),
    );
}

/// Sync context against `server` whose clock is frozen at [`run_start`].
///
/// # Panics
///
/// Panics if the fixed repository or token is rejected.
pub fn sync_context(server: &MockServer, database_url: &str) -> SyncContext {
    let repository = RepositoryLocator::parse(REPOSITORY)
        .unwrap_or_else(|error| panic!("repository should parse: {error}"));
    let token = PersonalAccessToken::new("test-token")
        .unwrap_or_else(|error| panic!("token should be accepted: {error}"));
    SyncContext::new(repository, token, database_url)
        .with_api_base(server.uri())
        .with_clock(Arc::new(FixedClock::new(run_start())))
        .with_sleeper(Arc::new(RecordingSleeper::default()))
}
