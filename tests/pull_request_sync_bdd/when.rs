//! When steps for pull request sync behavioural tests.

use prsync::{run_pull_request_sync, run_review_sync};
use rstest_bdd_macros::when;

use crate::pull_request_sync_bdd_state::SyncState;
use crate::support::github::sync_context;

#[when("the pull request sync runs")]
#[expect(
    clippy::expect_used,
    reason = "integration test step; allow-expect-in-tests does not cover integration tests"
)]
fn pull_request_sync_runs(sync_state: &SyncState) {
    let database_url = sync_state
        .database_url
        .get()
        .expect("warehouse not initialised");
    let result = sync_state
        .server
        .with_ref(|server| run_pull_request_sync(&sync_context(server, &database_url)))
        .expect("mock server not initialised");

    match result {
        Ok(inserted) => sync_state.inserted.set(inserted),
        Err(error) => sync_state.error.set(error),
    }
}

#[when("the review sync runs")]
fn review_sync_runs(sync_state: &SyncState) {
    run_reviews(sync_state);
}

#[when("the review sync runs twice")]
fn review_sync_runs_twice(sync_state: &SyncState) {
    run_reviews(sync_state);
    run_reviews(sync_state);
}

#[expect(
    clippy::expect_used,
    reason = "integration test helper; allow-expect-in-tests does not cover integration tests"
)]
fn run_reviews(sync_state: &SyncState) {
    let database_url = sync_state
        .database_url
        .get()
        .expect("warehouse not initialised");
    let result = sync_state
        .server
        .with_ref(|server| run_review_sync(&sync_context(server, &database_url)))
        .expect("mock server not initialised");

    match result {
        Ok(upserted) => sync_state.upserted.set(upserted),
        Err(error) => sync_state.error.set(error),
    }
}
