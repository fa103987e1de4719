//! Then steps for pull request sync behavioural tests.

use prsync::persistence::WatermarkStore;
use prsync::telemetry::NoopTelemetrySink;
use prsync::{IntakeError, Warehouse};
use rstest_bdd_macros::then;

use crate::pull_request_sync_bdd_state::SyncState;
use crate::support::github::{PIPELINE, REPOSITORY, run_start};

#[expect(
    clippy::expect_used,
    reason = "integration test helper; allow-expect-in-tests does not cover integration tests"
)]
fn open_warehouse(sync_state: &SyncState) -> Warehouse {
    let database_url = sync_state
        .database_url
        .get()
        .expect("warehouse not initialised");
    Warehouse::open(&database_url, &NoopTelemetrySink)
        .unwrap_or_else(|error| panic!("warehouse should open: {error}"))
}

#[then("{count:u64} pull request rows are inserted")]
fn assert_inserted(sync_state: &SyncState, count: u64) {
    let Some(inserted) = sync_state.inserted.get() else {
        let error = sync_state.error.with_ref(Clone::clone);
        panic!("pull request sync did not finish; last error: {error:?}");
    };
    assert_eq!(inserted, count, "unexpected inserted row count");
}

#[then("the warehouse holds {count:u64} pull request snapshots")]
fn assert_snapshots(sync_state: &SyncState, count: u64) {
    let stored = open_warehouse(sync_state)
        .count_pull_requests(REPOSITORY)
        .unwrap_or_else(|error| panic!("snapshots should be counted: {error}"));
    assert_eq!(stored, count);
}

#[then("the mock GitHub API received {count:usize} pull request page requests")]
#[expect(
    clippy::expect_used,
    reason = "integration test step; allow-expect-in-tests does not cover integration tests"
)]
fn assert_page_requests(sync_state: &SyncState, count: usize) {
    let runtime = sync_state.runtime.get().expect("runtime not initialised");
    let requests = sync_state
        .server
        .with_ref(|server| runtime.block_on(server.received_requests()))
        .expect("mock server not initialised")
        .expect("request recording should be enabled");
    let page_requests = requests
        .iter()
        .filter(|request| request.url.path() == "/repos/octo/repo/pulls")
        .count();
    assert_eq!(page_requests, count);
}

#[then("the watermark equals the run start")]
fn assert_watermark(sync_state: &SyncState) {
    let watermark = open_warehouse(sync_state)
        .get_last_success(PIPELINE)
        .unwrap_or_else(|error| panic!("watermark should be readable: {error}"));
    assert_eq!(watermark, Some(run_start()));
}

#[then("the run fails because pull requests are missing")]
fn assert_dependency_missing(sync_state: &SyncState) {
    let error = sync_state.error.with_ref(Clone::clone);
    assert!(
        matches!(error, Some(IntakeError::DependencyMissing { .. })),
        "expected a missing dependency error, got {error:?}"
    );
    assert!(sync_state.upserted.get().is_none());
}

#[then("{count:u64} review rows are upserted")]
fn assert_upserted(sync_state: &SyncState, count: u64) {
    let Some(upserted) = sync_state.upserted.get() else {
        let error = sync_state.error.with_ref(Clone::clone);
        panic!("review sync did not finish; last error: {error:?}");
    };
    assert_eq!(upserted, count);
}

#[then("the warehouse holds {count:usize} review rows")]
fn assert_review_rows(sync_state: &SyncState, count: usize) {
    let reviews = open_warehouse(sync_state)
        .reviews(REPOSITORY)
        .unwrap_or_else(|error| panic!("reviews should load: {error}"));
    assert_eq!(reviews.len(), count);
    assert!(reviews.iter().all(|row| row.pr_number == 3));
}
