//! Given steps for pull request sync behavioural tests.

use prsync::Warehouse;
use prsync::persistence::WatermarkStore;
use prsync::telemetry::NoopTelemetrySink;
use rstest_bdd_macros::given;

use crate::pull_request_sync_bdd_state::{SyncState, ensure_runtime_and_server};
use crate::support::github::{
    PIPELINE, mount_pull_request_pages, mount_reviews, pull_request_pages, updated_at_of,
};
use crate::support::{create_database_path, create_temp_dir};

#[given("an empty warehouse")]
fn empty_warehouse(sync_state: &SyncState) {
    let temp_dir = create_temp_dir();
    sync_state.database_url.set(create_database_path(&temp_dir));
    sync_state.temp_dir.set(temp_dir);
}

#[given("a warehouse whose watermark equals the updated time of item {position:u64}")]
fn warehouse_with_watermark(sync_state: &SyncState, position: u64) {
    let temp_dir = create_temp_dir();
    let database_url = create_database_path(&temp_dir);

    let mut warehouse = Warehouse::open(&database_url, &NoopTelemetrySink)
        .unwrap_or_else(|error| panic!("warehouse should open: {error}"));
    warehouse
        .set_last_success(PIPELINE, updated_at_of(position))
        .unwrap_or_else(|error| panic!("watermark should be written: {error}"));

    sync_state.database_url.set(database_url);
    sync_state.temp_dir.set(temp_dir);
}

#[given("a mock GitHub API serving {count:u64} pull requests in pages of {per_page:u64}")]
#[expect(
    clippy::expect_used,
    reason = "integration test step; allow-expect-in-tests does not cover integration tests"
)]
fn mock_pull_requests(sync_state: &SyncState, count: u64, per_page: u64) {
    let runtime = ensure_runtime_and_server(sync_state);
    sync_state
        .server
        .with_ref(|server| {
            mount_pull_request_pages(&runtime, server, pull_request_pages(count, per_page));
        })
        .expect("mock server not initialised");
}

#[given("{count:u64} reviews on pull request {pr_number:u64}")]
#[expect(
    clippy::expect_used,
    reason = "integration test step; allow-expect-in-tests does not cover integration tests"
)]
fn mock_reviews(sync_state: &SyncState, count: u64, pr_number: u64) {
    let runtime = ensure_runtime_and_server(sync_state);
    sync_state
        .server
        .with_ref(|server| mount_reviews(&runtime, server, pr_number, count))
        .expect("mock server not initialised");
}
