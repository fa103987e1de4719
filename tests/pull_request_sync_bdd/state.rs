//! Scenario state for pull request sync BDD tests.

use prsync::IntakeError;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;
use wiremock::MockServer;

pub(crate) use crate::support::runtime::SharedRuntime;

#[derive(ScenarioState, Default)]
pub(crate) struct SyncState {
    pub(crate) runtime: Slot<SharedRuntime>,
    pub(crate) server: Slot<MockServer>,
    pub(crate) temp_dir: Slot<TempDir>,
    pub(crate) database_url: Slot<String>,
    pub(crate) inserted: Slot<u64>,
    pub(crate) upserted: Slot<u64>,
    pub(crate) error: Slot<IntakeError>,
}

/// Starts the runtime and mock server on first use and returns the runtime.
pub(crate) fn ensure_runtime_and_server(sync_state: &SyncState) -> SharedRuntime {
    if let Some(runtime) = sync_state.runtime.get() {
        return runtime;
    }
    let runtime = SharedRuntime::start();
    sync_state.server.set(runtime.start_server());
    sync_state.runtime.set(runtime.clone());
    runtime
}
