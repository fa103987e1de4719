//! Shared Tokio runtime helper for integration tests.
//!
//! Wiremock is async while the sync entry points block, so the mock server
//! lives on a multi-threaded runtime and the entry points run on the test
//! thread.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::runtime::Runtime;
use wiremock::MockServer;

/// Shared runtime wrapper that can be stored in an `rstest-bdd` Slot.
#[derive(Clone)]
pub struct SharedRuntime(Rc<RefCell<Runtime>>);

impl SharedRuntime {
    /// Starts a fresh multi-threaded runtime.
    ///
    /// # Panics
    ///
    /// Panics if the runtime cannot be created.
    pub fn start() -> Self {
        let runtime = Runtime::new()
            .unwrap_or_else(|error| panic!("failed to start tokio runtime: {error}"));
        Self(Rc::new(RefCell::new(runtime)))
    }

    /// Drives `future` to completion on the shared runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.0.borrow().block_on(future)
    }

    /// Starts a Wiremock server that keeps serving between `block_on` calls.
    pub fn start_server(&self) -> MockServer {
        self.block_on(MockServer::start())
    }
}
