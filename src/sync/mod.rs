//! Incremental sync orchestrators.
//!
//! [`pull_requests`] advances a watermark over the pulls endpoint and
//! appends snapshots; [`reviews`] re-fetches the reviews of recently
//! updated pull requests and merges them. [`entry`] wires both to a
//! configuration for the binary and external schedulers.

pub mod entry;
pub mod pull_requests;
pub mod reviews;

pub use entry::{SyncContext, run_pull_request_sync, run_review_sync};
pub use pull_requests::{
    PullRequestSync, PullRequestSyncReport, PullRequestSyncSettings, StopReason, SyncPhase,
    pull_request_pipeline,
};
pub use reviews::{ReviewSync, ReviewSyncReport, ReviewSyncSettings};

use crate::github::IntakeError;
use crate::persistence::PersistenceError;

/// Converts a failed warehouse write into the run-aborting error.
pub(crate) fn write_error(error: &PersistenceError) -> IntakeError {
    IntakeError::Write {
        message: error.to_string(),
    }
}

/// Converts a failed warehouse read into the run-aborting error.
pub(crate) fn read_error(error: &PersistenceError) -> IntakeError {
    match error {
        PersistenceError::MissingDatabaseUrl | PersistenceError::BlankDatabaseUrl => {
            IntakeError::Configuration {
                message: error.to_string(),
            }
        }
        _ => IntakeError::Io {
            message: error.to_string(),
        },
    }
}
