//! Warehouse persistence and database migrations.
//!
//! The raw layer lives in a `SQLite` database managed with Diesel
//! migrations. [`Warehouse`] owns the connection for one sync run and
//! implements the store traits the orchestrators write through: the
//! watermark log, the append-only pull request table and the keyed review
//! table.

mod codec;
mod error;
mod migrator;
mod raw_tables;
mod stores;
mod warehouse;
mod watermark;

pub use error::PersistenceError;
pub use migrator::{RAW_TABLES_SCHEMA_VERSION, SchemaVersion, migrate_database};
pub use raw_tables::{StoredPullRequest, StoredReview};
pub use stores::{PullRequestSink, ReviewSink, WatermarkStore};
#[cfg(test)]
pub(crate) use stores::MockReviewSink;
pub use warehouse::Warehouse;
pub use watermark::WatermarkEntry;
