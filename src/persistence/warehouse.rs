//! Connection owner for the warehouse raw layer.

use diesel::sqlite::SqliteConnection;

use crate::telemetry::TelemetrySink;

use super::PersistenceError;
use super::migrator::{establish, run_migrations};

/// A migrated `SQLite` warehouse holding one connection for a sync run.
///
/// The store traits in [`super::stores`] are implemented on this type, so
/// one value serves as watermark store and raw-table sink together.
pub struct Warehouse {
    connection: SqliteConnection,
}

impl std::fmt::Debug for Warehouse {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("Warehouse").finish_non_exhaustive()
    }
}

impl Warehouse {
    /// Connects to `database_url` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the URL is blank, the connection
    /// fails, or migrations cannot be applied.
    pub fn open(
        database_url: &str,
        telemetry: &dyn TelemetrySink,
    ) -> Result<Self, PersistenceError> {
        let mut connection = establish(database_url)?;
        run_migrations(&mut connection, telemetry)?;
        Ok(Self { connection })
    }

    pub(super) const fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.connection
    }
}
