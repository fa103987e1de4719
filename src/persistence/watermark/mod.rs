//! Watermark persistence in the `ingest_state` table.
//!
//! Every successful run appends a row; the newest row for a pipeline is its
//! current watermark. Rows are never updated, so the table doubles as a run
//! history. The table is created on first use rather than by a migration so
//! that a warehouse shared with other pipelines gains it lazily.

use chrono::{DateTime, Utc};
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{Nullable, Text};
use diesel::sqlite::SqliteConnection;

use super::codec::{format_timestamp, parse_timestamp};
use super::stores::WatermarkStore;
use super::{PersistenceError, Warehouse};

const ENSURE_STATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS ingest_state ( \
     id INTEGER PRIMARY KEY AUTOINCREMENT, \
     pipeline TEXT NOT NULL, \
     last_success_ts TEXT, \
     updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP \
     );";

/// One row of a pipeline's watermark history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkEntry {
    /// Recorded watermark; absent when the row stores `NULL`.
    pub last_success: Option<DateTime<Utc>>,
    /// `SQLite` `CURRENT_TIMESTAMP` text of when the row was written.
    pub recorded_at: String,
}

#[derive(Debug, QueryableByName)]
struct StateRow {
    #[diesel(sql_type = Nullable<Text>)]
    last_success_ts: Option<String>,
    #[diesel(sql_type = Text)]
    updated_at: String,
}

impl StateRow {
    fn last_success(&self) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        self.last_success_ts
            .as_deref()
            .map(|text| parse_timestamp("last_success_ts", text))
            .transpose()
    }
}

fn ensure_state_table(connection: &mut SqliteConnection) -> Result<(), PersistenceError> {
    sql_query(ENSURE_STATE_TABLE)
        .execute(connection)
        .map(drop)
        .map_err(|error| PersistenceError::StateTableFailed {
            message: error.to_string(),
        })
}

impl Warehouse {
    /// Returns every watermark written for `pipeline`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the table cannot be read or holds an
    /// undecodable timestamp.
    pub fn watermark_history(
        &mut self,
        pipeline: &str,
    ) -> Result<Vec<WatermarkEntry>, PersistenceError> {
        let connection = self.connection();
        ensure_state_table(connection)?;

        let rows: Vec<StateRow> = sql_query(
            "SELECT last_success_ts, updated_at FROM ingest_state \
             WHERE pipeline = ? ORDER BY id ASC;",
        )
        .bind::<Text, _>(pipeline)
        .load(connection)
        .map_err(|error| PersistenceError::QueryFailed {
            message: error.to_string(),
        })?;

        rows.into_iter()
            .map(|row| {
                Ok(WatermarkEntry {
                    last_success: row.last_success()?,
                    recorded_at: row.updated_at,
                })
            })
            .collect()
    }
}

impl WatermarkStore for Warehouse {
    fn get_last_success(
        &mut self,
        pipeline: &str,
    ) -> Result<Option<DateTime<Utc>>, PersistenceError> {
        let connection = self.connection();
        ensure_state_table(connection)?;

        // Write order, not timestamp order, decides the current watermark.
        let row: Option<StateRow> = sql_query(
            "SELECT last_success_ts, updated_at FROM ingest_state \
             WHERE pipeline = ? ORDER BY id DESC LIMIT 1;",
        )
        .bind::<Text, _>(pipeline)
        .get_result(connection)
        .optional()
        .map_err(|error| PersistenceError::QueryFailed {
            message: error.to_string(),
        })?;

        row.map_or(Ok(None), |found| found.last_success())
    }

    fn set_last_success(
        &mut self,
        pipeline: &str,
        instant: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let connection = self.connection();
        ensure_state_table(connection)?;

        sql_query("INSERT INTO ingest_state (pipeline, last_success_ts) VALUES (?, ?);")
            .bind::<Text, _>(pipeline)
            .bind::<Text, _>(format_timestamp(instant))
            .execute(connection)
            .map(drop)
            .map_err(|error| PersistenceError::WriteFailed {
                message: error.to_string(),
            })
    }
}
