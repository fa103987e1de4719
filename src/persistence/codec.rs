//! Conversions between domain values and `SQLite` column values.

use chrono::{DateTime, SecondsFormat, Utc};

use super::PersistenceError;

/// Formats an instant as fixed-width RFC 3339 UTC text.
///
/// Microsecond precision and the `Z` suffix keep lexical order equal to
/// chronological order, so `ORDER BY` and `MAX` work on the text column.
pub(crate) fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(
    column: &'static str,
    text: &str,
) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(text)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|error| PersistenceError::InvalidStoredValue {
            column,
            message: format!("{text:?}: {error}"),
        })
}

/// Diesel binds `BIGINT` as `i64`; GitHub identifiers are `u64`.
pub(crate) fn to_sql_integer(field: &'static str, value: u64) -> Result<i64, PersistenceError> {
    i64::try_from(value).map_err(|_| PersistenceError::ValueOutOfRange { field, value })
}

pub(crate) fn from_sql_integer(column: &'static str, value: i64) -> Result<u64, PersistenceError> {
    u64::try_from(value).map_err(|error| PersistenceError::InvalidStoredValue {
        column,
        message: format!("{value}: {error}"),
    })
}
