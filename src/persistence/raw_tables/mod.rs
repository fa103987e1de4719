//! Raw-layer tables for pull request snapshots and reviews.
//!
//! `github_pull_requests` is an append-only log: every run inserts a new row
//! per observed snapshot and downstream models deduplicate. Reviews are keyed
//! on `(repo, review_id)` and merged, so reruns converge on one row per
//! review carrying the latest payload.

use chrono::{DateTime, Utc};
use diesel::Connection;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel::sqlite::SqliteConnection;
use serde_json::Value;

use crate::github::{PullRequestRecord, ReviewRecord};

use super::codec::{format_timestamp, from_sql_integer, parse_timestamp, to_sql_integer};
use super::stores::{PullRequestSink, ReviewSink};
use super::{PersistenceError, Warehouse};

const ENSURE_REVIEW_STAGING: &str = "CREATE TEMP TABLE IF NOT EXISTS tmp_github_reviews ( \
     repo TEXT NOT NULL, \
     pr_number BIGINT, \
     review_id BIGINT NOT NULL, \
     submitted_at TEXT, \
     payload TEXT \
     );";

const MERGE_STAGED_REVIEWS: &str = "INSERT INTO github_pull_request_reviews \
     (repo, pr_number, review_id, submitted_at, ingested_at, payload) \
     SELECT repo, pr_number, review_id, submitted_at, ?, payload \
     FROM tmp_github_reviews WHERE true \
     ON CONFLICT(repo, review_id) DO UPDATE SET \
       pr_number = excluded.pr_number, \
       submitted_at = excluded.submitted_at, \
       payload = excluded.payload, \
       ingested_at = excluded.ingested_at;";

/// A stored pull request snapshot row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPullRequest {
    /// Pull request number.
    pub pr_number: u64,
    /// GitHub pull request identifier.
    pub pr_id: u64,
    /// Snapshot's `updated_at`.
    pub updated_at: DateTime<Utc>,
    /// When the row was written.
    pub ingested_at: DateTime<Utc>,
    /// Full API payload.
    pub payload: Value,
}

/// A stored review row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReview {
    /// Pull request the review belongs to.
    pub pr_number: u64,
    /// GitHub review identifier.
    pub review_id: u64,
    /// Submission time; absent for pending reviews.
    pub submitted_at: Option<DateTime<Utc>>,
    /// When the row was last merged.
    pub ingested_at: DateTime<Utc>,
    /// Full API payload from the latest merge.
    pub payload: Value,
}

fn encode_payload(payload: &Value) -> Result<String, PersistenceError> {
    serde_json::to_string(payload).map_err(|error| PersistenceError::WriteFailed {
        message: format!("payload is not serialisable: {error}"),
    })
}

fn decode_payload(text: &str) -> Result<Value, PersistenceError> {
    serde_json::from_str(text).map_err(|error| PersistenceError::InvalidStoredValue {
        column: "payload",
        message: error.to_string(),
    })
}

fn query_failed(error: &diesel::result::Error) -> PersistenceError {
    PersistenceError::QueryFailed {
        message: error.to_string(),
    }
}

fn insert_pull_request(
    connection: &mut SqliteConnection,
    repo: &str,
    record: &PullRequestRecord,
    ingested_at: &str,
) -> Result<(), PersistenceError> {
    sql_query(
        "INSERT INTO github_pull_requests \
         (repo, pr_number, pr_id, updated_at, ingested_at, payload) \
         VALUES (?, ?, ?, ?, ?, ?);",
    )
    .bind::<Text, _>(repo)
    .bind::<BigInt, _>(to_sql_integer("pr_number", record.number)?)
    .bind::<BigInt, _>(to_sql_integer("pr_id", record.id)?)
    .bind::<Text, _>(format_timestamp(record.updated_at))
    .bind::<Text, _>(ingested_at)
    .bind::<Text, _>(encode_payload(&record.payload)?)
    .execute(connection)
    .map(drop)
    .map_err(|error| PersistenceError::WriteFailed {
        message: format!("pull request #{}: {error}", record.number),
    })
}

/// Distinct review keys in the staging table; a page shift can repeat one.
fn count_staged_reviews(connection: &mut SqliteConnection) -> Result<u64, PersistenceError> {
    #[derive(Debug, QueryableByName)]
    struct Row {
        #[diesel(sql_type = BigInt)]
        staged: i64,
    }

    let row: Row =
        sql_query("SELECT COUNT(DISTINCT review_id) AS staged FROM tmp_github_reviews;")
            .get_result(connection)
            .map_err(|error| query_failed(&error))?;
    from_sql_integer("staged", row.staged)
}

fn stage_review(
    connection: &mut SqliteConnection,
    repo: &str,
    pr_number: i64,
    review: &ReviewRecord,
) -> Result<(), PersistenceError> {
    sql_query(
        "INSERT INTO tmp_github_reviews (repo, pr_number, review_id, submitted_at, payload) \
         VALUES (?, ?, ?, ?, ?);",
    )
    .bind::<Text, _>(repo)
    .bind::<BigInt, _>(pr_number)
    .bind::<BigInt, _>(to_sql_integer("review_id", review.id)?)
    .bind::<Nullable<Text>, _>(review.submitted_at.map(format_timestamp))
    .bind::<Text, _>(encode_payload(&review.payload)?)
    .execute(connection)
    .map(drop)
    .map_err(|error| PersistenceError::WriteFailed {
        message: format!("staging review {}: {error}", review.id),
    })
}

fn row_count(rows: usize) -> u64 {
    u64::try_from(rows).unwrap_or(u64::MAX)
}

impl PullRequestSink for Warehouse {
    fn insert_pull_requests(
        &mut self,
        repo: &str,
        batch: &[PullRequestRecord],
        ingested_at: DateTime<Utc>,
    ) -> Result<u64, PersistenceError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let ingested = format_timestamp(ingested_at);
        self.connection()
            .transaction::<_, PersistenceError, _>(|connection| {
                for record in batch {
                    insert_pull_request(connection, repo, record, &ingested)?;
                }
                Ok(row_count(batch.len()))
            })
    }
}

impl ReviewSink for Warehouse {
    fn recent_pull_request_numbers(
        &mut self,
        repo: &str,
        limit: u32,
    ) -> Result<Vec<u64>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            pr_number: i64,
        }

        let rows: Vec<Row> = sql_query(
            "SELECT pr_number FROM github_pull_requests \
             WHERE repo = ? AND pr_number IS NOT NULL \
             GROUP BY pr_number \
             ORDER BY MAX(updated_at) DESC, pr_number DESC \
             LIMIT ?;",
        )
        .bind::<Text, _>(repo)
        .bind::<BigInt, _>(i64::from(limit))
        .load(self.connection())
        .map_err(|error| query_failed(&error))?;

        rows.into_iter()
            .map(|row| from_sql_integer("pr_number", row.pr_number))
            .collect()
    }

    fn upsert_reviews(
        &mut self,
        repo: &str,
        pr_number: u64,
        reviews: &[ReviewRecord],
        ingested_at: DateTime<Utc>,
    ) -> Result<u64, PersistenceError> {
        if reviews.is_empty() {
            return Ok(0);
        }

        let pr_number_sql = to_sql_integer("pr_number", pr_number)?;
        let ingested = format_timestamp(ingested_at);
        self.connection()
            .transaction::<_, PersistenceError, _>(|connection| {
                sql_query(ENSURE_REVIEW_STAGING).execute(connection)?;
                sql_query("DELETE FROM tmp_github_reviews;").execute(connection)?;

                for review in reviews {
                    stage_review(connection, repo, pr_number_sql, review)?;
                }
                let staged_review_count = count_staged_reviews(connection)?;

                sql_query(MERGE_STAGED_REVIEWS)
                    .bind::<Text, _>(ingested.as_str())
                    .execute(connection)
                    .map_err(|error| PersistenceError::WriteFailed {
                        message: format!("merging reviews of #{pr_number}: {error}"),
                    })?;

                Ok(staged_review_count)
            })
    }
}

impl Warehouse {
    /// Counts pull request snapshot rows stored for `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::QueryFailed`] when the query fails.
    pub fn count_pull_requests(&mut self, repo: &str) -> Result<u64, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            count: i64,
        }

        let row: Row =
            sql_query("SELECT COUNT(*) AS count FROM github_pull_requests WHERE repo = ?;")
                .bind::<Text, _>(repo)
                .get_result(self.connection())
                .map_err(|error| query_failed(&error))?;

        from_sql_integer("count", row.count)
    }

    /// Loads the pull request snapshots stored for `repo` in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails or a row cannot be
    /// decoded.
    pub fn pull_requests(&mut self, repo: &str) -> Result<Vec<StoredPullRequest>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            pr_number: i64,
            #[diesel(sql_type = BigInt)]
            pr_id: i64,
            #[diesel(sql_type = Text)]
            updated_at: String,
            #[diesel(sql_type = Text)]
            ingested_at: String,
            #[diesel(sql_type = Text)]
            payload: String,
        }

        let rows: Vec<Row> = sql_query(
            "SELECT pr_number, pr_id, updated_at, ingested_at, payload \
             FROM github_pull_requests WHERE repo = ? ORDER BY id ASC;",
        )
        .bind::<Text, _>(repo)
        .load(self.connection())
        .map_err(|error| query_failed(&error))?;

        rows.into_iter()
            .map(|row| {
                Ok(StoredPullRequest {
                    pr_number: from_sql_integer("pr_number", row.pr_number)?,
                    pr_id: from_sql_integer("pr_id", row.pr_id)?,
                    updated_at: parse_timestamp("updated_at", &row.updated_at)?,
                    ingested_at: parse_timestamp("ingested_at", &row.ingested_at)?,
                    payload: decode_payload(&row.payload)?,
                })
            })
            .collect()
    }

    /// Loads the reviews stored for `repo`, ordered by pull request then
    /// review identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the query fails or a row cannot be
    /// decoded.
    pub fn reviews(&mut self, repo: &str) -> Result<Vec<StoredReview>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            pr_number: i64,
            #[diesel(sql_type = BigInt)]
            review_id: i64,
            #[diesel(sql_type = Nullable<Text>)]
            submitted_at: Option<String>,
            #[diesel(sql_type = Text)]
            ingested_at: String,
            #[diesel(sql_type = Text)]
            payload: String,
        }

        let rows: Vec<Row> = sql_query(
            "SELECT pr_number, review_id, submitted_at, ingested_at, payload \
             FROM github_pull_request_reviews WHERE repo = ? \
             ORDER BY pr_number ASC, review_id ASC;",
        )
        .bind::<Text, _>(repo)
        .load(self.connection())
        .map_err(|error| query_failed(&error))?;

        rows.into_iter()
            .map(|row| {
                Ok(StoredReview {
                    pr_number: from_sql_integer("pr_number", row.pr_number)?,
                    review_id: from_sql_integer("review_id", row.review_id)?,
                    submitted_at: row
                        .submitted_at
                        .as_deref()
                        .map(|text| parse_timestamp("submitted_at", text))
                        .transpose()?,
                    ingested_at: parse_timestamp("ingested_at", &row.ingested_at)?,
                    payload: decode_payload(&row.payload)?,
                })
            })
            .collect()
    }
}
