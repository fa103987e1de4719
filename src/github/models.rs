//! Raw records extracted from GitHub API items.
//!
//! The warehouse keeps the full JSON payload of every item. Only the fields
//! needed for keys and filtering are decoded; the `Api`-prefixed structs are
//! the deserialisation targets for those fields.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::error::IntakeError;

/// A pull request snapshot as returned by the pulls endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestRecord {
    /// Repository-scoped pull request number.
    pub number: u64,
    /// GitHub's global pull request identifier.
    pub id: u64,
    /// Last modification time reported by GitHub.
    pub updated_at: DateTime<Utc>,
    /// Full API payload.
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequestKeys {
    number: u64,
    id: u64,
    updated_at: DateTime<Utc>,
}

impl PullRequestRecord {
    /// Decodes the key fields of a pull request item, keeping the payload.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidRecord`] when `number`, `id` or
    /// `updated_at` is missing or malformed.
    pub fn from_payload(payload: Value) -> Result<Self, IntakeError> {
        let keys = ApiPullRequestKeys::deserialize(&payload).map_err(|error| {
            IntakeError::InvalidRecord {
                entity: "pull request",
                message: error.to_string(),
            }
        })?;
        Ok(Self {
            number: keys.number,
            id: keys.id,
            updated_at: keys.updated_at,
            payload,
        })
    }
}

/// A pull request review as returned by the reviews endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    /// GitHub's review identifier.
    pub id: u64,
    /// Submission time; pending reviews have none.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Full API payload.
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
struct ApiReviewKeys {
    id: u64,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
}

impl ReviewRecord {
    /// Decodes the key fields of a review item, keeping the payload.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidRecord`] when `id` is missing or
    /// `submitted_at` is not an RFC 3339 timestamp.
    pub fn from_payload(payload: Value) -> Result<Self, IntakeError> {
        let keys =
            ApiReviewKeys::deserialize(&payload).map_err(|error| IntakeError::InvalidRecord {
                entity: "review",
                message: error.to_string(),
            })?;
        Ok(Self {
            id: keys.id,
            submitted_at: keys.submitted_at,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{PullRequestRecord, ReviewRecord};
    use crate::github::IntakeError;

    #[test]
    fn pull_request_keys_are_decoded_and_payload_kept() {
        let payload = json!({
            "id": 9001,
            "number": 42,
            "title": "Add cache",
            "updated_at": "2025-01-02T03:04:05Z"
        });

        let record = PullRequestRecord::from_payload(payload.clone()).expect("should decode");

        assert_eq!(record.number, 42);
        assert_eq!(record.id, 9001);
        assert_eq!(
            Some(record.updated_at),
            Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).single()
        );
        assert_eq!(record.payload, payload);
    }

    #[test]
    fn pull_request_without_updated_at_is_invalid() {
        let error = PullRequestRecord::from_payload(json!({"id": 1, "number": 1}))
            .expect_err("missing updated_at should fail");

        assert!(
            matches!(error, IntakeError::InvalidRecord { entity: "pull request", .. }),
            "unexpected error: {error:?}"
        );
    }

    #[test]
    fn pending_review_has_no_submission_time() {
        let explicit_null = ReviewRecord::from_payload(json!({"id": 5, "submitted_at": null}))
            .expect("null submitted_at should decode");
        let absent =
            ReviewRecord::from_payload(json!({"id": 6})).expect("absent submitted_at should decode");

        assert_eq!(explicit_null.submitted_at, None);
        assert_eq!(absent.submitted_at, None);
    }

    #[test]
    fn review_with_malformed_timestamp_is_invalid() {
        let error = ReviewRecord::from_payload(json!({"id": 5, "submitted_at": "yesterday"}))
            .expect_err("malformed timestamp should fail");

        assert!(matches!(error, IntakeError::InvalidRecord { entity: "review", .. }));
    }
}
