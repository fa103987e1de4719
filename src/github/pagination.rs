//! Cursor handling for paginated GitHub collections.
//!
//! GitHub advertises the next page through the `Link` response header
//! (`<https://…&page=2>; rel="next"`). The URL is treated as opaque: the
//! client requests it verbatim and stops once a response carries no `next`
//! relation.

use serde_json::Value;

use super::error::IntakeError;

/// Opaque pointer to the next page of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    /// Extracts the `rel="next"` target from a `Link` header value.
    ///
    /// # Example
    ///
    /// ```
    /// use prsync::github::pagination::PageCursor;
    ///
    /// let header = "<https://api.github.com/x?page=2>; rel=\"next\", \
    ///               <https://api.github.com/x?page=9>; rel=\"last\"";
    /// let cursor = PageCursor::from_link_header(header).expect("next link");
    /// assert_eq!(cursor.as_str(), "https://api.github.com/x?page=2");
    /// ```
    #[must_use]
    pub fn from_link_header(header: &str) -> Option<Self> {
        header.split(',').find_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts
                .next()?
                .trim()
                .strip_prefix('<')?
                .strip_suffix('>')?
                .trim();
            parts
                .any(is_next_relation)
                .then(|| Self(target.to_owned()))
        })
    }

    /// Borrow the URL of the next page.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn is_next_relation(parameter: &str) -> bool {
    let Some((name, value)) = parameter.split_once('=') else {
        return false;
    };
    name.trim().eq_ignore_ascii_case("rel")
        && value
            .trim()
            .trim_matches('"')
            .split_whitespace()
            .any(|relation| relation.eq_ignore_ascii_case("next"))
}

/// Flattens a page body into its items.
///
/// Collection endpoints answer with a bare array, search endpoints wrap the
/// array in an object's `items` field. Both shapes become a plain list.
///
/// # Errors
///
/// Returns [`IntakeError::Api`] for any other body shape.
pub fn page_items(body: Value) -> Result<Vec<Value>, IntakeError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(IntakeError::Api {
                message: "paginated response object has no `items` array".to_owned(),
            }),
        },
        other => Err(IntakeError::Api {
            message: format!("paginated response must be a list, got {}", json_kind(&other)),
        }),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
