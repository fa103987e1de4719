//! Repository identity and token wrappers.

use super::error::IntakeError;

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    pub(crate) fn new(value: &str) -> Result<Self, IntakeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IntakeError::MissingPathSegments);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub(crate) fn new(value: &str) -> Result<Self, IntakeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IntakeError::MissingPathSegments);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, IntakeError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IntakeError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("PersonalAccessToken(***)")
    }
}

/// A GitHub repository addressed as `<owner>/<repo>`.
///
/// # Example
///
/// ```
/// use prsync::RepositoryLocator;
///
/// let locator = RepositoryLocator::parse("dagster-io/dagster")
///     .expect("should parse repository");
/// assert_eq!(locator.full_name(), "dagster-io/dagster");
/// assert_eq!(locator.pulls_path(), "/repos/dagster-io/dagster/pulls");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Creates a locator from separate owner and repository strings.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingPathSegments` when either part is blank.
    pub fn from_owner_repo(owner: &str, repo: &str) -> Result<Self, IntakeError> {
        Ok(Self {
            owner: RepositoryOwner::new(owner)?,
            repository: RepositoryName::new(repo)?,
        })
    }

    /// Parses an `<owner>/<repo>` string.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingPathSegments` unless the input has
    /// exactly two non-empty segments.
    pub fn parse(input: &str) -> Result<Self, IntakeError> {
        let mut segments = input.trim().trim_matches('/').split('/');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(owner), Some(repo), None) => Self::from_owner_repo(owner, repo),
            _ => Err(IntakeError::MissingPathSegments),
        }
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// The `<owner>/<repo>` form stored in the `repo` column.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.as_str(), self.repository.as_str())
    }

    /// API path listing the repository's pull requests.
    #[must_use]
    pub fn pulls_path(&self) -> String {
        format!("/repos/{}/pulls", self.full_name())
    }

    /// API path listing the reviews of one pull request.
    #[must_use]
    pub fn reviews_path(&self, pr_number: u64) -> String {
        format!("/repos/{}/pulls/{pr_number}/reviews", self.full_name())
    }
}
