//! Newtype wrappers for repository identifiers and credentials.
//!
//! These types prevent accidental mixing of different ID types (e.g., passing a
//! commit SHA where a branch name is expected) and keep the access token out of
//! debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pull request number within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrNumber(pub u64);

impl fmt::Display for PrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for PrNumber {
    fn from(n: u64) -> Self {
        PrNumber(n)
    }
}

/// A git commit SHA.
///
/// Not validated: the remote service is trusted to return well-formed object ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(pub String);

impl Sha {
    pub fn new(s: impl Into<String>) -> Self {
        Sha(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Sha {
    fn from(s: String) -> Self {
        Sha(s)
    }
}

impl From<&str> for Sha {
    fn from(s: &str) -> Self {
        Sha(s.to_string())
    }
}

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Parses `owner/repo`. Returns `None` unless both halves are non-empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (owner, repo) = s.trim().split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(RepoId::new(owner, repo))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// An opaque bearer credential for the remote service.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Everything needed to query one remote repository.
///
/// Deserializes from the pipeline configuration keys `repository` (name),
/// `from` (owner) and `token`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawRepositoryRef")]
pub struct RepositoryRef {
    pub repo: RepoId,
    pub token: AccessToken,
}

#[derive(Deserialize)]
struct RawRepositoryRef {
    repository: String,
    from: String,
    token: AccessToken,
}

impl From<RawRepositoryRef> for RepositoryRef {
    fn from(raw: RawRepositoryRef) -> Self {
        RepositoryRef {
            repo: RepoId::new(raw.from, raw.repository),
            token: raw.token,
        }
    }
}

impl RepositoryRef {
    pub fn new(repo: RepoId, token: AccessToken) -> Self {
        RepositoryRef { repo, token }
    }

    /// Returns a description of the first missing field, if any.
    ///
    /// The token is only checked for presence; whether the service accepts it
    /// is discovered on the first query.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.repo.owner.trim().is_empty() {
            Some("owner")
        } else if self.repo.repo.trim().is_empty() {
            Some("repository name")
        } else if self.token.is_empty() {
            Some("access token")
        } else {
            None
        }
    }
}
