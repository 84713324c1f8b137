//! The two read queries the detector depends on.
//!
//! `ChangeSource` is the seam between detection logic and the transport: the
//! octocrab-backed implementation talks to GitHub, tests substitute an
//! in-memory listing.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PrNumber, PrState, Sha};

use super::client::OctocrabClient;
use super::error::GitHubApiError;

/// Page size used for the pull request listing (GitHub's maximum).
const PULLS_PER_PAGE: u8 = 100;

/// A pull request as listed by the service, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePullRequest {
    pub number: PrNumber,
    pub state: PrState,
    pub title: String,
    pub head_ref: String,
    pub head_sha: Sha,
    /// Missing timestamps never qualify as new.
    pub updated_at: Option<DateTime<Utc>>,
}

/// The head of the commit listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommit {
    pub sha: Sha,
    pub message: String,
    pub author_date: Option<DateTime<Utc>>,
    pub committer_date: Option<DateTime<Utc>>,
}

impl RemoteCommit {
    /// The date compared against the watermark: author date, falling back to
    /// the committer date when the service omits it.
    pub fn effective_date(&self) -> Option<DateTime<Utc>> {
        self.author_date.or(self.committer_date)
    }
}

/// Read access to one repository's pull requests and commit history.
///
/// # Example (fake for testing)
///
/// ```ignore
/// struct FakeSource {
///     prs: Vec<RemotePullRequest>,
///     head: Option<RemoteCommit>,
/// }
///
/// impl ChangeSource for FakeSource {
///     async fn list_pull_requests(&self) -> Result<Vec<RemotePullRequest>, GitHubApiError> {
///         Ok(self.prs.clone())
///     }
///
///     async fn latest_commit(&self) -> Result<Option<RemoteCommit>, GitHubApiError> {
///         Ok(self.head.clone())
///     }
/// }
/// ```
pub trait ChangeSource {
    /// Lists pull requests in the order the service returns them.
    fn list_pull_requests(
        &self,
    ) -> impl Future<Output = Result<Vec<RemotePullRequest>, GitHubApiError>> + Send;

    /// Returns the most recent mainline commit, or `None` if the history is empty.
    fn latest_commit(
        &self,
    ) -> impl Future<Output = Result<Option<RemoteCommit>, GitHubApiError>> + Send;
}

// ─── REST Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CommitListParams {
    per_page: u8,
}

#[derive(Debug, Deserialize)]
struct CommitListEntry {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
    author: Option<GitSignature>,
    committer: Option<GitSignature>,
}

#[derive(Debug, Deserialize)]
struct GitSignature {
    date: Option<DateTime<Utc>>,
}

impl From<CommitListEntry> for RemoteCommit {
    fn from(entry: CommitListEntry) -> Self {
        RemoteCommit {
            sha: Sha::new(entry.sha),
            message: entry.commit.message,
            author_date: entry.commit.author.and_then(|a| a.date),
            committer_date: entry.commit.committer.and_then(|c| c.date),
        }
    }
}

// ─── Octocrab Implementation ──────────────────────────────────────────────────

impl ChangeSource for OctocrabClient {
    async fn list_pull_requests(&self) -> Result<Vec<RemotePullRequest>, GitHubApiError> {
        let mut page = 1u32;
        let mut all_prs = Vec::new();

        loop {
            let result = self
                .inner()
                .pulls(self.owner(), self.repo_name())
                .list()
                .state(octocrab::params::State::Open)
                .per_page(PULLS_PER_PAGE)
                .page(page)
                .send()
                .await;

            let items = match result {
                Ok(page_result) => page_result.items,
                Err(e) => return Err(GitHubApiError::from_octocrab(e)),
            };
            let is_last_page = items.len() < usize::from(PULLS_PER_PAGE);

            for pull in items {
                // Missing or unrecognized states never qualify.
                let state = match pull.state {
                    Some(octocrab::models::IssueState::Open) => PrState::Open,
                    _ => PrState::Closed,
                };
                all_prs.push(RemotePullRequest {
                    number: PrNumber(pull.number),
                    state,
                    title: pull.title.unwrap_or_default(),
                    head_ref: pull.head.ref_field,
                    head_sha: Sha::new(pull.head.sha),
                    updated_at: pull.updated_at,
                });
            }

            if is_last_page {
                break;
            }
            page += 1;
        }

        tracing::debug!(repo = %self.repo(), count = all_prs.len(), "listed pull requests");
        Ok(all_prs)
    }

    async fn latest_commit(&self) -> Result<Option<RemoteCommit>, GitHubApiError> {
        let route = format!("/repos/{}/{}/commits", self.owner(), self.repo_name());
        let params = CommitListParams { per_page: 1 };

        let result: Result<Vec<CommitListEntry>, _> =
            self.inner().get(route, Some(&params)).await;

        match result {
            Ok(entries) => Ok(entries.into_iter().next().map(RemoteCommit::from)),
            Err(e) => {
                let err = GitHubApiError::from_octocrab(e);
                if err.is_empty_repository() {
                    tracing::debug!(repo = %self.repo(), "repository has no commits");
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn commit_entry_parses_rest_shape() {
        let json = r#"[{
            "sha": "6dcb09b5b57875f334f61aebed695e2e4193db5e",
            "commit": {
                "message": "Fix all the bugs",
                "author": {"name": "Monalisa", "email": "m@example.com", "date": "2014-03-01T00:00:00Z"},
                "committer": {"name": "Monalisa", "email": "m@example.com", "date": "2014-03-02T00:00:00Z"}
            }
        }]"#;
        let entries: Vec<CommitListEntry> = serde_json::from_str(json).unwrap();
        let commit = RemoteCommit::from(entries.into_iter().next().unwrap());
        assert_eq!(commit.sha.short(), "6dcb09b");
        assert_eq!(
            commit.effective_date(),
            Some(Utc.with_ymd_and_hms(2014, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn effective_date_falls_back_to_committer() {
        let json = r#"{
            "sha": "abc",
            "commit": {"message": "m", "author": null, "committer": {"date": "2014-03-02T00:00:00Z"}}
        }"#;
        let commit = RemoteCommit::from(serde_json::from_str::<CommitListEntry>(json).unwrap());
        assert_eq!(commit.author_date, None);
        assert_eq!(
            commit.effective_date(),
            Some(Utc.with_ymd_and_hms(2014, 3, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn commit_params_serialize_as_query() {
        let json = serde_json::to_value(CommitListParams { per_page: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"per_page": 1}));
    }
}
