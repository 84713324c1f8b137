//! Change detection.
//!
//! Given a watermark time, reports the open pull requests updated after it and
//! the latest mainline commit if it was authored after it. Comparison is
//! strictly "after": an item stamped exactly at the watermark was already seen.
//!
//! Detection never retries and never returns a partial result. A failed query
//! surfaces as [`DetectError::RemoteQueryFailed`] naming the stage, and the
//! caller decides whether to try again.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::github::{ChangeSource, GitHubApiError, OctocrabClient, RemoteCommit, RemotePullRequest};
use crate::types::{ChangeItem, ChangeSet, CommitChange, PullRequestChange, RepoId, RepositoryRef};

/// The remote query that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Building the authenticated client.
    Authenticate,
    /// Listing pull requests.
    PullRequests,
    /// Listing commit history.
    Commits,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryStage::Authenticate => "authenticate",
            QueryStage::PullRequests => "list pull requests",
            QueryStage::Commits => "list commits",
        };
        f.write_str(s)
    }
}

/// Errors that can occur during detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid repository {repo}: missing {field}")]
    InvalidRepository { repo: RepoId, field: &'static str },

    #[error("remote query failed ({stage}): {source}")]
    RemoteQueryFailed {
        stage: QueryStage,
        #[source]
        source: GitHubApiError,
    },

    #[error("repository {repo} has no commits")]
    NoCommitsFound { repo: RepoId },
}

impl DetectError {
    /// True when a later attempt may succeed without intervention.
    pub fn is_retriable(&self) -> bool {
        match self {
            DetectError::RemoteQueryFailed { source, .. } => source.is_retriable(),
            DetectError::InvalidRepository { .. } | DetectError::NoCommitsFound { .. } => false,
        }
    }

    /// The failed stage, for remote failures.
    pub fn stage(&self) -> Option<QueryStage> {
        match self {
            DetectError::RemoteQueryFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Selects the items newer than `since`.
///
/// Open pull requests updated strictly after `since` come first, in listing
/// order; the commit is appended last if its date is strictly after `since`.
pub fn select_changes(
    pull_requests: Vec<RemotePullRequest>,
    latest_commit: &RemoteCommit,
    since: DateTime<Utc>,
) -> ChangeSet {
    let mut changes = ChangeSet::new();

    for pr in pull_requests {
        if !pr.state.is_open() {
            continue;
        }
        match pr.updated_at {
            Some(updated_at) if updated_at > since => {
                changes.push(ChangeItem::PullRequest(PullRequestChange {
                    number: pr.number,
                    title: pr.title,
                    head_ref: pr.head_ref,
                    head_sha: pr.head_sha,
                    updated_at,
                }));
            }
            _ => {}
        }
    }

    match latest_commit.effective_date() {
        Some(authored_at) if authored_at > since => {
            changes.push(ChangeItem::Commit(CommitChange {
                sha: latest_commit.sha.clone(),
                message: latest_commit.message.clone(),
                authored_at,
            }));
        }
        _ => {}
    }

    changes
}

/// Runs both queries against `source` and selects the changes after `since`.
pub async fn detect_with<S: ChangeSource>(
    source: &S,
    repo: &RepoId,
    since: DateTime<Utc>,
) -> Result<ChangeSet, DetectError> {
    let pull_requests = source
        .list_pull_requests()
        .await
        .map_err(|source| DetectError::RemoteQueryFailed {
            stage: QueryStage::PullRequests,
            source,
        })?;

    let latest_commit = source
        .latest_commit()
        .await
        .map_err(|source| DetectError::RemoteQueryFailed {
            stage: QueryStage::Commits,
            source,
        })?
        .ok_or_else(|| DetectError::NoCommitsFound { repo: repo.clone() })?;

    let listed = pull_requests.len();
    let changes = select_changes(pull_requests, &latest_commit, since);

    debug!(
        repo = %repo,
        since = %since.to_rfc3339(),
        listed_prs = listed,
        head = %latest_commit.sha.short(),
        "selected changes"
    );

    Ok(changes)
}

/// Detects changes on `repo` after `since`.
///
/// Blocks the calling thread. A fresh client and a single-threaded runtime are
/// created for each call, so this must not be called from within an async
/// context; use [`detect_with`] there instead.
pub fn detect(repo: &RepositoryRef, since: DateTime<Utc>) -> Result<ChangeSet, DetectError> {
    if let Some(field) = repo.missing_field() {
        return Err(DetectError::InvalidRepository {
            repo: repo.repo.clone(),
            field,
        });
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| DetectError::RemoteQueryFailed {
            stage: QueryStage::Authenticate,
            source: GitHubApiError::permanent_without_source(format!(
                "failed to start runtime: {}",
                e
            )),
        })?;

    let changes = runtime.block_on(async {
        let client =
            OctocrabClient::from_repository(repo).map_err(|e| DetectError::RemoteQueryFailed {
                stage: QueryStage::Authenticate,
                source: GitHubApiError::from_octocrab(e),
            })?;
        detect_with(&client, &repo.repo, since).await
    })?;

    info!(
        repo = %repo.repo,
        count = changes.len(),
        "detected changes since {}",
        since.to_rfc3339()
    );

    Ok(changes)
}
