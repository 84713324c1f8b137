//! Detected change items.
//!
//! A `ChangeSet` is the transient result of one detection pass: every qualifying
//! open pull request in the order the service listed them, followed by the
//! latest mainline commit if it qualified.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PrNumber, Sha};

/// The state of a pull request as reported by the remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrState {
    Open,
    Closed,
}

impl PrState {
    /// Returns true if the PR is open.
    pub fn is_open(&self) -> bool {
        matches!(self, PrState::Open)
    }
}

/// An open pull request updated after the watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestChange {
    pub number: PrNumber,
    pub title: String,
    pub head_ref: String,
    pub head_sha: Sha,
    pub updated_at: DateTime<Utc>,
}

/// The latest mainline commit, authored after the watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitChange {
    pub sha: Sha,
    pub message: String,
    pub authored_at: DateTime<Utc>,
}

impl CommitChange {
    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// A single piece of new activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeItem {
    PullRequest(PullRequestChange),
    Commit(CommitChange),
}

impl ChangeItem {
    /// The timestamp this item was compared against the watermark with.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ChangeItem::PullRequest(pr) => pr.updated_at,
            ChangeItem::Commit(c) => c.authored_at,
        }
    }

    pub fn as_pull_request(&self) -> Option<&PullRequestChange> {
        match self {
            ChangeItem::PullRequest(pr) => Some(pr),
            ChangeItem::Commit(_) => None,
        }
    }

    pub fn as_commit(&self) -> Option<&CommitChange> {
        match self {
            ChangeItem::Commit(c) => Some(c),
            ChangeItem::PullRequest(_) => None,
        }
    }
}

impl fmt::Display for ChangeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeItem::PullRequest(pr) => write!(
                f,
                "pull request {} ({}) updated {}",
                pr.number,
                pr.head_ref,
                pr.updated_at.to_rfc3339()
            ),
            ChangeItem::Commit(c) => write!(
                f,
                "commit {} authored {}",
                c.sha.short(),
                c.authored_at.to_rfc3339()
            ),
        }
    }
}

/// Ordered result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(Vec<ChangeItem>);

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet(Vec::new())
    }

    pub(crate) fn push(&mut self, item: ChangeItem) {
        self.0.push(item);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeItem> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ChangeItem] {
        &self.0
    }

    /// Pull requests in the order the service listed them.
    pub fn pull_requests(&self) -> impl Iterator<Item = &PullRequestChange> {
        self.0.iter().filter_map(ChangeItem::as_pull_request)
    }

    /// The mainline commit, if it qualified.
    pub fn commit(&self) -> Option<&CommitChange> {
        self.0.iter().find_map(ChangeItem::as_commit)
    }

    /// Newest timestamp among the items, if any.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.0.iter().map(ChangeItem::timestamp).max()
    }
}

impl IntoIterator for ChangeSet {
    type Item = ChangeItem;
    type IntoIter = std::vec::IntoIter<ChangeItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeItem;
    type IntoIter = std::slice::Iter<'a, ChangeItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
