//! Core domain types for the change tracker.
//!
//! This module contains the identifiers, detected change items and the
//! persisted watermark record used throughout the crate.

pub mod change;
pub mod ids;
pub mod watermark;

pub use change::{ChangeItem, ChangeSet, CommitChange, PrState, PullRequestChange};
pub use ids::{AccessToken, PrNumber, RepoId, RepositoryRef, Sha};
pub use watermark::Watermark;
