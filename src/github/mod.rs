//! GitHub API access for change detection.
//!
//! This module provides the octocrab-backed implementation of the two read
//! queries detection needs (open pull requests, latest mainline commit), and an
//! error type that tells the caller whether a failed query is worth retrying.
//!
//! Key features:
//! - Fresh authenticated client per detection pass
//! - Distinguishes transient vs permanent errors
//! - `ChangeSource` trait as the mockable transport seam

mod client;
mod error;
mod source;

pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind};
pub use source::{ChangeSource, RemoteCommit, RemotePullRequest};
