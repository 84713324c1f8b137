//! Change tracker - detects new activity on a GitHub repository.
//!
//! Reports open pull requests and the latest mainline commit that are newer
//! than a persisted watermark, and stores the watermark so each check only
//! reports what happened since the previous one.
//!
//! ```no_run
//! use change_tracker::{Tracker, RepositoryRef, RepoId, AccessToken};
//!
//! let repo = RepositoryRef::new(RepoId::new("recruit-tech", "walter"), AccessToken::new("token"));
//! let tracker = Tracker::new(repo, "last_update.json");
//! let report = tracker.check(|changes| {
//!     for change in changes {
//!         println!("{change}");
//!     }
//!     Ok::<_, std::io::Error>(format!("{} changes", changes.len()))
//! });
//! ```

pub mod detector;
pub mod github;
pub mod persistence;
pub mod retry;
pub mod tracker;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use detector::{DetectError, QueryStage, detect, detect_with, select_changes};
pub use persistence::WatermarkError;
pub use tracker::{CheckError, CheckReport, Tracker};
pub use types::{
    AccessToken, ChangeItem, ChangeSet, CommitChange, PullRequestChange, RepoId, RepositoryRef,
    Watermark,
};
