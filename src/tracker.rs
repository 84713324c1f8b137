//! One check cycle for one repository.
//!
//! A cycle loads the last watermark, detects changes after it, hands them to
//! the caller's handler and records the outcome:
//!
//! - detection fails: nothing is written, the previous watermark stays
//! - handler fails: the previous time is kept (so the same changes are
//!   reported again) and the failure is recorded in `status`
//! - handler succeeds: the watermark advances to the instant the cycle began
//!
//! The cycle-start instant is captured before querying, so activity landing
//! while the queries run is picked up by the next cycle rather than lost.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::detector::{self, DetectError};
use crate::persistence::{self, WatermarkError};
use crate::retry::Retriable;
use crate::types::{ChangeSet, RepositoryRef, Watermark};

/// Errors from a check cycle.
#[derive(Debug, Error)]
pub enum CheckError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    /// The handler failed. `record` holds the error from saving the failed
    /// watermark, if that save failed too; the file then still holds
    /// whatever was there before the cycle.
    #[error("change handler failed: {source}")]
    Handler {
        #[source]
        source: E,
        record: Option<WatermarkError>,
    },
}

impl<E> Retriable for CheckError<E>
where
    E: std::error::Error + 'static,
{
    fn is_retriable(&self) -> bool {
        match self {
            CheckError::Detect(e) => e.is_retriable(),
            CheckError::Watermark(_) | CheckError::Handler { .. } => false,
        }
    }
}

/// What a successful cycle saw and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// The watermark the cycle started from.
    pub previous: Watermark,
    /// The watermark now on disk.
    pub current: Watermark,
    pub changes: ChangeSet,
}

/// Watches one repository, persisting progress to one watermark file.
#[derive(Debug, Clone)]
pub struct Tracker {
    repo: RepositoryRef,
    watermark_path: PathBuf,
}

impl Tracker {
    pub fn new(repo: RepositoryRef, watermark_path: impl Into<PathBuf>) -> Self {
        Tracker {
            repo,
            watermark_path: watermark_path.into(),
        }
    }

    pub fn repo(&self) -> &RepositoryRef {
        &self.repo
    }

    pub fn watermark_path(&self) -> &Path {
        &self.watermark_path
    }

    /// The stored watermark, or the initial one if none was saved yet.
    pub fn watermark(&self) -> Result<Watermark, WatermarkError> {
        persistence::load_or_initial(&self.watermark_path)
    }

    /// Runs one cycle against GitHub.
    ///
    /// `handler` receives the new changes and returns a status line to record.
    pub fn check<F, E>(&self, handler: F) -> Result<CheckReport, CheckError<E>>
    where
        F: FnOnce(&ChangeSet) -> Result<String, E>,
        E: std::error::Error + 'static,
    {
        self.check_with(detector::detect, handler)
    }

    /// Runs one cycle with a caller-supplied detection function.
    pub fn check_with<D, F, E>(&self, detect: D, handler: F) -> Result<CheckReport, CheckError<E>>
    where
        D: FnOnce(&RepositoryRef, DateTime<Utc>) -> Result<ChangeSet, DetectError>,
        F: FnOnce(&ChangeSet) -> Result<String, E>,
        E: std::error::Error + 'static,
    {
        let previous = self.watermark()?;
        let started_at = Utc::now();

        let changes = detect(&self.repo, previous.time)?;
        info!(
            repo = %self.repo.repo,
            count = changes.len(),
            since = %previous.time.to_rfc3339(),
            newest = ?changes.latest_timestamp(),
            "check found changes"
        );

        match handler(&changes) {
            Ok(status) => {
                let current = Watermark::succeeded_at(started_at, status);
                persistence::save(&self.watermark_path, &current)?;
                Ok(CheckReport {
                    previous,
                    current,
                    changes,
                })
            }
            Err(e) => {
                let failed = Watermark::failed_at(previous.time, e.to_string());
                let record = persistence::save(&self.watermark_path, &failed).err();
                if let Some(save_err) = &record {
                    warn!(
                        repo = %self.repo.repo,
                        error = %save_err,
                        "could not record handler failure"
                    );
                }
                Err(CheckError::Handler { source: e, record })
            }
        }
    }
}
