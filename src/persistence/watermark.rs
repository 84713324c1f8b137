//! Watermark persistence.
//!
//! # Atomic Writes
//!
//! Watermarks are written using a write-to-temp-then-rename pattern:
//! 1. Write to `<file name>.tmp` in the same directory
//! 2. fsync the temp file
//! 3. Rename over the target
//! 4. fsync the directory
//!
//! A reader therefore sees either the previous watermark or the new one, never
//! a torn write. Nothing is cached: every load and save goes to disk.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::fsync::{fsync_dir, fsync_file, parent_dir};
use crate::types::Watermark;

/// Errors that can occur during watermark operations.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// No watermark has been saved yet. Callers treat this as a first run.
    #[error("no watermark at {}", .path.display())]
    NotFound { path: PathBuf },

    /// The file exists but does not hold a watermark.
    #[error("watermark at {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file exists but could not be read.
    #[error("failed to read watermark at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The new watermark was not durably written.
    ///
    /// A failure before the rename leaves the previous file intact. A failure
    /// syncing the directory after the rename leaves the new content in place,
    /// but it may not survive a crash.
    #[error("failed to write watermark to {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WatermarkError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WatermarkError::NotFound { .. })
    }
}

/// Result type for watermark operations.
pub type Result<T> = std::result::Result<T, WatermarkError>;

/// Loads the watermark stored at `path`.
///
/// # Errors
///
/// - `NotFound` if nothing has been saved at `path`
/// - `Corrupt` if the contents are not a watermark (never silently reset)
/// - `Read` for any other I/O failure
pub fn load(path: &Path) -> Result<Watermark> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(WatermarkError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(WatermarkError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let watermark: Watermark =
        serde_json::from_slice(&bytes).map_err(|source| WatermarkError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        path = %path.display(),
        time = %watermark.time.to_rfc3339(),
        succeeded = watermark.succeeded,
        "loaded last watermark"
    );
    Ok(watermark)
}

/// Loads the watermark at `path`, substituting [`Watermark::initial`] on first run.
///
/// Only `NotFound` is replaced; corruption and read failures are propagated.
pub fn load_or_initial(path: &Path) -> Result<Watermark> {
    match load(path) {
        Ok(watermark) => Ok(watermark),
        Err(WatermarkError::NotFound { .. }) => {
            info!(path = %path.display(), "no previous watermark, starting from epoch");
            Ok(Watermark::initial())
        }
        Err(e) => Err(e),
    }
}

/// Saves `watermark` to `path`, replacing any previous content atomically.
///
/// The parent directory must already exist.
///
/// # Errors
///
/// Returns `WriteFailed` if any step fails, and the temp file is removed.
/// Up to and including the rename, the previous watermark is left untouched.
/// Only the final directory sync can fail after the new content is already
/// visible at `path`.
pub fn save(path: &Path, watermark: &Watermark) -> Result<()> {
    let write_failed = |source: io::Error| WatermarkError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let tmp_path = temp_path(path).ok_or_else(|| {
        write_failed(io::Error::new(
            io::ErrorKind::InvalidInput,
            "watermark path has no file name",
        ))
    })?;
    let bytes = serde_json::to_vec(watermark).map_err(|e| write_failed(io::Error::other(e)))?;

    if let Err(e) = write_and_rename(path, &tmp_path, &bytes) {
        match fs::remove_file(&tmp_path) {
            Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                warn!(path = %tmp_path.display(), error = %cleanup, "failed to remove temp watermark");
            }
            _ => {}
        }
        return Err(write_failed(e));
    }

    info!(
        path = %path.display(),
        time = %watermark.time.to_rfc3339(),
        succeeded = watermark.succeeded,
        "saved watermark"
    );
    Ok(())
}

fn write_and_rename(path: &Path, tmp_path: &Path, bytes: &[u8]) -> io::Result<()> {
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(tmp_path)?;
        file.write_all(bytes)?;
        fsync_file(&file)?;
    }

    fs::rename(tmp_path, path)?;
    debug!(path = %path.display(), "renamed temp watermark into place");

    fsync_dir(parent_dir(path))
}

/// `<dir>/<file name>.tmp`, next to the target so the rename stays on one filesystem.
fn temp_path(path: &Path) -> Option<PathBuf> {
    let mut name = path.file_name()?.to_os_string();
    name.push(".tmp");
    Some(path.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::arb_watermark;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn sample() -> Watermark {
        Watermark::succeeded_at(Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap(), "2 changes")
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_update.json");

        save(&path, &sample()).unwrap();
        assert_eq!(load(&path).unwrap(), sample());
    }

    #[test]
    fn save_replaces_previous_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_update.json");

        save(&path, &sample()).unwrap();
        let newer = Watermark::failed_at(Utc.with_ymd_and_hms(2015, 6, 1, 12, 0, 0).unwrap(), "x");
        save(&path, &newer).unwrap();

        assert_eq!(load(&path).unwrap(), newer);
        assert!(!dir.path().join("last_update.json.tmp").exists());
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.is_not_found(), "got {err}");
    }

    #[test]
    fn load_or_initial_substitutes_epoch_only_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert_eq!(load_or_initial(&path).unwrap(), Watermark::initial());

        fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            load_or_initial(&path),
            Err(WatermarkError::Corrupt { .. })
        ));
    }

    #[test]
    fn load_invalid_content_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_update.json");

        let contents: [&[u8]; 5] = [
            b"",
            b"{",
            b"[]",
            b"{\"succeeded\": true}",
            b"{\"time\": \"soon\"}",
        ];
        for content in contents {
            fs::write(&path, content).unwrap();
            let err = load(&path).unwrap_err();
            assert!(matches!(err, WatermarkError::Corrupt { .. }), "got {err}");
        }
    }

    #[test]
    fn load_directory_is_read_error() {
        let dir = tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, WatermarkError::Read { .. }), "got {err}");
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("last_update.json");

        let err = save(&path, &sample()).unwrap_err();
        assert!(matches!(err, WatermarkError::WriteFailed { .. }), "got {err}");
        assert!(!path.exists());
    }

    #[test]
    fn save_under_a_regular_file_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();

        let err = save(&blocker.join("last_update.json"), &sample()).unwrap_err();
        assert!(matches!(err, WatermarkError::WriteFailed { .. }), "got {err}");
    }

    #[test]
    fn failed_save_keeps_previous_watermark() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_update.json");
        save(&path, &sample()).unwrap();

        // A directory squatting on the temp name makes the temp write fail.
        fs::create_dir(dir.path().join("last_update.json.tmp")).unwrap();
        let newer = Watermark::succeeded_at(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(), "");
        assert!(save(&path, &newer).is_err());

        assert_eq!(load(&path).unwrap(), sample());
    }

    #[test]
    fn failed_rename_removes_temp_and_keeps_target() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_update.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let err = save(&path, &sample()).unwrap_err();
        assert!(matches!(err, WatermarkError::WriteFailed { .. }), "got {err}");
        assert!(!dir.path().join("last_update.json.tmp").exists());
        assert_eq!(fs::read(path.join("keep")).unwrap(), b"x");
    }

    #[test]
    fn save_without_file_name_fails() {
        let err = save(Path::new("/"), &sample()).unwrap_err();
        assert!(matches!(err, WatermarkError::WriteFailed { .. }));
    }

    #[test]
    fn written_file_matches_documented_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last_update.json");
        save(&path, &sample()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"time": "2014-01-01T00:00:00Z", "succeeded": true, "status": "2 changes"})
        );
    }

    proptest! {
        #[test]
        fn roundtrip_law(watermark in arb_watermark()) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("last_update.json");
            save(&path, &watermark).unwrap();
            prop_assert_eq!(load(&path).unwrap(), watermark);
        }
    }
}
