//! Watermark store.
//!
//! The store owns a single small JSON file per tracked repository recording
//! when the last check ran and how it ended. It holds no state between calls.
//!
//! # Crash Safety
//!
//! - Writes go to a temp file first and are renamed into place
//! - Both the file and its directory are fsynced
//! - A failed write leaves the previous watermark intact and is reported
//!
//! Concurrent writers to the same path are not coordinated; each tracker must
//! use its own file.

pub mod fsync;
pub mod watermark;

pub use fsync::{fsync_dir, fsync_file};
pub use watermark::{WatermarkError, load, load_or_initial, save};
