//! The persisted watermark record.
//!
//! # JSON Format
//!
//! ```json
//! {"time": "2014-01-01T00:00:00Z", "succeeded": true, "status": "2 changes"}
//! ```
//!
//! `time` is written as RFC 3339 and also accepted as integer UNIX seconds.
//! `succeeded` and `status` default when absent; unknown keys are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome and timing of the last check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Changes at or before this instant are considered already seen.
    #[serde(deserialize_with = "deserialize_time")]
    pub time: DateTime<Utc>,

    /// Whether the last cycle completed successfully.
    #[serde(default)]
    pub succeeded: bool,

    /// Free-form description of the last outcome.
    #[serde(default)]
    pub status: String,
}

impl Watermark {
    /// The first-run watermark: epoch time, so everything qualifies.
    pub fn initial() -> Self {
        Watermark {
            time: DateTime::UNIX_EPOCH,
            succeeded: false,
            status: String::new(),
        }
    }

    pub fn succeeded_at(time: DateTime<Utc>, status: impl Into<String>) -> Self {
        Watermark {
            time,
            succeeded: true,
            status: status.into(),
        }
    }

    pub fn failed_at(time: DateTime<Utc>, status: impl Into<String>) -> Self {
        Watermark {
            time,
            succeeded: false,
            status: status.into(),
        }
    }

    /// True for the first-run watermark (or any at/before the epoch).
    pub fn is_initial(&self) -> bool {
        self.time <= DateTime::UNIX_EPOCH
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Rfc3339(DateTime<Utc>),
    EpochSeconds(i64),
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTime::deserialize(deserializer)? {
        RawTime::Rfc3339(t) => Ok(t),
        RawTime::EpochSeconds(secs) => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", secs))),
    }
}
