use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last known position of one track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRecord {
    /// Seconds from the start of the track.
    pub offset_secs: f64,
    pub updated_at: DateTime<Utc>,
}

impl PlaybackRecord {
    pub fn now(offset_secs: f64) -> Self {
        Self {
            offset_secs,
            updated_at: Utc::now(),
        }
    }
}

/// Layout of the bookmark file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(super) struct BookmarkFile {
    pub version: u32,
    /// Runtime toggle; absent until the user flips it.
    pub enabled: Option<bool>,
    pub last_track: Option<PathBuf>,
    pub records: BTreeMap<PathBuf, PlaybackRecord>,
}
