use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One audio file in the library.
///
/// `path` is the track's identity: absolute, case-sensitive, and the key used
/// by the bookmark store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<u32>,
    /// Lowercase file extension, e.g. `"flac"`.
    pub format: String,
    /// `None` until the container reports a non-zero length.
    pub duration: Option<Duration>,
}

impl Track {
    /// `"Artist - Title"`, or just the title when there is no artist.
    pub fn display(&self) -> String {
        match self.artist.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => format!("{a} - {}", self.title),
            _ => self.title.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
