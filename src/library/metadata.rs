//! Tag extraction for a single audio file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::error::{ErrorKind, LoftyError};
use lofty::prelude::*;
use thiserror::Error;

use crate::config::LibrarySettings;

use super::model::Track;

/// Why a file could not be turned into a [`Track`].
///
/// None of these abort a scan; the file is skipped.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported audio file {}", path.display())]
    Unsupported { path: PathBuf },
    #[error("corrupt audio file {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    /// Track identities are persisted as TOML keys, which must be UTF-8.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },
}

impl ReadError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Unreadable { path, .. }
            | Self::Unsupported { path }
            | Self::Corrupt { path, .. }
            | Self::NonUtf8Path { path } => path,
        }
    }
}

/// Whether `path` carries one of the configured audio extensions (case-insensitive).
pub fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    extension_of(path)
        .map(|ext| {
            settings
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.'))
                .any(|e| !e.is_empty() && e.eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Read the tags of one file into a [`Track`].
///
/// Missing tags fall back to derived values: the title becomes the file stem,
/// everything else stays `None`.
pub fn read(path: &Path, settings: &LibrarySettings) -> Result<Track, ReadError> {
    if !is_audio_file(path, settings) {
        return Err(ReadError::Unsupported {
            path: path.to_path_buf(),
        });
    }

    if path.to_str().is_none() {
        return Err(ReadError::NonUtf8Path {
            path: path.to_path_buf(),
        });
    }

    let meta = fs::metadata(path).map_err(|source| ReadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    if !meta.is_file() {
        return Err(ReadError::Unreadable {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    let tagged = lofty::read_from_path(path).map_err(|e| classify(path, e))?;

    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist = None;
    let mut album = None;
    let mut genre = None;
    let mut track_number = None;

    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        if let Some(v) = non_blank(tag.title().as_deref()) {
            title = v;
        }
        artist = non_blank(tag.artist().as_deref());
        album = non_blank(tag.album().as_deref());
        genre = non_blank(tag.genre().as_deref());
        track_number = tag.track().filter(|n| *n > 0);
    }

    let duration = Some(tagged.properties().duration()).filter(|d| *d > Duration::ZERO);

    Ok(Track {
        path: path.to_path_buf(),
        title,
        artist,
        album,
        genre,
        track_number,
        duration,
        format: extension_of(path).unwrap_or_default(),
    })
}

fn non_blank(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn classify(path: &Path, err: LoftyError) -> ReadError {
    let path = path.to_path_buf();
    match err.kind() {
        ErrorKind::UnknownFormat => ReadError::Unsupported { path },
        // A short read means the container ended early: that is damage, not an I/O fault.
        ErrorKind::Io(e) if e.kind() != io::ErrorKind::UnexpectedEof => ReadError::Unreadable {
            path,
            source: io::Error::new(e.kind(), e.to_string()),
        },
        _ => ReadError::Corrupt {
            path,
            reason: err.to_string(),
        },
    }
}
