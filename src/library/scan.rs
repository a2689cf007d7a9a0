use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::index::LibraryIndex;
use super::metadata::{is_audio_file, read};

#[derive(Debug, Error)]
pub enum ScanError {
    /// The root is missing, unreadable or not a directory. The published
    /// index is left as it was.
    #[error("library root {} is unavailable: {source}", root.display())]
    RootUnavailable {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("library scan was cancelled")]
    Cancelled,
}

/// What a finished scan did besides building the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Tracks in the new index.
    pub indexed: usize,
    /// Audio candidates and walk entries that could not be read.
    pub skipped: usize,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Walk `root` and build a fresh [`LibraryIndex`].
///
/// Files that fail to read are skipped; only an inaccessible root fails the scan.
/// Tracks come out in ascending path order, so an unchanged tree always yields
/// the same sequence.
pub fn scan(root: &Path, settings: &LibrarySettings) -> Result<LibraryIndex, ScanError> {
    scan_with_cancel(root, settings, &AtomicBool::new(false)).map(|(index, _)| index)
}

/// Like [`scan`], but gives up with [`ScanError::Cancelled`] once `cancel` is
/// set, and also returns what was skipped.
pub fn scan_with_cancel(
    root: &Path,
    settings: &LibrarySettings,
    cancel: &AtomicBool,
) -> Result<(LibraryIndex, ScanReport), ScanError> {
    let root = check_root(root)?;

    let mut walker = WalkDir::new(&root)
        .follow_links(settings.follow_links)
        .sort_by_file_name();

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut tracks = Vec::new();
    let mut skipped = 0usize;

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
    {
        if cancel.load(Ordering::Relaxed) {
            log::info!("scan of {} cancelled", root.display());
            return Err(ScanError::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("skipping unreadable entry: {e}");
                skipped += 1;
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !is_audio_file(path, settings) {
            continue;
        }

        match read(path, settings) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                log::debug!("skipping {}: {e}", path.display());
                skipped += 1;
            }
        }
    }

    log::info!(
        "indexed {} tracks under {} ({} skipped)",
        tracks.len(),
        root.display(),
        skipped
    );
    let index = LibraryIndex::new(root, tracks);
    let report = ScanReport {
        indexed: index.len(),
        skipped,
    };
    Ok((index, report))
}

/// Validate the root and make it absolute so track paths are usable as identities.
fn check_root(root: &Path) -> Result<PathBuf, ScanError> {
    let unavailable = |source| ScanError::RootUnavailable {
        root: root.to_path_buf(),
        source,
    };

    let root = fs::canonicalize(root).map_err(unavailable)?;
    if !root.is_dir() {
        return Err(unavailable(io::Error::new(
            io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }
    fs::read_dir(&root).map_err(unavailable)?;
    Ok(root)
}
