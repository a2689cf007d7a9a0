//! On-disk copy of the last scanned library, so the catalog is browsable at
//! startup before a rescan has finished.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::write_atomic;

use super::index::LibraryIndex;
use super::model::Track;

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("library cache i/o: {0}")]
    Io(#[from] io::Error),
    #[error("library cache is malformed: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("cannot encode library cache: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("library cache version {0} is not supported")]
    Version(u32),
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    root: PathBuf,
    #[serde(default)]
    tracks: Vec<Track>,
}

/// Write `index` to `path`, replacing any previous cache atomically.
pub fn save(index: &LibraryIndex, path: &Path) -> Result<(), CacheError> {
    let file = CacheFile {
        version: CACHE_VERSION,
        root: index.root().to_path_buf(),
        tracks: index.all().to_vec(),
    };
    let text = toml::to_string(&file)?;
    write_atomic(path, text.as_bytes())?;
    log::debug!("saved {} cached tracks to {}", index.len(), path.display());
    Ok(())
}

/// Read a cache written by [`save`]. Any failure means the caller should rescan.
pub fn load(path: &Path) -> Result<LibraryIndex, CacheError> {
    let text = fs::read_to_string(path)?;
    let file: CacheFile = toml::from_str(&text)?;
    if file.version != CACHE_VERSION {
        return Err(CacheError::Version(file.version));
    }
    Ok(LibraryIndex::new(file.root, file.tracks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn track(path: &str, title: &str) -> Track {
        Track {
            path: PathBuf::from(path),
            title: title.into(),
            artist: Some("Nina".into()),
            album: None,
            genre: Some("Jazz".into()),
            track_number: Some(3),
            duration: Some(Duration::from_millis(181_500)),
            format: "flac".into(),
        }
    }

    #[test]
    fn saved_cache_restores_the_same_index() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("library.toml");
        let index = LibraryIndex::new(
            PathBuf::from("/music"),
            vec![track("/music/b.flac", "B"), track("/music/a.flac", "A")],
        );

        save(&index, &cache).unwrap();
        let restored = load(&cache).unwrap();

        assert_eq!(restored.root(), Path::new("/music"));
        assert_eq!(restored.all(), index.all());
    }

    #[test]
    fn load_rejects_garbage_and_unknown_versions() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("library.toml");

        fs::write(&cache, "this is [not toml").unwrap();
        assert!(matches!(load(&cache), Err(CacheError::Decode(_))));

        fs::write(&cache, "version = 99\nroot = \"/music\"\n").unwrap();
        assert!(matches!(load(&cache), Err(CacheError::Version(99))));

        assert!(matches!(
            load(&dir.path().join("absent.toml")),
            Err(CacheError::Io(_))
        ));
    }
}
