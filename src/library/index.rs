//! The in-memory catalog produced by a scan.
//!
//! An index is immutable once built. A rescan builds a new one and publishes
//! it through [`SharedLibrary`](super::SharedLibrary).

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use super::model::Track;

pub const UNKNOWN_GENRE: &str = "Unknown Genre";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

#[derive(Debug, Clone, Default)]
pub struct LibraryIndex {
    root: PathBuf,
    tracks: Vec<Track>,
    by_path: HashMap<PathBuf, usize>,
}

impl LibraryIndex {
    /// Build an index over `tracks`, sorted by path. Duplicate paths keep the first entry.
    pub fn new(root: PathBuf, mut tracks: Vec<Track>) -> Self {
        tracks.sort_by(|a, b| a.path.cmp(&b.path));
        tracks.dedup_by(|a, b| a.path == b.path);

        let by_path = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.path.clone(), i))
            .collect();

        Self {
            root,
            tracks,
            by_path,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn all(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&Track> {
        self.position(path).map(|i| &self.tracks[i])
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn position(&self, path: &Path) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    /// Genres present in the library, sorted. Untagged tracks show up under [`UNKNOWN_GENRE`].
    pub fn genres(&self) -> Vec<String> {
        self.tracks
            .iter()
            .map(|t| genre_of(t).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn artists(&self, genre: &str) -> Vec<String> {
        self.tracks
            .iter()
            .filter(|t| genre_of(t) == genre)
            .map(|t| artist_of(t).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn albums(&self, genre: &str, artist: &str) -> Vec<String> {
        self.tracks
            .iter()
            .filter(|t| genre_of(t) == genre && artist_of(t) == artist)
            .map(|t| album_of(t).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Tracks of one album in play order: by track number (unnumbered last),
    /// then by title ignoring case.
    pub fn album_tracks(&self, genre: &str, artist: &str, album: &str) -> Vec<&Track> {
        let mut out: Vec<&Track> = self
            .tracks
            .iter()
            .filter(|t| genre_of(t) == genre && artist_of(t) == artist && album_of(t) == album)
            .collect();
        out.sort_by(|a, b| album_order(a, b));
        out
    }
}

fn genre_of(t: &Track) -> &str {
    t.genre.as_deref().unwrap_or(UNKNOWN_GENRE)
}

fn artist_of(t: &Track) -> &str {
    t.artist.as_deref().unwrap_or(UNKNOWN_ARTIST)
}

fn album_of(t: &Track) -> &str {
    t.album.as_deref().unwrap_or(UNKNOWN_ALBUM)
}

fn album_order(a: &Track, b: &Track) -> Ordering {
    let number = |t: &Track| t.track_number.unwrap_or(u32::MAX);
    number(a)
        .cmp(&number(b))
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.path.cmp(&b.path))
}
