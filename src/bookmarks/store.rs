use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::BookmarkSettings;
use crate::persist::write_atomic;

use super::record::{BookmarkFile, PlaybackRecord};

const FILE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bookmark store i/o: {0}")]
    Io(#[from] io::Error),
    #[error("bookmark store is malformed: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("cannot encode bookmarks: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// How a [`BookmarkStore`] is opened.
#[derive(Debug, Clone)]
pub struct BookmarkOptions {
    pub path: PathBuf,
    /// Initial state of the bookmarking toggle, used until one is persisted.
    pub enabled: bool,
    /// Minimum time between two throttled writes.
    pub flush_interval: Duration,
}

impl BookmarkOptions {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
            flush_interval: Duration::from_secs(5),
        }
    }

    /// `None` when no store path is configured and no state directory can be found.
    pub fn from_settings(settings: &BookmarkSettings) -> Option<Self> {
        settings.resolved_store_path().map(|path| Self {
            path,
            enabled: settings.enabled,
            flush_interval: Duration::from_secs(settings.flush_interval_secs),
        })
    }
}

#[derive(Debug)]
struct State {
    enabled: bool,
    /// The toggle has been set at runtime and must be written out.
    toggled: bool,
    records: BTreeMap<PathBuf, PlaybackRecord>,
    last_track: Option<PathBuf>,
    dirty: bool,
    last_write: Option<Instant>,
}

/// Durable map of track path → last playback offset.
///
/// All access goes through one mutex, so a timer thread calling
/// [`update`](Self::update) and a UI thread calling [`commit`](Self::commit)
/// never interleave their writes. The file is always replaced atomically.
#[derive(Debug)]
pub struct BookmarkStore {
    path: PathBuf,
    flush_interval: Duration,
    state: Mutex<State>,
}

impl BookmarkStore {
    /// Open the store at `options.path`.
    ///
    /// A missing file gives an empty store. So does a corrupt one: the problem
    /// is logged and the next commit overwrites it.
    pub fn open(options: BookmarkOptions) -> Self {
        let file = match Self::load(&options.path) {
            Ok(file) => file,
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                BookmarkFile::default()
            }
            Err(e) => {
                log::warn!(
                    "ignoring unreadable bookmark store {}: {e}",
                    options.path.display()
                );
                BookmarkFile::default()
            }
        };

        log::debug!(
            "loaded {} bookmarks from {}",
            file.records.len(),
            options.path.display()
        );

        Self {
            path: options.path,
            flush_interval: options.flush_interval,
            state: Mutex::new(State {
                enabled: file.enabled.unwrap_or(options.enabled),
                toggled: file.enabled.is_some(),
                records: file.records,
                last_track: file.last_track,
                dirty: false,
                last_write: None,
            }),
        }
    }

    /// Read the bookmark file as it is on disk.
    fn load(path: &Path) -> Result<BookmarkFile, StoreError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    /// Turn bookmarking on or off. Records are kept either way, and the toggle
    /// itself is persisted immediately.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state();
        if state.enabled == enabled && state.toggled {
            return;
        }
        state.enabled = enabled;
        state.toggled = true;
        state.dirty = true;
        if let Err(e) = self.write(&mut state) {
            log::warn!("failed to persist bookmarking toggle: {e}");
        }
    }

    /// Stored offset for `track` in seconds. `None` when there is no record or
    /// bookmarking is off.
    pub fn get(&self, track: &Path) -> Option<f64> {
        self.record(track).map(|r| r.offset_secs)
    }

    pub fn record(&self, track: &Path) -> Option<PlaybackRecord> {
        let state = self.state();
        if !state.enabled {
            return None;
        }
        state.records.get(track).copied()
    }

    /// Every stored record, sorted by path. Includes records kept while disabled.
    pub fn records(&self) -> Vec<(PathBuf, PlaybackRecord)> {
        self.state()
            .records
            .iter()
            .map(|(p, r)| (p.clone(), *r))
            .collect()
    }

    /// The track that was playing when a bookmark was last taken.
    pub fn last_track(&self) -> Option<PathBuf> {
        let state = self.state();
        if !state.enabled {
            return None;
        }
        state.last_track.clone()
    }

    /// Record the position of a playing track.
    ///
    /// The value is kept in memory right away but written at most once per
    /// flush interval; the first update after opening writes immediately.
    pub fn update(&self, track: &Path, offset_secs: f64) {
        let mut state = self.state();
        if !Self::remember(&mut state, track, offset_secs) {
            return;
        }
        let due = state
            .last_write
            .is_none_or(|at| at.elapsed() >= self.flush_interval);
        if due {
            if let Err(e) = self.write(&mut state) {
                log::warn!("failed to write bookmarks: {e}");
            }
        }
    }

    /// Record a position and write it out now, ignoring the throttle.
    ///
    /// Used on pause, stop, seek and track changes.
    pub fn commit(&self, track: &Path, offset_secs: f64) {
        let mut state = self.state();
        if !Self::remember(&mut state, track, offset_secs) {
            return;
        }
        if let Err(e) = self.write(&mut state) {
            log::warn!("failed to commit bookmark for {}: {e}", track.display());
        }
    }

    /// Drop the record for `track`, e.g. once it played to the end.
    pub fn clear(&self, track: &Path) {
        let mut state = self.state();
        if !state.enabled || state.records.remove(track).is_none() {
            return;
        }
        if state.last_track.as_deref() == Some(track) {
            state.last_track = None;
        }
        state.dirty = true;
        if let Err(e) = self.write(&mut state) {
            log::warn!("failed to clear bookmark for {}: {e}", track.display());
        }
    }

    /// Write anything not yet on disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        if !state.dirty {
            return Ok(());
        }
        self.write(&mut state)
    }

    fn remember(state: &mut State, track: &Path, offset_secs: f64) -> bool {
        if !state.enabled || !offset_secs.is_finite() {
            return false;
        }
        // TOML keys are UTF-8 only; one such key would fail every later write.
        if track.to_str().is_none() {
            log::warn!("not bookmarking {}: path is not valid UTF-8", track.display());
            return false;
        }
        state
            .records
            .insert(track.to_path_buf(), PlaybackRecord::now(offset_secs.max(0.0)));
        state.last_track = Some(track.to_path_buf());
        state.dirty = true;
        true
    }

    fn write(&self, state: &mut State) -> Result<(), StoreError> {
        let file = BookmarkFile {
            version: FILE_VERSION,
            enabled: state.toggled.then_some(state.enabled),
            last_track: state.last_track.clone(),
            records: state.records.clone(),
        };
        let text = toml::to_string(&file)?;
        write_atomic(&self.path, text.as_bytes())?;

        state.dirty = false;
        state.last_write = Some(Instant::now());
        Ok(())
    }
}

impl Drop for BookmarkStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("failed to flush bookmarks on shutdown: {e}");
        }
    }
}
