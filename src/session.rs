//! The API a front end drives: one library root, one player, and the
//! bookmark store that remembers where each track was left.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use thiserror::Error;

use crate::bookmarks::{BookmarkOptions, BookmarkStore};
use crate::config::{LibrarySettings, Settings};
use crate::library::{LibraryIndex, ScanError, ScanReport, SharedLibrary, scan_with_cancel};
use crate::player::{PlayerController, PlayerError};
use crate::queue::{LoopMode, PlayQueue};

mod rescan;

pub use rescan::{RescanHandle, ScanEvent, spawn_rescan};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error("{} is not in the library", .0.display())]
    NotInLibrary(PathBuf),
    #[error("no library has been opened")]
    NoLibrary,
    #[error("a rescan is already running")]
    RescanInProgress,
    #[error("no location for the bookmark store could be determined")]
    NoStorePath,
}

pub struct Session<P: PlayerController> {
    library_settings: LibrarySettings,
    library: SharedLibrary,
    store: Arc<BookmarkStore>,
    player: P,
    queue: PlayQueue,
    now_playing: Option<PathBuf>,
    rescan: Option<RescanHandle>,
}

impl<P: PlayerController> Session<P> {
    /// Build a session from loaded settings, opening the bookmark store they point at.
    pub fn new(settings: &Settings, player: P) -> Result<Self, SessionError> {
        let options =
            BookmarkOptions::from_settings(&settings.bookmarks).ok_or(SessionError::NoStorePath)?;
        let mut session = Self::with_store(
            settings.library.clone(),
            Arc::new(BookmarkStore::open(options)),
            player,
        );
        session.queue.set_loop_mode(settings.playback.loop_mode.into());
        session.queue.set_shuffle(settings.playback.shuffle);
        Ok(session)
    }

    pub fn with_store(
        library_settings: LibrarySettings,
        store: Arc<BookmarkStore>,
        player: P,
    ) -> Self {
        Self {
            library_settings,
            library: SharedLibrary::default(),
            store,
            player,
            queue: PlayQueue::default(),
            now_playing: None,
            rescan: None,
        }
    }

    /// The currently published index.
    pub fn library(&self) -> Arc<LibraryIndex> {
        self.library.snapshot()
    }

    pub fn shared_library(&self) -> SharedLibrary {
        self.library.clone()
    }

    pub fn store(&self) -> &Arc<BookmarkStore> {
        &self.store
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn now_playing(&self) -> Option<&Path> {
        self.now_playing.as_deref()
    }

    /// Scan `root` on the calling thread and publish the result.
    ///
    /// On failure the previously published index stays in place.
    pub fn open_library(&mut self, root: &Path) -> Result<ScanReport, SessionError> {
        let (index, report) =
            scan_with_cancel(root, &self.library_settings, &AtomicBool::new(false))?;
        self.adopt(index);
        Ok(report)
    }

    /// Publish an index obtained elsewhere, e.g. from the library cache.
    pub fn adopt(&mut self, index: LibraryIndex) -> Arc<LibraryIndex> {
        self.library.publish(index);
        self.rebuild_queue();
        self.library.snapshot()
    }

    /// Rescan the current root on a worker thread. Poll with [`poll_rescan`](Self::poll_rescan).
    pub fn start_rescan(&mut self) -> Result<(), SessionError> {
        if self.rescan.is_some() {
            return Err(SessionError::RescanInProgress);
        }
        let root = self.library.snapshot().root().to_path_buf();
        if root.as_os_str().is_empty() {
            return Err(SessionError::NoLibrary);
        }
        self.rescan = Some(spawn_rescan(
            root,
            self.library_settings.clone(),
            self.library.clone(),
        ));
        Ok(())
    }

    pub fn rescan_running(&self) -> bool {
        self.rescan.is_some()
    }

    /// Check whether the background rescan has ended.
    pub fn poll_rescan(&mut self) -> Option<ScanEvent> {
        let event = self.rescan.as_mut()?.try_event()?;
        self.rescan = None;
        if matches!(event, ScanEvent::Finished { .. }) {
            self.rebuild_queue();
        }
        Some(event)
    }

    /// Block until the background rescan ends.
    pub fn wait_rescan(&mut self) -> Option<ScanEvent> {
        let event = self.rescan.take()?.wait();
        if matches!(event, ScanEvent::Finished { .. }) {
            self.rebuild_queue();
        }
        Some(event)
    }

    /// Cancel the running rescan. `false` when there is none or it has
    /// already published its index.
    pub fn cancel_rescan(&self) -> bool {
        self.rescan.as_ref().is_some_and(RescanHandle::cancel)
    }

    fn rebuild_queue(&mut self) {
        let index = self.library.snapshot();
        self.queue
            .replace(index.all().iter().map(|t| t.path.clone()).collect());
    }

    /// Turn a user-supplied path (absolute, or relative to the library root)
    /// into the canonical form the index is keyed by.
    pub fn track_path(&self, track: &Path) -> PathBuf {
        let path = self.library.snapshot().root().join(track);
        fs::canonicalize(&path).unwrap_or(path)
    }

    /// Play a specific list of tracks, e.g. one album, starting at `start`.
    pub fn play_list(&mut self, paths: Vec<PathBuf>, start: &Path) -> Result<(), SessionError> {
        self.queue.replace(paths);
        self.play(start)
    }

    /// Where `track` should start. `None` for tracks without a usable bookmark
    /// and for tracks that are no longer in the library.
    pub fn resume_offset(&self, track: &Path) -> Option<f64> {
        let index = self.library.snapshot();
        let entry = index.find_by_path(track)?;
        let offset = self.store.get(track)?;
        // A bookmark at (or past) the end would resume into silence.
        match entry.duration {
            Some(d) if offset >= d.as_secs_f64() => None,
            _ if offset > 0.0 => Some(offset),
            _ => None,
        }
    }

    /// Load `track` at its bookmark without starting playback.
    pub fn cue(&mut self, track: &Path) -> Result<(), SessionError> {
        if !self.library.snapshot().contains(track) {
            return Err(SessionError::NotInLibrary(track.to_path_buf()));
        }

        self.commit_current();
        self.now_playing = None;
        self.player.open(track)?;
        self.now_playing = Some(track.to_path_buf());
        self.queue.select(track);

        if let Some(offset) = self.resume_offset(track) {
            if let Err(e) = self.player.seek(Duration::from_secs_f64(offset)) {
                log::warn!("cannot resume {} at {offset:.1}s: {e}", track.display());
            }
        }
        Ok(())
    }

    /// Start `track`, resuming from its bookmark when bookmarking is on.
    pub fn play(&mut self, track: &Path) -> Result<(), SessionError> {
        self.cue(track)?;
        self.player.play();
        log::debug!("playing {}", track.display());
        Ok(())
    }

    /// Cue whatever was playing when the last bookmark was taken.
    pub fn resume_last(&mut self) -> Result<Option<PathBuf>, SessionError> {
        let Some(last) = self.store.last_track() else {
            return Ok(None);
        };
        if !self.library.snapshot().contains(&last) {
            return Ok(None);
        }
        self.cue(&last)?;
        Ok(Some(last))
    }

    pub fn pause(&mut self) {
        self.player.pause();
        self.commit_current();
    }

    pub fn resume(&mut self) {
        if self.now_playing.is_some() {
            self.player.play();
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.player.is_playing() {
            self.pause();
        } else {
            self.resume();
        }
    }

    pub fn stop(&mut self) {
        self.commit_current();
        self.player.stop();
        self.now_playing = None;
    }

    pub fn seek(&mut self, offset: Duration) -> Result<(), SessionError> {
        if self.now_playing.is_none() {
            return Err(PlayerError::NothingLoaded.into());
        }
        self.player.seek(offset)?;
        self.commit_current();
        Ok(())
    }

    pub fn next(&mut self) -> Result<Option<PathBuf>, SessionError> {
        let next = self.queue.next().map(Path::to_path_buf);
        self.play_opt(next)
    }

    pub fn prev(&mut self) -> Result<Option<PathBuf>, SessionError> {
        let prev = self.queue.prev().map(Path::to_path_buf);
        self.play_opt(prev)
    }

    fn play_opt(&mut self, track: Option<PathBuf>) -> Result<Option<PathBuf>, SessionError> {
        match track {
            Some(t) => {
                self.play(&t)?;
                Ok(Some(t))
            }
            None => Ok(None),
        }
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.queue.set_loop_mode(mode);
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.queue.set_shuffle(shuffle);
    }

    pub fn set_bookmarking(&mut self, enabled: bool) {
        self.store.set_enabled(enabled);
    }

    /// Drive from the front end's timer.
    ///
    /// Feeds the playing position to the store (throttled there). When the
    /// track has ended its bookmark is cleared and the queue advances; the
    /// newly started track, if any, is returned.
    pub fn tick(&mut self) -> Result<Option<PathBuf>, SessionError> {
        let Some(current) = self.now_playing.clone() else {
            return Ok(None);
        };

        if self.player.is_finished() {
            self.store.clear(&current);
            self.now_playing = None;
            let next = self.queue.advance().map(Path::to_path_buf);
            if next.is_none() {
                self.player.stop();
            }
            return self.play_opt(next);
        }

        if self.player.is_playing() {
            self.store
                .update(&current, self.player.position().as_secs_f64());
        }
        Ok(None)
    }

    /// Commit the current position and flush the store.
    pub fn shutdown(&mut self) {
        self.commit_current();
        if let Err(e) = self.store.flush() {
            log::warn!("failed to flush bookmarks: {e}");
        }
    }

    fn commit_current(&mut self) {
        if let Some(current) = &self.now_playing {
            self.store
                .commit(current, self.player.position().as_secs_f64());
        }
    }
}

impl<P: PlayerController> Drop for Session<P> {
    fn drop(&mut self) {
        self.cancel_rescan();
        self.shutdown();
    }
}

#[cfg(test)]
mod tests;
