use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tempfile::{TempDir, tempdir};

use super::*;
use crate::bookmarks::{BookmarkOptions, BookmarkStore};
use crate::library::tests::write_wav;

#[derive(Debug, Default)]
struct FakeState {
    loaded: Option<PathBuf>,
    position: Duration,
    playing: bool,
    finished: bool,
    seeks: Vec<Duration>,
}

/// Scriptable stand-in for an audio engine; clones share state.
#[derive(Debug, Clone, Default)]
struct FakePlayer(Arc<Mutex<FakeState>>);

impl FakePlayer {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.0.lock().unwrap()
    }

    fn set_position(&self, secs: f64) {
        self.state().position = Duration::from_secs_f64(secs);
    }
}

impl PlayerController for FakePlayer {
    fn open(&mut self, path: &Path) -> Result<(), PlayerError> {
        let mut st = self.state();
        st.loaded = Some(path.to_path_buf());
        st.position = Duration::ZERO;
        st.playing = false;
        st.finished = false;
        Ok(())
    }

    fn seek(&mut self, offset: Duration) -> Result<(), PlayerError> {
        let mut st = self.state();
        if st.loaded.is_none() {
            return Err(PlayerError::NothingLoaded);
        }
        st.position = offset;
        st.seeks.push(offset);
        Ok(())
    }

    fn play(&mut self) {
        let mut st = self.state();
        st.playing = st.loaded.is_some();
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn stop(&mut self) {
        let mut st = self.state();
        st.loaded = None;
        st.position = Duration::ZERO;
        st.playing = false;
    }

    fn position(&self) -> Duration {
        self.state().position
    }

    fn is_playing(&self) -> bool {
        self.state().playing
    }

    fn is_finished(&self) -> bool {
        self.state().finished
    }
}

struct Fixture {
    music: TempDir,
    state: TempDir,
}

impl Fixture {
    fn new(names: &[&str]) -> Self {
        let music = tempdir().unwrap();
        for name in names {
            write_wav(&music.path().join(name), 60);
        }
        Self {
            music,
            state: tempdir().unwrap(),
        }
    }

    fn options(&self) -> BookmarkOptions {
        BookmarkOptions::new(self.state.path().join("bookmarks.toml"), true)
    }

    fn session_with(&self, options: BookmarkOptions) -> (Session<FakePlayer>, FakePlayer) {
        let player = FakePlayer::default();
        let store = Arc::new(BookmarkStore::open(options));
        let mut session = Session::with_store(LibrarySettings::default(), store, player.clone());
        session.open_library(self.music.path()).unwrap();
        (session, player)
    }

    fn session(&self) -> (Session<FakePlayer>, FakePlayer) {
        self.session_with(self.options())
    }
}

fn track(session: &Session<FakePlayer>, name: &str) -> PathBuf {
    session.library().root().join(name)
}

#[test]
fn bookmark_is_restored_after_restart() {
    let fx = Fixture::new(&["a.wav", "b.wav"]);
    let (mut session, player) = fx.session();
    let a = track(&session, "a.wav");

    session.play(&a).unwrap();
    player.set_position(42.5);
    session.pause();
    drop(session);

    let (mut session, player) = fx.session();
    session.play(&a).unwrap();
    assert_eq!(player.state().seeks, vec![Duration::from_secs_f64(42.5)]);
    assert_eq!(session.player().position(), Duration::from_secs_f64(42.5));
    assert!(session.player().is_playing());
}

#[test]
fn dropping_the_session_commits_the_playing_position() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, player) = fx.session();
    let a = track(&session, "a.wav");

    session.play(&a).unwrap();
    player.set_position(33.0);
    drop(session);

    assert_eq!(BookmarkStore::open(fx.options()).get(&a), Some(33.0));
}

#[test]
fn ticks_are_throttled_and_stop_commits() {
    let fx = Fixture::new(&["a.wav"]);
    let options = BookmarkOptions {
        flush_interval: Duration::from_secs(3600),
        ..fx.options()
    };
    let (mut session, player) = fx.session_with(options.clone());
    let a = track(&session, "a.wav");

    session.play(&a).unwrap();
    player.set_position(10.0);
    session.tick().unwrap();
    player.set_position(55.0);
    session.tick().unwrap();

    assert_eq!(session.store().get(&a), Some(55.0));
    assert_eq!(BookmarkStore::open(options.clone()).get(&a), Some(10.0));

    session.stop();
    assert_eq!(BookmarkStore::open(options).get(&a), Some(55.0));
    assert_eq!(session.now_playing(), None);
}

#[test]
fn changing_track_commits_the_previous_one() {
    let fx = Fixture::new(&["a.wav", "b.wav"]);
    let (mut session, player) = fx.session();
    let a = track(&session, "a.wav");
    let b = track(&session, "b.wav");

    session.play(&a).unwrap();
    player.set_position(30.0);
    session.play(&b).unwrap();

    assert_eq!(session.store().get(&a), Some(30.0));
    assert_eq!(session.now_playing(), Some(b.as_path()));
    assert_eq!(session.player().position(), Duration::ZERO);
}

#[test]
fn tracks_outside_the_library_are_rejected_and_stale_bookmarks_ignored() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, _player) = fx.session();
    let gone = track(&session, "deleted.wav");
    session.store().commit(&gone, 12.0);

    assert_eq!(session.resume_offset(&gone), None);
    assert!(matches!(
        session.play(&gone),
        Err(SessionError::NotInLibrary(_))
    ));
    // The record itself is left alone.
    assert_eq!(session.store().get(&gone), Some(12.0));
}

#[test]
fn bookmark_at_or_past_the_end_starts_from_zero() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, player) = fx.session();
    let a = track(&session, "a.wav");
    session.store().commit(&a, 75.0);

    assert_eq!(session.resume_offset(&a), None);
    session.play(&a).unwrap();
    assert!(player.state().seeks.is_empty());
}

#[test]
fn disabled_bookmarking_neither_records_nor_resumes() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, player) = fx.session();
    let a = track(&session, "a.wav");

    session.play(&a).unwrap();
    player.set_position(20.0);
    session.pause();

    session.set_bookmarking(false);
    session.play(&a).unwrap();
    assert!(player.state().seeks.is_empty());
    player.set_position(40.0);
    session.pause();

    session.set_bookmarking(true);
    assert_eq!(session.store().get(&a), Some(20.0));
}

#[test]
fn finished_track_clears_its_bookmark_and_advances() {
    let fx = Fixture::new(&["a.wav", "b.wav"]);
    let (mut session, player) = fx.session();
    let a = track(&session, "a.wav");
    let b = track(&session, "b.wav");

    session.play(&a).unwrap();
    player.set_position(12.0);
    session.tick().unwrap();
    assert_eq!(session.store().get(&a), Some(12.0));

    player.state().finished = true;
    assert_eq!(session.tick().unwrap(), Some(b.clone()));
    assert_eq!(session.store().get(&a), None);
    assert_eq!(session.now_playing(), Some(b.as_path()));

    // End of queue without looping: playback stops.
    player.state().finished = true;
    assert_eq!(session.tick().unwrap(), None);
    assert_eq!(session.now_playing(), None);
    assert!(player.state().loaded.is_none());
}

#[test]
fn loop_one_replays_from_the_start() {
    let fx = Fixture::new(&["a.wav", "b.wav"]);
    let (mut session, player) = fx.session();
    let a = track(&session, "a.wav");
    session.set_loop_mode(LoopMode::LoopOne);

    session.play(&a).unwrap();
    player.set_position(59.0);
    player.state().finished = true;

    assert_eq!(session.tick().unwrap(), Some(a));
    assert_eq!(session.player().position(), Duration::ZERO);
}

#[test]
fn next_and_prev_follow_the_library_order() {
    let fx = Fixture::new(&["a.wav", "b.wav", "c.wav"]);
    let (mut session, _player) = fx.session();
    let b = track(&session, "b.wav");
    let c = track(&session, "c.wav");

    session.play(&b).unwrap();
    assert_eq!(session.next().unwrap(), Some(c.clone()));
    assert_eq!(session.next().unwrap(), None);
    assert_eq!(session.prev().unwrap(), Some(b));
}

#[test]
fn resume_last_cues_the_last_track_paused() {
    let fx = Fixture::new(&["a.wav", "b.wav"]);
    let (mut session, player) = fx.session();
    let b = track(&session, "b.wav");
    session.play(&b).unwrap();
    player.set_position(7.0);
    drop(session);

    let (mut session, player) = fx.session();
    assert_eq!(session.resume_last().unwrap(), Some(b.clone()));
    assert_eq!(session.now_playing(), Some(b.as_path()));
    assert_eq!(player.state().seeks, vec![Duration::from_secs(7)]);
    assert!(!player.state().playing);
}

#[test]
fn failed_open_keeps_the_previous_index() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, _player) = fx.session();

    let err = session
        .open_library(&fx.music.path().join("missing"))
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Scan(ScanError::RootUnavailable { .. })
    ));
    assert_eq!(session.library().len(), 1);
}

#[test]
fn background_rescan_publishes_a_new_index() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, _player) = fx.session();
    write_wav(&fx.music.path().join("b.wav"), 1);

    session.start_rescan().unwrap();
    assert!(matches!(
        session.start_rescan(),
        Err(SessionError::RescanInProgress)
    ));

    let event = session.wait_rescan().unwrap();
    assert!(matches!(
        event,
        ScanEvent::Finished(ScanReport { indexed: 2, skipped: 0 })
    ));
    assert_eq!(session.library().len(), 2);
    assert_eq!(session.queue().len(), 2);
    assert!(!session.rescan_running());
}

#[test]
fn failed_rescan_leaves_the_old_index() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, _player) = fx.session();
    let before = session.library();
    fs::remove_dir_all(fx.music.path()).unwrap();

    session.start_rescan().unwrap();
    let event = session.wait_rescan().unwrap();
    assert!(matches!(
        event,
        ScanEvent::Failed(ScanError::RootUnavailable { .. })
    ));
    assert!(Arc::ptr_eq(&before, &session.library()));
}

#[test]
fn rescan_needs_an_open_library() {
    let state = tempdir().unwrap();
    let store = Arc::new(BookmarkStore::open(BookmarkOptions::new(
        state.path().join("b.toml"),
        true,
    )));
    let mut session =
        Session::with_store(LibrarySettings::default(), store, FakePlayer::default());
    assert!(matches!(session.start_rescan(), Err(SessionError::NoLibrary)));
    assert!(session.poll_rescan().is_none());
}

#[test]
fn seek_commits_and_requires_a_track() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, _player) = fx.session();
    let a = track(&session, "a.wav");

    assert!(session.seek(Duration::from_secs(3)).is_err());
    session.play(&a).unwrap();
    session.seek(Duration::from_secs(25)).unwrap();
    assert_eq!(session.store().get(&a), Some(25.0));
}

#[test]
fn open_library_reports_skipped_files() {
    let fx = Fixture::new(&["a.wav"]);
    fs::write(fx.music.path().join("broken.wav"), b"not audio").unwrap();
    let (mut session, _player) = fx.session();

    let report = session.open_library(fx.music.path()).unwrap();
    assert_eq!(report, ScanReport { indexed: 1, skipped: 1 });
}

#[test]
fn cancelled_rescan_keeps_the_adopted_index() {
    let fx = Fixture::new(&["a.wav"]);
    for n in 0..40 {
        write_wav(&fx.music.path().join(format!("new-{n:02}.wav")), 1);
    }
    let (mut session, _player) = fx.session();
    let root = session.library().root().to_path_buf();
    let a = track(&session, "a.wav");
    let only_a = LibraryIndex::new(root, vec![session.library().all()[0].clone()]);
    let adopted = session.adopt(only_a);
    assert_eq!(adopted.len(), 1);

    assert!(!session.cancel_rescan());
    session.start_rescan().unwrap();
    let cancelled = session.cancel_rescan();
    let event = session.wait_rescan().unwrap();

    // Either the cancel landed first and nothing changed, or the rescan had
    // already published and the cancel says so. Never both.
    if cancelled {
        assert!(matches!(event, ScanEvent::Cancelled));
        assert!(Arc::ptr_eq(&adopted, &session.library()));
    } else {
        assert!(matches!(event, ScanEvent::Finished(_)));
        assert_eq!(session.library().len(), 41);
    }
    assert!(session.library().contains(&a));
    assert!(!session.rescan_running());
}

#[cfg(unix)]
#[test]
fn track_path_resolves_symlinked_and_relative_paths() {
    let fx = Fixture::new(&["a.wav"]);
    let (mut session, player) = fx.session();
    let link = fx.state.path().join("music-link");
    std::os::unix::fs::symlink(fx.music.path(), &link).unwrap();

    let via_link = session.track_path(&link.join("a.wav"));
    assert_eq!(via_link, track(&session, "a.wav"));
    assert_eq!(session.track_path(Path::new("a.wav")), via_link);

    session.play(&via_link).unwrap();
    assert_eq!(player.state().loaded.as_deref(), Some(via_link.as_path()));
}
