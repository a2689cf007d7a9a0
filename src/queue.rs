//! Play queue: the ordered list of tracks the session steps through, with
//! shuffle and loop modes.

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::LoopModeSetting;
use crate::library::Track;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Stop at the end of the queue.
    #[default]
    NoLoop,
    /// Wrap around to the start of the queue.
    LoopAll,
    /// Repeat the current track when it ends.
    LoopOne,
}

impl LoopMode {
    /// NoLoop → LoopAll → LoopOne → NoLoop.
    pub fn cycle(self) -> Self {
        match self {
            Self::NoLoop => Self::LoopAll,
            Self::LoopAll => Self::LoopOne,
            Self::LoopOne => Self::NoLoop,
        }
    }
}

impl From<LoopModeSetting> for LoopMode {
    fn from(setting: LoopModeSetting) -> Self {
        match setting {
            LoopModeSetting::NoLoop => Self::NoLoop,
            LoopModeSetting::LoopAll => Self::LoopAll,
            LoopModeSetting::LoopOne => Self::LoopOne,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    /// Order the queue was built in; restored when shuffle is turned off.
    original: Vec<PathBuf>,
    /// Current play order.
    order: Vec<PathBuf>,
    pos: Option<usize>,
    loop_mode: LoopMode,
    shuffle: bool,
}

impl PlayQueue {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            original: paths.clone(),
            order: paths,
            ..Self::default()
        }
    }

    pub fn from_tracks<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> Self {
        Self::new(tracks.into_iter().map(|t| t.path.clone()).collect())
    }

    /// Replace the contents, keeping loop mode, shuffle and (if still present)
    /// the current track.
    pub fn replace(&mut self, paths: Vec<PathBuf>) {
        let current = self.current().map(Path::to_path_buf);
        self.original = paths.clone();
        self.order = paths;
        self.pos = None;
        if self.shuffle {
            self.order.shuffle(&mut rand::rng());
        }
        if let Some(p) = current {
            self.select(&p);
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn current(&self) -> Option<&Path> {
        self.pos.and_then(|i| self.order.get(i)).map(PathBuf::as_path)
    }

    /// Move the cursor to `path`. Returns `false` if it is not queued.
    pub fn select(&mut self, path: &Path) -> bool {
        match self.order.iter().position(|p| p == path) {
            Some(i) => {
                self.pos = Some(i);
                true
            }
            None => false,
        }
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.set_shuffle_with(shuffle, &mut rand::rng());
    }

    /// Turn shuffle on or off. The current track stays under the cursor.
    pub fn set_shuffle_with<R: Rng + ?Sized>(&mut self, shuffle: bool, rng: &mut R) {
        let current = self.current().map(Path::to_path_buf);
        self.shuffle = shuffle;
        if shuffle {
            self.order.shuffle(rng);
        } else {
            self.order = self.original.clone();
        }
        self.pos = None;
        if let Some(p) = current {
            self.select(&p);
        }
    }

    /// Manual skip forward. Wraps only in [`LoopMode::LoopAll`].
    pub fn next(&mut self) -> Option<&Path> {
        if self.order.is_empty() {
            return None;
        }
        let next = match self.pos {
            None => 0,
            Some(i) if i + 1 < self.order.len() => i + 1,
            Some(_) if self.loop_mode == LoopMode::LoopAll => 0,
            Some(_) => return None,
        };
        self.pos = Some(next);
        self.current()
    }

    /// Manual skip back. Wraps only in [`LoopMode::LoopAll`].
    pub fn prev(&mut self) -> Option<&Path> {
        if self.order.is_empty() {
            return None;
        }
        let prev = match self.pos {
            None => 0,
            Some(i) if i > 0 => i - 1,
            Some(_) if self.loop_mode == LoopMode::LoopAll => self.order.len() - 1,
            Some(_) => return None,
        };
        self.pos = Some(prev);
        self.current()
    }

    /// What to play after the current track ended on its own.
    pub fn advance(&mut self) -> Option<&Path> {
        if self.loop_mode == LoopMode::LoopOne && self.pos.is_some() {
            return self.current();
        }
        self.next()
    }
}
