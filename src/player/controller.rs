use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
    #[error("no track is loaded")]
    NothingLoaded,
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("audio output unavailable: {0}")]
    Output(String),
    #[error("audio thread has stopped")]
    Disconnected,
}

/// What the core needs from an audio engine.
///
/// `open` leaves the track paused at the start; the caller seeks and then plays.
pub trait PlayerController {
    fn open(&mut self, path: &Path) -> Result<(), PlayerError>;
    fn seek(&mut self, offset: Duration) -> Result<(), PlayerError>;
    fn play(&mut self);
    fn pause(&mut self);
    /// Unload the current track.
    fn stop(&mut self);
    /// Elapsed time in the loaded track.
    fn position(&self) -> Duration;
    fn is_playing(&self) -> bool;
    /// The loaded track has played to its end.
    fn is_finished(&self) -> bool;
}
