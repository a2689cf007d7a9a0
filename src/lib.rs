//! Single-folder music library indexer with per-track playback bookmarks.
//!
//! A [`Session`](session::Session) scans one root folder into a
//! [`LibraryIndex`](library::LibraryIndex), drives a
//! [`PlayerController`](player::PlayerController) and remembers where each
//! track was left in a [`BookmarkStore`](bookmarks::BookmarkStore).

pub mod bookmarks;
pub mod config;
pub mod library;
pub mod logging;
mod persist;
pub mod player;
pub mod queue;
pub mod session;

pub use bookmarks::{BookmarkOptions, BookmarkStore};
pub use config::Settings;
pub use library::{LibraryIndex, Track};
pub use player::{PlayerController, RodioPlayer};
pub use session::{Session, SessionError};
