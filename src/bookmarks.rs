//! Per-track playback bookmarks that survive restarts.
//!
//! [`BookmarkStore`] keeps every record in memory and mirrors it to a single
//! TOML file. Writes are throttled during playback, forced on pause, stop and
//! track changes, and flushed when the store is dropped.

mod record;
mod store;

pub use record::PlaybackRecord;
pub use store::{BookmarkOptions, BookmarkStore, StoreError};
