//! Playback engine interface.
//!
//! The bookmarking logic only talks to [`PlayerController`]. [`RodioPlayer`]
//! is the implementation used by real front ends: a dedicated audio thread
//! owning a `rodio` output stream.

mod controller;
mod engine;
mod sink;

pub use controller::{PlayerController, PlayerError};
pub use engine::{EngineStatus, RodioPlayer, StatusHandle};
