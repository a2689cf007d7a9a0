//! Configuration loader and schema types.
//!
//! Settings drive library scanning, bookmark persistence, playback defaults
//! and logging. See [`Settings`] for file location and precedence.

mod load;
mod schema;

pub use load::{default_config_path, default_state_dir, resolve_config_path};
pub use schema::*;
