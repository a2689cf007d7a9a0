//! Library indexing: metadata extraction, directory scanning and the
//! in-memory catalog built from one root folder.

pub mod cache;
mod index;
mod metadata;
mod model;
mod scan;
mod shared;

pub use index::{LibraryIndex, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_GENRE};
pub use metadata::{ReadError, is_audio_file, read};
pub use model::Track;
pub use scan::{ScanError, ScanReport, scan, scan_with_cancel};
pub use shared::SharedLibrary;
