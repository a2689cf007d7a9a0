use std::sync::{Arc, PoisonError, RwLock};

use super::index::LibraryIndex;

/// The currently published [`LibraryIndex`], shared between the session and
/// background rescans.
///
/// Readers take an `Arc` snapshot and keep using it even while a rescan
/// publishes a replacement; nobody ever sees a half-built index.
#[derive(Debug, Clone, Default)]
pub struct SharedLibrary {
    current: Arc<RwLock<Arc<LibraryIndex>>>,
}

impl SharedLibrary {
    pub fn new(index: LibraryIndex) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    pub fn snapshot(&self) -> Arc<LibraryIndex> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap in `index` and return the one it replaced.
    pub fn publish(&self, index: LibraryIndex) -> Arc<LibraryIndex> {
        let next = Arc::new(index);
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, next)
    }
}
