use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::config::LibrarySettings;
use crate::library::{LibraryIndex, ScanError, ScanReport, SharedLibrary, scan_with_cancel};

/// How a background rescan ended.
#[derive(Debug)]
pub enum ScanEvent {
    /// The new index is published.
    Finished(ScanReport),
    /// The root could not be scanned; the old index is still published.
    Failed(ScanError),
    /// Cancelled before publishing; the old index is still published.
    Cancelled,
}

/// Cancellation and publication exclude each other: whichever takes the
/// lock first decides the outcome.
#[derive(Debug, Default)]
struct Gate {
    cancel: AtomicBool,
    published: Mutex<bool>,
}

impl Gate {
    /// `false` when the new index was already published.
    fn cancel(&self) -> bool {
        let published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        if *published {
            return false;
        }
        self.cancel.store(true, Ordering::Relaxed);
        true
    }

    /// Run `publish` unless cancellation got there first.
    fn publish_unless_cancelled(&self, publish: impl FnOnce()) -> bool {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        if self.cancel.load(Ordering::Relaxed) {
            return false;
        }
        publish();
        *published = true;
        true
    }
}

/// A rescan running on a worker thread.
pub struct RescanHandle {
    gate: Arc<Gate>,
    events: Receiver<ScanEvent>,
    join: Option<JoinHandle<()>>,
}

/// Scan `root` off the calling thread and publish the result into `library`.
///
/// The outcome arrives as a single [`ScanEvent`] on the returned handle.
pub fn spawn_rescan(
    root: PathBuf,
    settings: LibrarySettings,
    library: SharedLibrary,
) -> RescanHandle {
    let gate = Arc::new(Gate::default());
    let (tx, events) = mpsc::channel();

    let worker_gate = Arc::clone(&gate);
    let join = thread::spawn(move || {
        let scanned = scan_with_cancel(&root, &settings, &worker_gate.cancel);
        let _ = tx.send(conclude(&worker_gate, &library, scanned));
    });

    RescanHandle {
        gate,
        events,
        join: Some(join),
    }
}

/// Turn the scan result into an event, publishing the index if still wanted.
fn conclude(
    gate: &Gate,
    library: &SharedLibrary,
    scanned: Result<(LibraryIndex, ScanReport), ScanError>,
) -> ScanEvent {
    match scanned {
        Ok((index, report)) => {
            if gate.publish_unless_cancelled(|| {
                library.publish(index);
            }) {
                ScanEvent::Finished(report)
            } else {
                ScanEvent::Cancelled
            }
        }
        Err(ScanError::Cancelled) => ScanEvent::Cancelled,
        Err(e) => {
            log::warn!("rescan failed: {e}");
            ScanEvent::Failed(e)
        }
    }
}

impl RescanHandle {
    /// Ask the worker to stop.
    ///
    /// Returns `false` if the new index had already been published; otherwise
    /// it never will be and the outcome is [`ScanEvent::Cancelled`].
    pub fn cancel(&self) -> bool {
        self.gate.cancel()
    }

    /// Non-blocking check for the outcome.
    pub fn try_event(&mut self) -> Option<ScanEvent> {
        match self.events.try_recv() {
            Ok(event) => {
                self.reap();
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.reap();
                Some(ScanEvent::Cancelled)
            }
        }
    }

    /// Block until the worker is done.
    pub fn wait(mut self) -> ScanEvent {
        let event = self.events.recv().unwrap_or(ScanEvent::Cancelled);
        self.reap();
        event
    }

    fn reap(&mut self) {
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}
