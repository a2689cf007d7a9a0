use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::{OutputStreamBuilder, Sink};

use super::controller::{PlayerController, PlayerError};
use super::sink::open_sink;

type Reply = Sender<Result<(), PlayerError>>;

#[derive(Debug)]
enum EngineCmd {
    Open(PathBuf, Reply),
    Seek(Duration, Reply),
    Play(Reply),
    Pause(Reply),
    Stop(Reply),
    Quit,
}

/// Playback state published by the audio thread.
#[derive(Debug, Clone, Default)]
pub struct EngineStatus {
    pub loaded: Option<PathBuf>,
    pub position: Duration,
    pub playing: bool,
    pub finished: bool,
}

pub type StatusHandle = Arc<Mutex<EngineStatus>>;

/// [`PlayerController`] backed by `rodio` on the default output device.
///
/// The output stream lives on its own thread; this handle only sends commands
/// and reads the status that thread publishes every 200 ms.
pub struct RodioPlayer {
    tx: Sender<EngineCmd>,
    status: StatusHandle,
    join: Option<JoinHandle<()>>,
}

impl RodioPlayer {
    /// Start the audio thread. Fails if no output device can be opened.
    pub fn spawn() -> Result<Self, PlayerError> {
        let (tx, rx) = mpsc::channel::<EngineCmd>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let status = StatusHandle::default();

        let join = spawn_engine_thread(rx, status.clone(), ready_tx);

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx,
                status,
                join: Some(join),
            }),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => Err(PlayerError::Disconnected),
        }
    }

    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    fn status(&self) -> MutexGuard<'_, EngineStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a command and wait until the audio thread has applied it.
    fn request(&self, cmd: impl FnOnce(Reply) -> EngineCmd) -> Result<(), PlayerError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(cmd(reply_tx))
            .map_err(|_| PlayerError::Disconnected)?;
        reply_rx.recv().map_err(|_| PlayerError::Disconnected)?
    }

    fn request_logged(&self, what: &str, cmd: impl FnOnce(Reply) -> EngineCmd) {
        if let Err(e) = self.request(cmd) {
            log::warn!("{what} failed: {e}");
        }
    }
}

impl PlayerController for RodioPlayer {
    fn open(&mut self, path: &Path) -> Result<(), PlayerError> {
        let path = path.to_path_buf();
        self.request(|reply| EngineCmd::Open(path, reply))
    }

    fn seek(&mut self, offset: Duration) -> Result<(), PlayerError> {
        self.request(|reply| EngineCmd::Seek(offset, reply))
    }

    fn play(&mut self) {
        self.request_logged("play", EngineCmd::Play);
    }

    fn pause(&mut self) {
        self.request_logged("pause", EngineCmd::Pause);
    }

    fn stop(&mut self) {
        self.request_logged("stop", EngineCmd::Stop);
    }

    fn position(&self) -> Duration {
        self.status().position
    }

    fn is_playing(&self) -> bool {
        self.status().playing
    }

    fn is_finished(&self) -> bool {
        self.status().finished
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        let _ = self.tx.send(EngineCmd::Quit);
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

fn spawn_engine_thread(
    rx: Receiver<EngineCmd>,
    status: StatusHandle,
    ready: Sender<Result<(), PlayerError>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready.send(Err(PlayerError::Output(e.to_string())));
                return;
            }
        };
        // rodio logs to stderr when OutputStream is dropped.
        stream.log_on_drop(false);
        let _ = ready.send(Ok(()));

        let mut sink: Option<Sink> = None;

        loop {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(EngineCmd::Open(path, reply)) => {
                    if let Some(old) = sink.take() {
                        old.stop();
                    }
                    let result = open_sink(&stream, &path).map(|s| sink = Some(s));
                    if let Err(e) = &result {
                        log::warn!("{e}");
                    }
                    publish(&status, sink.as_ref(), result.is_ok().then_some(path));
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::Seek(offset, reply)) => {
                    let result = match sink.as_ref() {
                        Some(s) => s
                            .try_seek(offset)
                            .map_err(|e| PlayerError::Seek(e.to_string())),
                        None => Err(PlayerError::NothingLoaded),
                    };
                    refresh(&status, sink.as_ref());
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::Play(reply)) => {
                    let result = sink.as_ref().map(Sink::play).ok_or(PlayerError::NothingLoaded);
                    refresh(&status, sink.as_ref());
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::Pause(reply)) => {
                    let result = sink.as_ref().map(Sink::pause).ok_or(PlayerError::NothingLoaded);
                    refresh(&status, sink.as_ref());
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::Stop(reply)) => {
                    if let Some(s) = sink.take() {
                        s.stop();
                    }
                    publish(&status, None, None);
                    let _ = reply.send(Ok(()));
                }
                Ok(EngineCmd::Quit) | Err(RecvTimeoutError::Disconnected) => {
                    if let Some(s) = sink.take() {
                        s.stop();
                    }
                    publish(&status, None, None);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => refresh(&status, sink.as_ref()),
            }
        }
    })
}

/// Reset the status for a newly loaded (or unloaded) track.
fn publish(status: &StatusHandle, sink: Option<&Sink>, loaded: Option<PathBuf>) {
    if let Ok(mut st) = status.lock() {
        st.loaded = loaded;
    }
    refresh(status, sink);
}

fn refresh(status: &StatusHandle, sink: Option<&Sink>) {
    let Ok(mut st) = status.lock() else {
        return;
    };
    match sink {
        Some(s) => {
            st.position = s.get_pos();
            st.finished = s.empty();
            st.playing = !s.is_paused() && !st.finished;
        }
        None => {
            st.position = Duration::ZERO;
            st.playing = false;
            st.finished = false;
        }
    }
}
