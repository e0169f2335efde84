//! Bounded background writer for diagnostic artifacts.
//!
//! Producers hand artifacts to [`ArtifactWriter::submit`], which blocks while
//! the queue is full. A single worker thread, started on the first submit,
//! drains the queue into an [`ArtifactSink`]. The worker runs until every
//! writer handle is dropped; it is never joined, so callers that exit soon
//! after submitting use [`ArtifactWriter::flush`].

use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// A named diagnostic document, e.g. a graph in DOT format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub contents: String,
}

impl Artifact {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Destination of persisted artifacts. Runs on the worker thread only.
pub trait ArtifactSink: Send + 'static {
    fn persist(&mut self, artifact: &Artifact) -> io::Result<()>;
}

/// Writes each artifact to `<dir>/<name>.dot`.
#[derive(Debug, Clone)]
pub struct DotFileSink {
    dir: PathBuf,
}

impl DotFileSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.dot"))
    }
}

impl ArtifactSink for DotFileSink {
    fn persist(&mut self, artifact: &Artifact) -> io::Result<()> {
        fs::write(self.path_for(&artifact.name), &artifact.contents)
    }
}

/// Artifact submission failure.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact worker is no longer running")]
    WorkerGone,
    #[error("Could not start artifact worker: {0}")]
    Spawn(#[source] io::Error),
}

enum Message {
    Persist(Artifact),
    Flush(mpsc::Sender<()>),
}

enum WorkerState {
    Idle(Box<dyn ArtifactSink>),
    Running(SyncSender<Message>),
    Failed,
}

struct Inner {
    capacity: usize,
    state: Mutex<WorkerState>,
}

/// Cloneable handle to the artifact queue. Each clone may submit
/// concurrently; artifacts from one producer are persisted in submission
/// order.
#[derive(Clone)]
pub struct ArtifactWriter {
    inner: Arc<Inner>,
}

impl ArtifactWriter {
    pub fn new(sink: impl ArtifactSink) -> Self {
        Self::with_capacity(sink, DEFAULT_CAPACITY)
    }

    /// `capacity` is the number of queued artifacts before `submit` blocks.
    pub fn with_capacity(sink: impl ArtifactSink, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                state: Mutex::new(WorkerState::Idle(Box::new(sink))),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Queue an artifact, blocking while the queue is full. Never drops.
    pub fn submit(&self, artifact: Artifact) -> Result<(), ArtifactError> {
        // The lock is released before the blocking send.
        let sender = self.sender()?;
        sender
            .send(Message::Persist(artifact))
            .map_err(|_| ArtifactError::WorkerGone)
    }

    /// Block until every artifact submitted before this call has been
    /// handed to the sink.
    pub fn flush(&self) -> Result<(), ArtifactError> {
        let sender = self.sender()?;
        let (done_tx, done_rx) = mpsc::channel();
        sender
            .send(Message::Flush(done_tx))
            .map_err(|_| ArtifactError::WorkerGone)?;
        done_rx.recv().map_err(|_| ArtifactError::WorkerGone)
    }

    fn sender(&self) -> Result<SyncSender<Message>, ArtifactError> {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match std::mem::replace(&mut *state, WorkerState::Failed) {
            WorkerState::Running(sender) => {
                *state = WorkerState::Running(sender.clone());
                Ok(sender)
            }
            WorkerState::Failed => Err(ArtifactError::WorkerGone),
            WorkerState::Idle(sink) => {
                let (sender, receiver) = mpsc::sync_channel(self.inner.capacity);
                thread::Builder::new()
                    .name("artifact-writer".to_string())
                    .spawn(move || run_worker(sink, receiver))
                    .map_err(ArtifactError::Spawn)?;
                log::debug!(
                    "Started artifact writer with capacity {}",
                    self.inner.capacity
                );
                *state = WorkerState::Running(sender.clone());
                Ok(sender)
            }
        }
    }
}

fn run_worker(mut sink: Box<dyn ArtifactSink>, receiver: Receiver<Message>) {
    while let Ok(message) = receiver.recv() {
        let artifact = match message {
            Message::Persist(artifact) => artifact,
            Message::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };
        match panic::catch_unwind(AssertUnwindSafe(|| sink.persist(&artifact))) {
            Ok(Ok(())) => log::trace!("Persisted artifact {}", artifact.name),
            Ok(Err(e)) => log::warn!("Failed to persist artifact {}: {e}", artifact.name),
            Err(_) => log::error!("Artifact sink panicked on {}", artifact.name),
        }
    }
    log::debug!("Artifact queue disconnected, writer exiting");
}
