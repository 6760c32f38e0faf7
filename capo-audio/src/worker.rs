//! Background load + analysis
//!
//! One worker thread decodes and analyzes tracks off the caller's thread.
//! Every request carries a sequence number; only the most recently submitted
//! request is worked on or reported; older ones are dropped.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use capo_library::TrackLoader;
use crossbeam_channel::{self, Receiver, Sender};

use crate::engine::AnalyzedTrack;
use crate::error::EngineError;

/// Sequence number of a submitted request
pub type RequestId = u64;

/// Work item for the analysis thread
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub id: RequestId,
    pub path: PathBuf,
}

/// Progress reported by the analysis thread
#[derive(Debug)]
pub enum AnalysisEvent {
    /// Decoding of the request began
    Started { id: RequestId, path: PathBuf },
    /// Load and analysis succeeded
    Finished { id: RequestId, track: AnalyzedTrack },
    /// Load failed
    Failed {
        id: RequestId,
        path: PathBuf,
        message: String,
    },
}

impl AnalysisEvent {
    pub fn id(&self) -> RequestId {
        match self {
            AnalysisEvent::Started { id, .. }
            | AnalysisEvent::Finished { id, .. }
            | AnalysisEvent::Failed { id, .. } => *id,
        }
    }
}

/// Handle to the analysis thread
pub struct AnalysisWorker {
    request_tx: Option<Sender<AnalysisRequest>>,
    event_rx: Receiver<AnalysisEvent>,
    latest: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Start the worker thread
    pub fn spawn() -> Result<Self, EngineError> {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<AnalysisRequest>();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let latest = Arc::new(AtomicU64::new(0));

        let worker_latest = Arc::clone(&latest);
        let handle = thread::Builder::new()
            .name("capo-analysis".into())
            .spawn(move || run(request_rx, event_tx, worker_latest))
            .map_err(|e| {
                tracing::warn!("Failed to spawn analysis thread: {}", e);
                EngineError::WorkerDisconnected
            })?;

        Ok(Self {
            request_tx: Some(request_tx),
            event_rx,
            latest,
            handle: Some(handle),
        })
    }

    /// Queue a track for load + analysis, superseding earlier requests
    pub fn submit(&self, path: impl AsRef<Path>) -> Result<RequestId, EngineError> {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let request = AnalysisRequest {
            id,
            path: path.as_ref().to_path_buf(),
        };

        self.request_tx
            .as_ref()
            .ok_or(EngineError::WorkerDisconnected)?
            .send(request)
            .map_err(|_| EngineError::WorkerDisconnected)?;

        tracing::debug!("Submitted analysis request #{}", id);
        Ok(id)
    }

    /// Id of the most recent request
    pub fn latest(&self) -> RequestId {
        self.latest.load(Ordering::SeqCst)
    }

    /// Next event of the latest request, without blocking
    pub fn poll(&self) -> Option<AnalysisEvent> {
        while let Ok(event) = self.event_rx.try_recv() {
            if self.is_current(&event) {
                return Some(event);
            }
        }
        None
    }

    /// Block until the latest request finishes
    pub fn wait(&self) -> Result<AnalyzedTrack, EngineError> {
        loop {
            let event = self
                .event_rx
                .recv()
                .map_err(|_| EngineError::WorkerDisconnected)?;

            if !self.is_current(&event) {
                continue;
            }

            match event {
                AnalysisEvent::Started { .. } => continue,
                AnalysisEvent::Finished { track, .. } => return Ok(track),
                AnalysisEvent::Failed { path, message, .. } => {
                    return Err(EngineError::Analysis { path, message })
                }
            }
        }
    }

    fn is_current(&self, event: &AnalysisEvent) -> bool {
        let current = event.id() == self.latest();
        if !current {
            tracing::debug!("Dropping stale analysis event #{}", event.id());
        }
        current
    }

    /// Close the request channel and join the thread
    ///
    /// An analysis already running is allowed to finish.
    pub fn shutdown(&mut self) {
        self.request_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Analysis thread panicked");
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(requests: Receiver<AnalysisRequest>, events: Sender<AnalysisEvent>, latest: Arc<AtomicU64>) {
    let loader = TrackLoader::new();

    for request in requests.iter() {
        if request.id != latest.load(Ordering::SeqCst) {
            tracing::debug!("Skipping superseded request #{}", request.id);
            continue;
        }

        let AnalysisRequest { id, path } = request;
        let started = AnalysisEvent::Started {
            id,
            path: path.clone(),
        };
        if events.send(started).is_err() {
            break;
        }

        let event = match loader.load(&path) {
            Ok(track) => AnalysisEvent::Finished {
                id,
                track: AnalyzedTrack::analyze(track),
            },
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", path.display(), e);
                AnalysisEvent::Failed {
                    id,
                    path,
                    message: e.to_string(),
                }
            }
        };

        if events.send(event).is_err() {
            break;
        }
    }

    tracing::debug!("Analysis thread exiting");
}
