mod files;

pub use files::FileAssetSource;

use crate::scene::materials::{MaterialKind, TextureImage};
use crate::scene::shapes::{Geometry, Shape};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("failed to parse glTF {path}: {source}")]
    ParseGltf {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("no mesh with positions found in {path}")]
    NoMesh { path: String },
    #[error("buffer of {path} has {actual} bytes, expected {expected}")]
    ShortBuffer {
        path: String,
        expected: usize,
        actual: usize,
    },
    #[error("failed to decode image {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to start asset loader thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("asset loader thread is gone")]
    WorkerGone,
}

/// Blocking loads, run on the loader thread.
pub trait AssetSource: Send + Sync + 'static {
    fn load_model(&self, path: &str, scale: f32) -> Result<Geometry, AssetError>;
    fn load_texture(&self, source: &str) -> Result<TextureImage, AssetError>;
}

/// What an in-flight request will replace once it lands. A newer request for
/// the same slot supersedes the older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadSlot {
    Geometry,
    Material,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub slot: LoadSlot,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TexturePurpose {
    Material(MaterialKind),
    Upload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadRequest {
    Model {
        shape: Shape,
        path: String,
        scale: f32,
    },
    Texture {
        source: String,
        purpose: TexturePurpose,
    },
}

impl LoadRequest {
    pub fn describe(&self) -> &str {
        match self {
            LoadRequest::Model { path, .. } => path,
            LoadRequest::Texture { source, .. } => source,
        }
    }
}

#[derive(Debug)]
pub enum LoadedAsset {
    Model(Geometry),
    Texture(TextureImage),
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub request: LoadRequest,
    pub result: Result<LoadedAsset, AssetError>,
}

struct Job {
    ticket: LoadTicket,
    request: LoadRequest,
}

/// Hands requests to a single worker thread and returns finished loads on
/// the caller's thread. Results whose ticket is no longer current are
/// dropped in [`AssetLoader::poll`].
pub struct AssetLoader {
    jobs: Option<Sender<Job>>,
    results: Receiver<LoadOutcome>,
    current: HashMap<LoadSlot, u64>,
    next_generation: u64,
    in_flight: usize,
    worker: Option<JoinHandle<()>>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>) -> Result<Self, AssetError> {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (results_tx, results_rx) = mpsc::channel::<LoadOutcome>();
        let worker = std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || run_worker(source, jobs_rx, results_tx))
            .map_err(AssetError::Spawn)?;
        Ok(Self {
            jobs: Some(jobs_tx),
            results: results_rx,
            current: HashMap::new(),
            next_generation: 1,
            in_flight: 0,
            worker: Some(worker),
        })
    }

    pub fn request(
        &mut self,
        slot: LoadSlot,
        request: LoadRequest,
    ) -> Result<LoadTicket, AssetError> {
        let ticket = LoadTicket {
            slot,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        let jobs = self.jobs.as_ref().ok_or(AssetError::WorkerGone)?;
        log::debug!(
            "Queue load #{} for {:?}: {}",
            ticket.generation,
            slot,
            request.describe()
        );
        jobs.send(Job { ticket, request })
            .map_err(|_| AssetError::WorkerGone)?;
        self.current.insert(slot, ticket.generation);
        self.in_flight += 1;
        Ok(ticket)
    }

    /// Marks whatever is in flight for `slot` as unwanted.
    pub fn invalidate(&mut self, slot: LoadSlot) {
        if let Some(generation) = self.current.remove(&slot) {
            log::debug!("Load #{} for {:?} superseded", generation, slot);
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.current.get(&ticket.slot) == Some(&ticket.generation)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Drains finished loads without blocking.
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let mut accepted = Vec::new();
        while let Ok(outcome) = self.results.try_recv() {
            self.accept(outcome, &mut accepted);
        }
        accepted
    }

    /// Blocks until every queued load has come back or `timeout` passes.
    #[cfg(test)]
    pub fn wait(&mut self, timeout: std::time::Duration) -> Vec<LoadOutcome> {
        let deadline = std::time::Instant::now() + timeout;
        let mut accepted = Vec::new();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(outcome) => self.accept(outcome, &mut accepted),
                Err(_) => break,
            }
        }
        accepted
    }

    fn accept(&mut self, outcome: LoadOutcome, accepted: &mut Vec<LoadOutcome>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if !self.is_current(outcome.ticket) {
            log::debug!(
                "Dropping stale load #{} ({})",
                outcome.ticket.generation,
                outcome.request.describe()
            );
            return;
        }
        self.current.remove(&outcome.ticket.slot);
        accepted.push(outcome);
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Asset loader thread panicked");
            }
        }
    }
}

fn run_worker(source: Arc<dyn AssetSource>, jobs: Receiver<Job>, results: Sender<LoadOutcome>) {
    for job in jobs {
        let result = match &job.request {
            LoadRequest::Model { path, scale, .. } => {
                source.load_model(path, *scale).map(LoadedAsset::Model)
            }
            LoadRequest::Texture { source: name, .. } => {
                source.load_texture(name).map(LoadedAsset::Texture)
            }
        };
        let outcome = LoadOutcome {
            ticket: job.ticket,
            request: job.request,
            result,
        };
        if results.send(outcome).is_err() {
            break;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory source: models resolve to a unit box scaled by `scale`,
    /// textures to a 1x1 image. Paths containing "missing" fail.
    #[derive(Default)]
    pub struct FakeSource {
        pub calls: Mutex<Vec<String>>,
    }

    impl AssetSource for FakeSource {
        fn load_model(&self, path: &str, scale: f32) -> Result<Geometry, AssetError> {
            self.calls.lock().unwrap().push(path.to_string());
            if path.contains("missing") {
                return Err(AssetError::NoMesh {
                    path: path.to_string(),
                });
            }
            Ok(Geometry::Box {
                width: scale,
                height: scale,
                depth: scale,
            })
        }

        fn load_texture(&self, source: &str) -> Result<TextureImage, AssetError> {
            self.calls.lock().unwrap().push(source.to_string());
            if source.contains("missing") {
                return Err(AssetError::Fetch {
                    url: source.to_string(),
                    message: "not found".to_string(),
                });
            }
            Ok(TextureImage {
                width: 1,
                height: 1,
                pixels: vec![255, 0, 0, 255],
                content_hash: format!("hash-of-{}", source),
            })
        }
    }
}
