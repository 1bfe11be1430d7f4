//! Thumbnail worker pool with per-path request coalescing.
//!
//! - Fixed pool of decode threads sized to the available cores
//! - Requests flow to workers over a flume channel; results flow back the same way
//! - At most one decode per path is in flight: later callers join the waiters
//! - Callbacks only ever run on the thread that owns the loader (the UI thread),
//!   inside `load` for cache hits or inside `dispatch_completed`

use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, Sender};
use tracing::{debug, error, trace, warn};

use super::cache::ThumbnailCache;
use super::generator::ThumbnailGenerator;
use super::Thumbnail;
use crate::config::GalleryConfig;
use crate::error::{GalleryError, Result};

/// How long an idle worker waits before re-checking the shutdown flag.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Outcome of one decode, delivered to every caller waiting on that path.
#[derive(Debug)]
pub struct ThumbnailResult {
    pub path: PathBuf,
    pub outcome: Result<Thumbnail>,
}

impl ThumbnailResult {
    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.outcome.as_ref().ok()
    }
}

/// Callback invoked on the owning thread when a thumbnail is ready or failed.
pub type ThumbnailCallback = Box<dyn FnOnce(&ThumbnailResult)>;

/// How a `load` call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Served from the cache; the callback already ran.
    Cached,
    /// A new decode was queued.
    Queued,
    /// A decode for this path was already in flight; the callback waits on it.
    Joined,
    /// Workers are gone; the callback already ran with an error.
    Failed,
}

pub struct ThumbnailLoader {
    /// Sender for new requests.
    request_tx: Sender<PathBuf>,
    /// Receiver for completed results (owner thread reads this).
    result_rx: Receiver<ThumbnailResult>,
    /// Worker thread handles.
    workers: Vec<JoinHandle<()>>,
    /// Flag to signal workers to stop.
    shutdown: Arc<AtomicBool>,
    /// Number of workers currently decoding.
    active_workers: Arc<AtomicUsize>,
    /// Total decodes started since creation.
    decodes_started: Arc<AtomicUsize>,
    /// Paths queued or decoding, with the callbacks waiting on each.
    in_flight: RefCell<HashMap<PathBuf, Vec<ThumbnailCallback>>>,
    /// The thumbnail cache shared with workers.
    cache: ThumbnailCache,
}

impl ThumbnailLoader {
    /// Start `workers` decode threads producing thumbnails `thumb_width` wide.
    pub fn new(workers: usize, thumb_width: u32, cache: ThumbnailCache) -> Result<Self> {
        let num_workers = workers.max(1);

        let (request_tx, request_rx) = flume::unbounded::<PathBuf>();
        let (result_tx, result_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let active_workers = Arc::new(AtomicUsize::new(0));
        let decodes_started = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let ctx = WorkerContext {
                worker_id,
                rx: request_rx.clone(),
                tx: result_tx.clone(),
                shutdown: Arc::clone(&shutdown),
                active: Arc::clone(&active_workers),
                decodes: Arc::clone(&decodes_started),
                cache: cache.clone(),
                thumb_width,
            };

            let spawned = thread::Builder::new()
                .name(format!("thumb-worker-{}", worker_id))
                .spawn(move || worker_loop(ctx));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Stop whatever already started before bailing out.
                    shutdown.store(true, Ordering::SeqCst);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(GalleryError::Worker(e));
                }
            }
        }

        debug!(num_workers, thumb_width, "Started thumbnail workers");

        Ok(Self {
            request_tx,
            result_rx,
            workers: handles,
            shutdown,
            active_workers,
            decodes_started,
            in_flight: RefCell::new(HashMap::new()),
            cache,
        })
    }

    pub fn from_config(config: &GalleryConfig) -> Result<Self> {
        let cache = ThumbnailCache::new(config.cache_max_mb, config.cache_max_entries);
        Self::new(config.workers, config.thumb_width, cache)
    }

    /// Request the thumbnail for `path`.
    ///
    /// A cache hit runs `on_ready` before returning. Otherwise `on_ready` runs
    /// from a later `dispatch_completed` call, sharing the decode with any
    /// other caller that asked for the same path in the meantime.
    pub fn load<F>(&self, path: &Path, on_ready: F) -> LoadStatus
    where
        F: FnOnce(&ThumbnailResult) + 'static,
    {
        if let Some(thumbnail) = self.cache.get(path) {
            on_ready(&ThumbnailResult {
                path: path.to_path_buf(),
                outcome: Ok(thumbnail),
            });
            return LoadStatus::Cached;
        }

        {
            let mut in_flight = self.in_flight.borrow_mut();

            if let Some(waiters) = in_flight.get_mut(path) {
                trace!(?path, "Joining in-flight thumbnail decode");
                waiters.push(Box::new(on_ready));
                return LoadStatus::Joined;
            }

            if self.request_tx.send(path.to_path_buf()).is_ok() {
                in_flight.insert(path.to_path_buf(), vec![Box::new(on_ready)]);
                return LoadStatus::Queued;
            }
        }

        error!(?path, "Thumbnail workers disconnected");
        on_ready(&ThumbnailResult {
            path: path.to_path_buf(),
            outcome: Err(GalleryError::WorkersStopped),
        });
        LoadStatus::Failed
    }

    /// Deliver finished decodes to their waiting callbacks (non-blocking).
    ///
    /// Call this from the owning thread; returns the number of decodes
    /// dispatched.
    pub fn dispatch_completed(&self) -> usize {
        let mut dispatched = 0;

        while let Ok(result) = self.result_rx.try_recv() {
            let waiters = self
                .in_flight
                .borrow_mut()
                .remove(&result.path)
                .unwrap_or_default();

            trace!(path = ?result.path, waiters = waiters.len(), "Dispatching thumbnail");

            for callback in waiters {
                callback(&result);
            }
            dispatched += 1;
        }

        dispatched
    }

    /// Get the thumbnail cache.
    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    /// Number of paths queued or decoding.
    pub fn pending_count(&self) -> usize {
        self.in_flight.borrow().len()
    }

    /// Get the number of active workers currently processing.
    pub fn active_worker_count(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    /// Total number of decodes started by the pool.
    pub fn decodes_started(&self) -> usize {
        self.decodes_started.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Check if there is work in progress.
    pub fn is_busy(&self) -> bool {
        self.pending_count() > 0 || self.active_worker_count() > 0
    }

    /// Shutdown the worker pool.
    ///
    /// Queued requests that no worker picked up are abandoned.
    pub fn shutdown(&mut self) {
        debug!("Shutting down thumbnail workers");

        self.shutdown.store(true, Ordering::SeqCst);

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }

        debug!("Thumbnail workers stopped");
    }
}

impl Drop for ThumbnailLoader {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Relaxed) {
            self.shutdown();
        }
    }
}

/// Everything a worker thread owns.
struct WorkerContext {
    worker_id: usize,
    rx: Receiver<PathBuf>,
    tx: Sender<ThumbnailResult>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    decodes: Arc<AtomicUsize>,
    cache: ThumbnailCache,
    thumb_width: u32,
}

/// Worker thread loop.
fn worker_loop(ctx: WorkerContext) {
    let worker_id = ctx.worker_id;
    debug!(worker_id, "Thumbnail worker started");

    loop {
        if ctx.shutdown.load(Ordering::Relaxed) {
            break;
        }

        match ctx.rx.recv_timeout(IDLE_POLL) {
            Ok(path) => {
                ctx.active.fetch_add(1, Ordering::Relaxed);

                let outcome = process_request(&ctx, &path);

                if let Err(e) = ctx.tx.send(ThumbnailResult { path, outcome }) {
                    warn!(worker_id, error = ?e, "Failed to send thumbnail result");
                }

                ctx.active.fetch_sub(1, Ordering::Relaxed);
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Thumbnail worker stopped");
}

/// Decode one thumbnail, caching it on success.
fn process_request(ctx: &WorkerContext, path: &Path) -> Result<Thumbnail> {
    // The entry may have been cached by an earlier decode since queueing.
    if let Some(cached) = ctx.cache.get(path) {
        return Ok(cached);
    }

    trace!(?path, "Decoding thumbnail");
    ctx.decodes.fetch_add(1, Ordering::Relaxed);

    let decoded = panic::catch_unwind(AssertUnwindSafe(|| {
        ThumbnailGenerator::generate(path, ctx.thumb_width)
    }));

    let outcome = match decoded {
        Ok(Ok(thumbnail)) => Ok(thumbnail),
        Ok(Err(e)) => Err(GalleryError::decode(path, e)),
        Err(_) => Err(GalleryError::Decode {
            path: path.to_path_buf(),
            message: "decoder panicked".to_string(),
        }),
    };

    match &outcome {
        Ok(thumbnail) => {
            ctx.cache.insert(path.to_path_buf(), thumbnail.clone());
        }
        Err(e) => {
            warn!(worker_id = ctx.worker_id, error = %e, "Failed to generate thumbnail");
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Instant;
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]))
            .save(path)
            .unwrap();
    }

    fn loader(workers: usize) -> ThumbnailLoader {
        ThumbnailLoader::new(workers, 150, ThumbnailCache::default()).unwrap()
    }

    /// Pump `dispatch_completed` until `pending_count` drains or we time out.
    fn dispatch_all(loader: &ThumbnailLoader) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while loader.pending_count() > 0 {
            loader.dispatch_completed();
            assert!(Instant::now() < deadline, "thumbnail decode timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_same_path_twice_decodes_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("car.png");
        write_png(&path, 300, 150);

        let loader = loader(2);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = {
            let seen = Rc::clone(&seen);
            loader.load(&path, move |r| {
                seen.borrow_mut().push(r.thumbnail().map(|t| (t.width, t.height)))
            })
        };
        let second = {
            let seen = Rc::clone(&seen);
            loader.load(&path, move |r| {
                seen.borrow_mut().push(r.thumbnail().map(|t| (t.width, t.height)))
            })
        };

        assert_eq!(first, LoadStatus::Queued);
        assert_eq!(second, LoadStatus::Joined);
        assert_eq!(loader.pending_count(), 1);

        dispatch_all(&loader);

        assert_eq!(loader.decodes_started(), 1);
        assert_eq!(*seen.borrow(), vec![Some((150, 75)), Some((150, 75))]);
    }

    #[test]
    fn test_cache_hit_runs_callback_synchronously() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shoe.png");
        write_png(&path, 40, 40);

        let loader = loader(1);
        loader.load(&path, |_| {});
        dispatch_all(&loader);
        assert!(loader.cache().contains(&path));

        let hit = Rc::new(RefCell::new(false));
        let status = {
            let hit = Rc::clone(&hit);
            loader.load(&path, move |r| *hit.borrow_mut() = r.thumbnail().is_some())
        };

        assert_eq!(status, LoadStatus::Cached);
        assert!(*hit.borrow());
        assert_eq!(loader.decodes_started(), 1);
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn test_decode_failure_reaches_callback_and_is_not_cached() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();
        let good = dir.path().join("good.png");
        write_png(&good, 10, 10);

        let loader = loader(1);
        let errors = Rc::new(RefCell::new(Vec::new()));
        {
            let errors = Rc::clone(&errors);
            loader.load(&broken, move |r| {
                if let Err(e) = &r.outcome {
                    errors.borrow_mut().push(e.to_string());
                }
            });
        }
        dispatch_all(&loader);

        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("broken.png"));
        assert!(!loader.cache().contains(&broken));

        // The pool keeps working after a failure.
        let ok = Rc::new(RefCell::new(false));
        {
            let ok = Rc::clone(&ok);
            loader.load(&good, move |r| *ok.borrow_mut() = r.thumbnail().is_some());
        }
        dispatch_all(&loader);
        assert!(*ok.borrow());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let loader = loader(1);
        let failed = Rc::new(RefCell::new(false));
        {
            let failed = Rc::clone(&failed);
            loader.load(Path::new("/no/such/image.png"), move |r| {
                *failed.borrow_mut() = matches!(r.outcome, Err(GalleryError::Decode { .. }));
            });
        }
        dispatch_all(&loader);
        assert!(*failed.borrow());
    }

    #[test]
    fn test_many_images_bounded_pool() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..12)
            .map(|i| {
                let path = dir.path().join(format!("img{:02}.png", i));
                write_png(&path, 20 + i, 20);
                path
            })
            .collect();

        let loader = loader(3);
        assert_eq!(loader.worker_count(), 3);

        let done = Rc::new(RefCell::new(0usize));
        for path in &paths {
            let done = Rc::clone(&done);
            let status = loader.load(path, move |r| {
                assert!(r.thumbnail().is_some());
                *done.borrow_mut() += 1;
            });
            assert_eq!(status, LoadStatus::Queued);
            assert!(loader.active_worker_count() <= 3);
        }

        dispatch_all(&loader);
        assert_eq!(*done.borrow(), paths.len());
        assert_eq!(loader.decodes_started(), paths.len());
        assert_eq!(loader.cache().len(), paths.len());
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let mut loader = loader(2);
        loader.shutdown();
        assert_eq!(loader.worker_count(), 0);
    }
}
