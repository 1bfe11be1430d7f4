//! Native-resolution decoding for the full-image view.
//!
//! A single background worker serves requests with latest-only coalescing:
//! when the user flips through images faster than they decode, only the most
//! recent request is decoded. Every request bumps a generation counter, and
//! results from older generations are dropped before and after decoding.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace, warn};

use crate::error::{GalleryError, Result};
use crate::image_loader::{self, DecodedImage};

struct FullDecodeRequest {
    generation: u64,
    path: PathBuf,
}

/// A finished full-resolution decode.
#[derive(Debug)]
pub struct FullImageResult {
    pub generation: u64,
    pub path: PathBuf,
    pub outcome: Result<DecodedImage>,
}

pub struct FullImageLoader {
    request_tx: flume::Sender<FullDecodeRequest>,
    result_rx: async_channel::Receiver<FullImageResult>,
    generation: Arc<AtomicU64>,
}

impl FullImageLoader {
    /// Start the decode worker. It exits once the loader is dropped.
    pub fn new() -> Result<Self> {
        let (request_tx, request_rx) = flume::unbounded::<FullDecodeRequest>();
        let (result_tx, result_rx) = async_channel::unbounded::<FullImageResult>();
        let generation = Arc::new(AtomicU64::new(0));

        let guard = Arc::clone(&generation);
        thread::Builder::new()
            .name("full-decode".to_string())
            .spawn(move || {
                while let Ok(mut req) = request_rx.recv() {
                    while let Ok(next) = request_rx.try_recv() {
                        req = next;
                    }

                    if req.generation != guard.load(Ordering::Acquire) {
                        continue;
                    }

                    trace!(path = ?req.path, generation = req.generation, "Decoding full image");
                    let outcome = image_loader::decode_full(&req.path)
                        .map_err(|e| GalleryError::decode(&req.path, e));

                    if let Err(e) = &outcome {
                        warn!(error = %e, "Failed to decode full image");
                    }

                    if req.generation != guard.load(Ordering::Acquire) {
                        continue;
                    }

                    let result = FullImageResult {
                        generation: req.generation,
                        path: req.path,
                        outcome,
                    };
                    if result_tx.send_blocking(result).is_err() {
                        break;
                    }
                }
                debug!("Full image worker stopped");
            })?;

        Ok(Self {
            request_tx,
            result_rx,
            generation,
        })
    }

    /// Queue a decode of `path`, superseding any earlier request.
    ///
    /// Returns the generation the result will carry.
    pub fn request(&self, path: &Path) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let req = FullDecodeRequest {
            generation,
            path: path.to_path_buf(),
        };
        if self.request_tx.send(req).is_err() {
            warn!(?path, "Full image worker is gone");
        }
        generation
    }

    /// Drop any outstanding result without queueing new work.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Receiver for finished decodes; drain it on the UI thread.
    pub fn results(&self) -> async_channel::Receiver<FullImageResult> {
        self.result_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn next_result(loader: &FullImageLoader) -> FullImageResult {
        let rx = loader.results();
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Ok(result) = rx.try_recv() {
                return result;
            }
            assert!(Instant::now() < deadline, "full image decode timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_decodes_at_native_resolution() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.png");
        RgbaImage::from_pixel(640, 480, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let loader = FullImageLoader::new().unwrap();
        let generation = loader.request(&path);
        let result = next_result(&loader);

        assert_eq!(result.generation, generation);
        assert_eq!(result.path, path);
        let image = result.outcome.unwrap();
        assert_eq!((image.width, image.height), (640, 480));
        assert!(loader.is_current(generation));
    }

    #[test]
    fn test_unreadable_file_reports_decode_error() {
        let loader = FullImageLoader::new().unwrap();
        loader.request(Path::new("/no/such/photo.jpg"));
        let result = next_result(&loader);
        assert!(matches!(result.outcome, Err(GalleryError::Decode { .. })));
    }

    #[test]
    fn test_latest_request_wins() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");
        RgbaImage::new(8, 8).save(&first).unwrap();
        RgbaImage::new(4, 4).save(&second).unwrap();

        let loader = FullImageLoader::new().unwrap();
        let old = loader.request(&first);
        let new = loader.request(&second);
        assert!(!loader.is_current(old));
        assert!(loader.is_current(new));

        // The first decode may or may not slip through; the last one must arrive.
        let mut result = next_result(&loader);
        if result.generation == old {
            result = next_result(&loader);
        }
        assert_eq!(result.generation, new);
        assert_eq!(result.path, second);
    }

    #[test]
    fn test_invalidate_supersedes_pending_request() {
        let loader = FullImageLoader::new().unwrap();
        let generation = loader.request(Path::new("/no/such/photo.jpg"));
        loader.invalidate();
        assert!(!loader.is_current(generation));
    }
}
