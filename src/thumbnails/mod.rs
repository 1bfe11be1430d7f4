//! Thumbnail pipeline for the gallery grid.
//!
//! This module provides:
//! - `ThumbnailGenerator` - Decodes and downscales source images
//! - `ThumbnailCache` - Bounded in-memory LRU keyed by file path
//! - `ThumbnailLoader` - Worker pool with per-path request coalescing

pub mod cache;
pub mod generator;
pub mod queue;

pub use cache::ThumbnailCache;
pub use generator::ThumbnailGenerator;
pub use queue::{LoadStatus, ThumbnailCallback, ThumbnailLoader, ThumbnailResult};

/// A decoded, downscaled preview.
pub type Thumbnail = crate::image_loader::DecodedImage;
