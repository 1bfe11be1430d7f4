//! Application context: the one place shared services live.
//!
//! Created once at startup and borrowed by every screen. Owns the album
//! registry and both decoders.

use tracing::debug;

use crate::albums::AlbumRegistry;
use crate::config::GalleryConfig;
use crate::error::Result;
use crate::full_image::FullImageLoader;
use crate::thumbnails::ThumbnailLoader;

pub struct GalleryContext {
    pub config: GalleryConfig,
    pub registry: AlbumRegistry,
    pub thumbnails: ThumbnailLoader,
    pub full_images: FullImageLoader,
}

impl GalleryContext {
    /// Build the registry and start the decode workers.
    pub fn new(config: GalleryConfig) -> Result<Self> {
        let registry = AlbumRegistry::from_config(&config);
        let thumbnails = ThumbnailLoader::from_config(&config)?;
        let full_images = FullImageLoader::new()?;

        debug!(
            albums = registry.len(),
            workers = thumbnails.worker_count(),
            "Gallery context ready"
        );

        Ok(Self {
            config,
            registry,
            thumbnails,
            full_images,
        })
    }
}
