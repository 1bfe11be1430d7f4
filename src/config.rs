//! Runtime configuration for the gallery.
//!
//! Albums are a fixed table compiled into the binary. Only the directory they
//! live under can be moved, through `ALBUMVIEW_ROOT`.

use std::path::PathBuf;

use tracing::debug;

/// Environment variable overriding the album root directory.
pub const ALBUM_ROOT_ENV: &str = "ALBUMVIEW_ROOT";

/// Fixed album table: (display name, sub-directory of the album root).
pub const ALBUM_TABLE: &[(&str, &str)] = &[("Cars", "cars"), ("Food", "food"), ("Shoes", "shoes")];

/// Default thumbnail width in pixels.
pub const DEFAULT_THUMB_WIDTH: u32 = 150;

/// Default memory budget for the thumbnail cache in megabytes.
pub const DEFAULT_CACHE_MAX_MB: usize = 128;

/// Default cap on the number of cached thumbnails.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 4096;

/// Default number of grid columns.
pub const DEFAULT_GRID_COLUMNS: u32 = 4;

/// Maximum number of thumbnail worker threads.
pub const MAX_WORKERS: usize = 8;

#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Directory the album sub-directories are resolved against.
    pub album_root: PathBuf,
    /// Ordered (name, sub-directory) pairs.
    pub albums: Vec<(String, PathBuf)>,
    /// Thumbnail width; height follows the aspect ratio.
    pub thumb_width: u32,
    /// Thumbnail decode workers.
    pub workers: usize,
    /// Thumbnail cache budget in megabytes.
    pub cache_max_mb: usize,
    /// Thumbnail cache entry cap.
    pub cache_max_entries: usize,
    /// Columns in the thumbnail grid.
    pub grid_columns: u32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            album_root: default_album_root(),
            albums: ALBUM_TABLE
                .iter()
                .map(|(name, dir)| (name.to_string(), PathBuf::from(dir)))
                .collect(),
            thumb_width: DEFAULT_THUMB_WIDTH,
            workers: default_workers(),
            cache_max_mb: DEFAULT_CACHE_MAX_MB,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            grid_columns: DEFAULT_GRID_COLUMNS,
        }
    }
}

impl GalleryConfig {
    /// Default configuration with `ALBUMVIEW_ROOT` applied when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(root) = std::env::var_os(ALBUM_ROOT_ENV).filter(|v| !v.is_empty()) {
            config.album_root = PathBuf::from(root);
        }
        debug!(album_root = ?config.album_root, "Loaded gallery configuration");
        config
    }

    pub fn builder() -> GalleryConfigBuilder {
        GalleryConfigBuilder::new()
    }

    /// Absolute directories for every album, in table order.
    pub fn album_directories(&self) -> impl Iterator<Item = (&str, PathBuf)> + '_ {
        self.albums
            .iter()
            .map(|(name, dir)| (name.as_str(), self.album_root.join(dir)))
    }
}

/// Builder for [`GalleryConfig`].
pub struct GalleryConfigBuilder {
    config: GalleryConfig,
}

impl GalleryConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GalleryConfig::default(),
        }
    }

    pub fn album_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.album_root = root.into();
        self
    }

    /// Replace the album table.
    pub fn albums<I, N, D>(mut self, albums: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<PathBuf>,
    {
        self.config.albums = albums
            .into_iter()
            .map(|(name, dir)| (name.into(), dir.into()))
            .collect();
        self
    }

    pub fn thumb_width(mut self, width: u32) -> Self {
        self.config.thumb_width = width.max(1);
        self
    }

    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count.clamp(1, MAX_WORKERS);
        self
    }

    pub fn cache_max_mb(mut self, mb: usize) -> Self {
        self.config.cache_max_mb = mb;
        self
    }

    pub fn cache_max_entries(mut self, entries: usize) -> Self {
        self.config.cache_max_entries = entries.max(1);
        self
    }

    pub fn grid_columns(mut self, columns: u32) -> Self {
        self.config.grid_columns = columns.max(1);
        self
    }

    pub fn build(self) -> GalleryConfig {
        self.config
    }
}

impl Default for GalleryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_album_root() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.picture_dir().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("images"))
}

/// One worker per available core, within `1..=MAX_WORKERS`.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .clamp(1, MAX_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_album_table() {
        let config = GalleryConfig::default();
        let names: Vec<&str> = config.albums.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Cars", "Food", "Shoes"]);
        assert_eq!(config.thumb_width, 150);
        assert_eq!(config.grid_columns, 4);
        assert!((1..=MAX_WORKERS).contains(&config.workers));
    }

    #[test]
    fn test_album_directories_join_root() {
        let config = GalleryConfig::builder().album_root("/srv/gallery").build();
        let dirs: Vec<(&str, PathBuf)> = config.album_directories().collect();
        assert_eq!(dirs[0], ("Cars", PathBuf::from("/srv/gallery/cars")));
        assert_eq!(dirs[2], ("Shoes", PathBuf::from("/srv/gallery/shoes")));
    }

    #[test]
    fn test_builder_clamps_workers() {
        let config = GalleryConfig::builder().workers(0).build();
        assert_eq!(config.workers, 1);

        let config = GalleryConfig::builder().workers(64).build();
        assert_eq!(config.workers, MAX_WORKERS);
    }

    #[test]
    fn test_builder_replaces_albums() {
        let config = GalleryConfig::builder()
            .albums([("Trips", "trips")])
            .thumb_width(0)
            .build();
        assert_eq!(config.albums, vec![("Trips".to_string(), PathBuf::from("trips"))]);
        assert_eq!(config.thumb_width, 1);
    }
}
