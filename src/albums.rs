//! Album registry: the fixed name -> directory table.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::GalleryConfig;
use crate::error::{GalleryError, Result};

/// A named collection of images backed by one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub name: String,
    pub directory: PathBuf,
}

impl Album {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
        }
    }
}

/// Ordered, immutable set of albums created at startup.
#[derive(Debug, Clone, Default)]
pub struct AlbumRegistry {
    albums: Vec<Album>,
}

impl AlbumRegistry {
    /// Build a registry, keeping the first definition of any duplicated name.
    pub fn new(albums: impl IntoIterator<Item = Album>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for album in albums {
            if seen.insert(album.name.clone()) {
                kept.push(album);
            } else {
                warn!(name = %album.name, directory = ?album.directory, "Ignoring duplicate album");
            }
        }
        Self { albums: kept }
    }

    pub fn from_config(config: &GalleryConfig) -> Self {
        Self::new(
            config
                .album_directories()
                .map(|(name, dir)| Album::new(name, dir)),
        )
    }

    /// Album names in table order.
    pub fn list_albums(&self) -> Vec<&str> {
        self.albums.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Album> {
        self.albums.iter().find(|a| a.name == name)
    }

    pub fn resolve(&self, name: &str) -> Result<&Path> {
        self.get(name)
            .map(|a| a.directory.as_path())
            .ok_or_else(|| GalleryError::AlbumNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.albums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }
}
