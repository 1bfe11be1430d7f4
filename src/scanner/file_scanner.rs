//! Lists the images of one album directory.
//!
//! - Non-recursive: only direct children of the album directory
//! - Extension filter: `png`, `jpg`, `jpeg`, case-insensitive
//! - Deterministic order: file name compared case-insensitively, ties broken
//!   by the exact name, so next/previous behaves the same on every platform

use std::cmp::Ordering;
use std::path::Path;

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{GalleryError, Result};
use crate::models::ImageEntry;

/// Lists the image files directly inside `dir`.
///
/// Fails with `DirectoryMissing` or `NotADirectory` before touching any
/// entries, and with `DirectoryUnreadable` when the directory itself cannot
/// be listed. Unreadable child entries are logged and skipped. Never decodes.
pub fn list_images(dir: &Path) -> Result<Vec<ImageEntry>> {
    if !dir.exists() {
        return Err(GalleryError::DirectoryMissing(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(GalleryError::NotADirectory(dir.to_path_buf()));
    }

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1);

    let mut entries = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // Depth 0 is the album directory itself
            Err(e) if e.depth() == 0 => {
                return Err(GalleryError::DirectoryUnreadable {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!(?dir, error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match ImageEntry::new(entry.into_path()) {
            Some(image) => entries.push(image),
            None => continue,
        }
    }

    sort_entries(&mut entries);

    debug!(?dir, count = entries.len(), "Listed album directory");
    trace!(?entries, "Album entries");

    Ok(entries)
}

/// Sorts entries by file name, case-insensitively, ties broken by exact name.
pub fn sort_entries(entries: &mut [ImageEntry]) {
    entries.sort_by(|a, b| compare_names(&a.file_name(), &b.file_name()));
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
