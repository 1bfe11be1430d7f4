//! Screen state machine for the gallery.
//!
//! ```text
//! AlbumSelect --select_album--> ThumbnailGrid --select_thumbnail--> FullImage
//!      ^                            |   ^                              |
//!      +------------back------------+   +------------back--------------+
//! ```
//!
//! `next` and `previous` move the cursor inside FullImage and stop at the
//! ends; there is no wraparound.

use tracing::{debug, info, warn};

use crate::albums::{Album, AlbumRegistry};
use crate::error::{GalleryError, Result};
use crate::models::ImageEntry;
use crate::scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    AlbumSelect,
    ThumbnailGrid,
    FullImage,
}

/// User actions that do not carry a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    SelectAlbum,
    SelectThumbnail,
    Next,
    Previous,
    Back,
}

#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    pub screen: Screen,
    pub album: Option<Album>,
    pub images: Vec<ImageEntry>,
    pub index: usize,
}

/// Owns the navigation state; only user actions mutate it.
#[derive(Debug, Default)]
pub struct NavigationController {
    state: NavigationState,
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen
    }

    pub fn current_album(&self) -> Option<&Album> {
        self.state.album.as_ref()
    }

    pub fn images(&self) -> &[ImageEntry] {
        &self.state.images
    }

    pub fn current_index(&self) -> usize {
        self.state.index
    }

    /// The image under the cursor while the full view is showing.
    pub fn current_image(&self) -> Option<&ImageEntry> {
        match self.state.screen {
            Screen::FullImage => self.state.images.get(self.state.index),
            _ => None,
        }
    }

    /// Open an album and switch to its grid.
    ///
    /// Lists the directory but never decodes. On any failure the state is
    /// left untouched and the error is logged and returned for display.
    pub fn select_album(
        &mut self,
        registry: &AlbumRegistry,
        name: &str,
    ) -> Result<&[ImageEntry]> {
        self.expect_screen(Screen::AlbumSelect, NavAction::SelectAlbum)?;

        let listed = registry
            .get(name)
            .ok_or_else(|| GalleryError::AlbumNotFound(name.to_string()))
            .and_then(|album| {
                scanner::list_images(&album.directory).map(|images| (album, images))
            });

        let (album, images) = match listed {
            Ok(found) => found,
            Err(e) => {
                warn!(album = name, error = %e, "Failed to open album");
                return Err(e);
            }
        };

        info!(album = name, images = images.len(), "Opened album");

        self.state = NavigationState {
            screen: Screen::ThumbnailGrid,
            album: Some(album.clone()),
            images,
            index: 0,
        };
        Ok(&self.state.images)
    }

    /// Open the image at grid position `index`.
    pub fn select_thumbnail(&mut self, index: usize) -> Result<&ImageEntry> {
        self.expect_screen(Screen::ThumbnailGrid, NavAction::SelectThumbnail)?;

        let len = self.state.images.len();
        if index >= len {
            warn!(index, len, "Thumbnail index out of range");
            return Err(GalleryError::IndexOutOfRange { index, len });
        }

        self.state.index = index;
        self.state.screen = Screen::FullImage;
        debug!(index, "Opened full image");
        Ok(&self.state.images[index])
    }

    /// Step forward; returns whether the cursor moved.
    pub fn next(&mut self) -> Result<bool> {
        self.expect_screen(Screen::FullImage, NavAction::Next)?;

        if self.state.index + 1 < self.state.images.len() {
            self.state.index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Step back; returns whether the cursor moved.
    pub fn previous(&mut self) -> Result<bool> {
        self.expect_screen(Screen::FullImage, NavAction::Previous)?;

        if self.state.index > 0 {
            self.state.index -= 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Go up one screen. The cursor is preserved; AlbumSelect stays put.
    pub fn back(&mut self) -> Screen {
        self.state.screen = match self.state.screen {
            Screen::FullImage => Screen::ThumbnailGrid,
            Screen::ThumbnailGrid | Screen::AlbumSelect => Screen::AlbumSelect,
        };
        self.state.screen
    }

    /// Apply a payload-free action. Returns whether the state changed.
    pub fn apply(&mut self, action: NavAction) -> Result<bool> {
        match action {
            NavAction::Next => self.next(),
            NavAction::Previous => self.previous(),
            NavAction::Back => {
                let before = self.state.screen;
                Ok(self.back() != before)
            }
            NavAction::SelectAlbum | NavAction::SelectThumbnail => {
                Err(GalleryError::InvalidTransition {
                    action,
                    screen: self.state.screen,
                })
            }
        }
    }

    fn expect_screen(&self, screen: Screen, action: NavAction) -> Result<()> {
        if self.state.screen == screen {
            Ok(())
        } else {
            Err(GalleryError::InvalidTransition {
                action,
                screen: self.state.screen,
            })
        }
    }
}
