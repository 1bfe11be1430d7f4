//! Core of the albumview image gallery.
//!
//! Everything here is toolkit-independent: the album table, directory
//! scanning, the navigation state machine and the background decoders. The
//! GTK front-end lives in the binary behind the `gui` feature.

pub mod albums;
pub mod config;
pub mod context;
pub mod error;
pub mod full_image;
pub mod image_loader;
pub mod models;
pub mod navigation;
pub mod scanner;
pub mod thumbnails;

pub use albums::{Album, AlbumRegistry};
pub use config::GalleryConfig;
pub use context::GalleryContext;
pub use error::{GalleryError, Result};
pub use navigation::{NavAction, NavigationController, Screen};
