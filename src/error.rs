use std::path::PathBuf;

use thiserror::Error;

use crate::navigation::{NavAction, Screen};

pub type Result<T> = std::result::Result<T, GalleryError>;

/// Every failure in the gallery is local and recoverable; none of these
/// should take the process down.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("Album not found: {0}")]
    AlbumNotFound(String),

    #[error("Album directory does not exist: {0:?}")]
    DirectoryMissing(PathBuf),

    #[error("Album path is not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("Album directory cannot be read: {path:?}: {message}")]
    DirectoryUnreadable { path: PathBuf, message: String },

    #[error("Failed to decode {path:?}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Image index {index} is out of range (album has {len} images)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot {action:?} from the {screen:?} screen")]
    InvalidTransition { action: NavAction, screen: Screen },

    #[error("Decode workers have stopped")]
    WorkersStopped,

    #[error("Failed to start worker thread: {0}")]
    Worker(#[from] std::io::Error),
}

impl GalleryError {
    /// Wrap a decode failure, keeping the full context chain in the message.
    pub fn decode(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        Self::Decode {
            path: path.into(),
            message: format!("{:#}", err),
        }
    }

    /// Configuration errors leave the UI on its current screen.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::AlbumNotFound(_)
                | Self::DirectoryMissing(_)
                | Self::NotADirectory(_)
                | Self::DirectoryUnreadable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keeps_context_chain() {
        let err = anyhow::anyhow!("bad header").context("Failed to decode image");
        let err = GalleryError::decode("/albums/cars/a.png", err);
        let text = err.to_string();
        assert!(text.contains("Failed to decode image"));
        assert!(text.contains("bad header"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(GalleryError::AlbumNotFound("Boats".into()).is_configuration());
        assert!(GalleryError::DirectoryMissing("/nope".into()).is_configuration());
        let unreadable = GalleryError::DirectoryUnreadable {
            path: "/locked".into(),
            message: "Permission denied".into(),
        };
        assert!(unreadable.is_configuration());
        assert!(!GalleryError::IndexOutOfRange { index: 3, len: 2 }.is_configuration());
    }
}
