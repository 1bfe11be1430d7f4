//! Thumbnail generation using the image crate.
//!
//! Thumbnails have a fixed target width with the height following the
//! source aspect ratio. Sources narrower than the target are not upscaled.

use std::path::Path;

use anyhow::Result;
use image::imageops::FilterType;
use image::GenericImageView;
use tracing::debug;

use crate::image_loader::{self, DecodedImage};

/// Maximum height for thumbnails (to handle extreme portraits).
const MAX_THUMB_HEIGHT: u32 = 1024;

/// Creates downscaled previews for the grid.
pub struct ThumbnailGenerator;

impl ThumbnailGenerator {
    /// Decode `src` and downscale it to `target_width`.
    pub fn generate(src: &Path, target_width: u32) -> Result<DecodedImage> {
        let img = image_loader::open_image(src)?;
        let (src_width, src_height) = img.dimensions();

        let (thumb_width, thumb_height) =
            Self::calculate_dimensions(src_width, src_height, target_width);

        debug!(
            ?src,
            src_width, src_height, thumb_width, thumb_height, "Generating thumbnail"
        );

        let thumbnail = if (thumb_width, thumb_height) == (src_width, src_height) {
            img
        } else {
            // CatmullRom provides good quality/speed balance for downscaling
            img.resize_exact(thumb_width, thumb_height, FilterType::CatmullRom)
        };

        Ok(DecodedImage::from_dynamic(thumbnail))
    }

    /// Calculate thumbnail dimensions preserving aspect ratio.
    ///
    /// The width never exceeds `target_width`. Height is clamped to
    /// 1..=MAX_THUMB_HEIGHT; when the upper bound applies the width shrinks
    /// to keep the ratio.
    pub(crate) fn calculate_dimensions(
        src_width: u32,
        src_height: u32,
        target_width: u32,
    ) -> (u32, u32) {
        if src_width == 0 || src_height == 0 {
            return (target_width.max(1), target_width.max(1));
        }

        let effective_width = target_width.min(src_width).max(1);

        let aspect_ratio = src_width as f64 / src_height as f64;
        let calculated_height = (effective_width as f64 / aspect_ratio).round() as u32;

        let final_height = calculated_height.clamp(1, MAX_THUMB_HEIGHT);

        let final_width = if final_height != calculated_height {
            ((final_height as f64 * aspect_ratio).round() as u32).min(effective_width)
        } else {
            effective_width
        };

        (final_width.max(1), final_height.max(1))
    }
}
