use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, ImageReader};

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded RGBA8 bitmap ready to be turned into a texture.
///
/// Pixels are shared, so clones handed to several callers are cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl DecodedImage {
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            pixels: Arc::from(rgba.into_raw()),
        }
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.len()
    }
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Opens an image, sniffing the format from its bytes rather than trusting
/// the extension.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to guess image format")?;

    if reader.format().is_none() {
        return Err(anyhow!("Unrecognized image format: {:?}", path));
    }

    reader
        .decode()
        .with_context(|| format!("Failed to decode image: {:?}", path))
}

/// Decodes an image at native resolution.
pub fn decode_full(path: &Path) -> Result<DecodedImage> {
    open_image(path).map(DecodedImage::from_dynamic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_decode_full_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("red.png");
        RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let decoded = decode_full(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.stride(), 12);
        assert_eq!(decoded.memory_bytes(), 24);
        assert_eq!(&decoded.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_format_is_sniffed_not_taken_from_extension() {
        let dir = tempdir().unwrap();
        let png = dir.path().join("real.png");
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]))
            .save(&png)
            .unwrap();
        let misnamed = dir.path().join("misnamed.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let decoded = decode_full(&misnamed).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 2));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(open_image(&path).is_err());
    }

    #[test]
    fn test_missing_file_mentions_path() {
        let err = open_image(Path::new("/no/such/file.png")).unwrap_err();
        assert!(format!("{:#}", err).contains("file.png"));
    }
}
