use std::path::Path;

use ac_core::frame::FrameBuffer;
use ac_core::traits::FrameSource;
use anyhow::{Context, Result};

use crate::resize::downscale_to_fit;

/// Source d'image statique : le même snapshot à chaque passe.
///
/// # Example
/// ```
/// use ac_core::traits::FrameSource;
/// use ac_core::{FrameBuffer, Rgb};
/// use ac_source::ImageSource;
///
/// let mut source = ImageSource::from_frame(FrameBuffer::solid(4, 4, Rgb::WHITE));
/// assert_eq!(source.snapshot().map(|f| f.width), Some(4));
/// ```
pub struct ImageSource {
    frame: FrameBuffer,
}

impl ImageSource {
    /// Charge une image (PNG, JPEG, BMP, GIF) ; le plus grand côté est
    /// réduit à `max_side` si fourni.
    ///
    /// # Errors
    /// Returns an error if the image cannot be decoded or resized.
    pub fn open(path: &Path, max_side: Option<u32>) -> Result<Self> {
        let mut frame = load_image(path)?;
        if let Some(max) = max_side {
            frame = downscale_to_fit(frame, max)?;
        }
        log::info!(
            "image chargée : {}x{} depuis {}",
            frame.width,
            frame.height,
            path.display()
        );
        Ok(Self { frame })
    }

    #[must_use]
    pub fn from_frame(frame: FrameBuffer) -> Self {
        Self { frame }
    }

    #[must_use]
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }
}

impl FrameSource for ImageSource {
    fn snapshot(&mut self) -> Option<&FrameBuffer> {
        Some(&self.frame)
    }
}

/// Décode un fichier image en buffer RGBA.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<FrameBuffer> {
    let img = image::open(path)
        .with_context(|| format!("impossible de charger {}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(FrameBuffer::from_rgba(width, height, rgba.into_raw())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, w: u32, h: u32) -> std::path::PathBuf {
        let path = dir.join("frame.png");
        let img = image::RgbaImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn loads_png_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 4, 2);
        let mut source = ImageSource::open(&path, None).unwrap();
        let frame = source.snapshot().unwrap();
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.pixel(0, 0), (0, 0, 0, 255));
        assert_eq!(frame.pixel(3, 1), (255, 255, 255, 255));
    }

    #[test]
    fn caps_the_longest_side() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), 64, 32);
        let source = ImageSource::open(&path, Some(16)).unwrap();
        assert_eq!((source.frame().width, source.frame().height), (16, 8));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSource::open(&dir.path().join("absent.png"), None).is_err());
    }
}
