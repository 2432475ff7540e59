use ac_core::frame::FrameBuffer;
use anyhow::{Context, Result};
use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer as FirResizer};

/// Resizer réutilisable wrappant fast_image_resize (RGBA8).
///
/// # Example
/// ```
/// use ac_core::frame::FrameBuffer;
/// use ac_source::resize::Resizer;
///
/// let mut r = Resizer::new();
/// let src = FrameBuffer::new(100, 100);
/// let mut dst = FrameBuffer::new(50, 25);
/// r.resize_into(&src, &mut dst).unwrap();
/// assert_eq!(dst.data.len(), 50 * 25 * 4);
/// ```
pub struct Resizer {
    inner: FirResizer,
    options: ResizeOptions,
}

impl Resizer {
    /// Filtre bilinéaire : suffisant pour une source destinée à être moyennée.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: FirResizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        }
    }

    /// Redimensionne `src` dans `dst` ; la taille de `dst` fixe la sortie.
    ///
    /// # Errors
    /// Returns an error if either buffer does not match its dimensions.
    pub fn resize_into(&mut self, src: &FrameBuffer, dst: &mut FrameBuffer) -> Result<()> {
        if src.width == dst.width && src.height == dst.height {
            dst.data.copy_from_slice(&src.data);
            return Ok(());
        }

        let src_image = ImageRef::new(src.width, src.height, &src.data, PixelType::U8x4)
            .context("dimensions source invalides")?;
        let mut dst_image =
            Image::from_slice_u8(dst.width, dst.height, &mut dst.data, PixelType::U8x4)
                .context("dimensions destination invalides")?;

        self.inner
            .resize(&src_image, &mut dst_image, Some(&self.options))
            .context("redimensionnement impossible")?;
        Ok(())
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Dimensions réduites pour que le plus grand côté tienne dans `max_side`,
/// ratio conservé. Jamais d'agrandissement.
///
/// # Example
/// ```
/// use ac_source::resize::fit_within;
/// assert_eq!(fit_within(4000, 3000, 1000), (1000, 750));
/// assert_eq!(fit_within(640, 480, 1000), (640, 480));
/// ```
#[must_use]
pub fn fit_within(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return (width, height);
    }
    let scale = f64::from(max_side) / f64::from(longest);
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

/// Réduit `src` si son plus grand côté dépasse `max_side`.
///
/// # Errors
/// Returns an error if the resize operation fails.
pub fn downscale_to_fit(src: FrameBuffer, max_side: u32) -> Result<FrameBuffer> {
    let (w, h) = fit_within(src.width, src.height, max_side);
    if (w, h) == (src.width, src.height) {
        return Ok(src);
    }
    let mut dst = FrameBuffer::new(w, h);
    Resizer::new().resize_into(&src, &mut dst)?;
    log::debug!("source réduite {}x{} → {w}x{h}", src.width, src.height);
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::Rgb;

    #[test]
    fn fit_keeps_aspect_for_portrait() {
        assert_eq!(fit_within(1080, 1920, 960), (540, 960));
    }

    #[test]
    fn fit_never_collapses_to_zero() {
        assert_eq!(fit_within(10_000, 1, 100), (100, 1));
    }

    #[test]
    fn downscale_preserves_uniform_colour() {
        let src = FrameBuffer::solid(400, 200, Rgb::new(40, 80, 120));
        let dst = downscale_to_fit(src, 100).unwrap();
        assert_eq!((dst.width, dst.height), (100, 50));
        assert_eq!(dst.pixel(50, 25), (40, 80, 120, 255));
    }

    #[test]
    fn small_source_is_returned_untouched() {
        let src = FrameBuffer::solid(10, 10, Rgb::WHITE);
        let dst = downscale_to_fit(src.clone(), 100).unwrap();
        assert_eq!(src, dst);
    }
}
