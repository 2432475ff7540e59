use std::path::Path;

use ac_ascii::build;
use ac_core::config::AsciiConfig;
use ac_core::frame::FrameBuffer;
use ac_render::Renderer;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};

/// Écrit une surface RGBA rendue en PNG.
///
/// # Errors
/// Returns an error on an empty surface or if the file cannot be written.
pub fn save_png(surface: &FrameBuffer, path: &Path) -> Result<()> {
    if surface.width == 0 || surface.height == 0 {
        bail!("surface vide, rien à exporter");
    }
    image::save_buffer_with_format(
        path,
        &surface.data,
        surface.width,
        surface.height,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("écriture PNG {}", path.display()))?;
    log::info!(
        "PNG exporté : {}x{} → {}",
        surface.width,
        surface.height,
        path.display()
    );
    Ok(())
}

/// Rend `frame` en ASCII à sa taille d'origine puis l'écrit en PNG.
///
/// # Errors
/// Configuration errors from the grid builder, or write failures.
pub fn export_png(
    frame: &FrameBuffer,
    config: &AsciiConfig,
    renderer: &mut Renderer,
    path: &Path,
) -> Result<()> {
    let grid = build(frame, config)?;
    let mut surface = FrameBuffer::default();
    renderer.render(&grid, (frame.width, frame.height), &mut surface, config);
    save_png(&surface, path)
}

/// Nom de fichier d'export horodaté : `ascii-<ISO 8601>.<ext>`, avec `:`
/// et `.` remplacés par `-`.
///
/// # Example
/// ```
/// use ac_export::png::timestamped_name;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
/// assert_eq!(timestamped_name("png", at), "ascii-2024-03-09T14-05-07-000Z.png");
/// ```
#[must_use]
pub fn timestamped_name(ext: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("ascii-{stamp}.{ext}")
}
