use std::collections::HashMap;
use std::path::Path;

use ab_glyph::{Font, FontArc, FontVec, PxScale, ScaleFont, point};
use ac_core::config::AsciiConfig;
use ac_core::frame::{FrameBuffer, Grid};
use anyhow::{Context, Result};

/// DejaVu Sans Mono, servie pour la famille générique `monospace`.
static MONOSPACE_TTF: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Familles génériques résolues vers la police embarquée.
const GENERIC_FAMILIES: [&str; 3] = ["monospace", "mono", "dejavu sans mono"];

/// Registre des polices disponibles pour le Renderer.
///
/// L'index 0 est toujours la police monospace embarquée ; toute famille
/// inconnue s'y résout.
///
/// # Example
/// ```
/// use ac_render::raster::FontBook;
/// let book = FontBook::new().unwrap();
/// assert_eq!(book.resolve("monospace"), 0);
/// assert_eq!(book.resolve("Comic Sans"), 0);
/// ```
pub struct FontBook {
    fonts: Vec<(String, FontArc)>,
}

impl FontBook {
    /// Registre contenant uniquement la police embarquée.
    ///
    /// # Errors
    /// Returns an error if the embedded font cannot be parsed.
    pub fn new() -> Result<Self> {
        let mono = FontArc::try_from_slice(MONOSPACE_TTF).context("police monospace embarquée")?;
        Ok(Self {
            fonts: vec![("monospace".to_string(), mono)],
        })
    }

    /// Charge un fichier TTF/OTF sous le nom de famille `family`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid font.
    pub fn load(&mut self, family: &str, path: &Path) -> Result<usize> {
        let bytes =
            std::fs::read(path).with_context(|| format!("lecture police {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("police invalide : {}", path.display()))?;
        self.fonts.push((family.to_string(), FontArc::new(font)));
        log::debug!("police '{family}' chargée depuis {}", path.display());
        Ok(self.fonts.len() - 1)
    }

    /// Index de la police pour une famille (insensible à la casse).
    ///
    /// La dernière police chargée sous un nom l'emporte, y compris sur la
    /// police embarquée pour `monospace`.
    #[must_use]
    pub fn resolve(&self, family: &str) -> usize {
        let wanted = family.trim().to_lowercase();
        self.fonts
            .iter()
            .rposition(|(name, _)| name.to_lowercase() == wanted)
            .unwrap_or(0)
    }

    /// `true` si la famille est connue, sans repli.
    #[must_use]
    pub fn has_family(&self, family: &str) -> bool {
        let wanted = family.trim().to_lowercase();
        GENERIC_FAMILIES.contains(&wanted.as_str())
            || self.fonts.iter().any(|(name, _)| name.to_lowercase() == wanted)
    }

    fn font(&self, index: usize) -> &FontArc {
        &self.fonts[index.min(self.fonts.len() - 1)].1
    }
}

/// Masque de couverture d'un glyphe, positionné relativement au coin
/// haut-gauche de sa cellule.
struct GlyphMask {
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    coverage: Vec<u8>,
}

impl GlyphMask {
    const EMPTY: Self = Self {
        left: 0,
        top: 0,
        width: 0,
        height: 0,
        coverage: Vec::new(),
    };

    /// Rasterise `ch` à `size_px` (taille em, comme une police CSS), aligné en haut.
    fn rasterize(font: &FontArc, ch: char, size_px: u32) -> Self {
        let glyph_id = font.glyph_id(ch);
        // .notdef : rien à peindre plutôt qu'une boîte de substitution.
        if glyph_id.0 == 0 {
            return Self::EMPTY;
        }
        let units_per_em = font.units_per_em().unwrap_or_else(|| font.height_unscaled());
        let scale = PxScale::from(size_px as f32 * font.height_unscaled() / units_per_em);
        let ascent = font.as_scaled(scale).ascent();
        let glyph = glyph_id.with_scale_and_position(scale, point(0.0, ascent));

        let Some(outline) = font.outline_glyph(glyph) else {
            return Self::EMPTY;
        };
        let bounds = outline.px_bounds();
        let width = bounds.width().max(0.0) as u32;
        let height = bounds.height().max(0.0) as u32;
        let mut coverage = vec![0u8; width as usize * height as usize];
        outline.draw(|x, y, c| {
            if x < width && y < height {
                coverage[(y * width + x) as usize] = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        });
        Self {
            left: bounds.min.x as i32,
            top: bounds.min.y as i32,
            width,
            height,
            coverage,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct GlyphKey {
    font: usize,
    ch: char,
    size: u32,
}

/// Peint une grille de glyphes sur une surface RGBA.
///
/// Les masques sont mis en cache par (police, caractère, taille) : une
/// passe ne rasterise que les glyphes jamais vus.
pub struct Renderer {
    fonts: FontBook,
    cache: HashMap<GlyphKey, GlyphMask>,
    last_family: Option<String>,
}

impl Renderer {
    /// Renderer sur la seule police embarquée.
    ///
    /// # Errors
    /// Returns an error if the embedded font cannot be parsed.
    pub fn new() -> Result<Self> {
        Ok(Self::with_fonts(FontBook::new()?))
    }

    #[must_use]
    pub fn with_fonts(fonts: FontBook) -> Self {
        Self {
            fonts,
            cache: HashMap::new(),
            last_family: None,
        }
    }

    pub fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    /// Nombre de masques en cache.
    #[must_use]
    pub fn cached_glyphs(&self) -> usize {
        self.cache.len()
    }

    /// Repeint entièrement `target` avec `grid`.
    ///
    /// La surface prend la taille du buffer source (`source_size`), pas
    /// celle de la grille, puis est remplie de noir opaque. Chaque cellule
    /// occupe `largeur / W × hauteur / H` pixels et son glyphe y est
    /// dessiné aligné en haut, dans la couleur de la cellule.
    ///
    /// # Example
    /// ```
    /// use ac_core::{AsciiConfig, FrameBuffer, Grid};
    /// use ac_render::Renderer;
    ///
    /// let mut renderer = Renderer::new().unwrap();
    /// let mut surface = FrameBuffer::default();
    /// renderer.render(&Grid::new(4, 2), (64, 32), &mut surface, &AsciiConfig::default());
    /// assert_eq!((surface.width, surface.height), (64, 32));
    /// assert_eq!(surface.pixel(10, 10), (0, 0, 0, 255));
    /// ```
    pub fn render(
        &mut self,
        grid: &Grid,
        source_size: (u32, u32),
        target: &mut FrameBuffer,
        config: &AsciiConfig,
    ) {
        let (width, height) = source_size;
        target.resize(width, height);
        target.fill([0, 0, 0, 255]);
        if width == 0 || height == 0 || grid.width == 0 || grid.height == 0 {
            return;
        }

        let font = self.resolve_font(&config.font_family);
        let size = config.font_size;
        let pitch_x = width as f32 / f32::from(grid.width);
        let pitch_y = height as f32 / f32::from(grid.height);

        for (row, cells) in grid.rows().enumerate() {
            let origin_y = (row as f32 * pitch_y).round() as i32;
            for (col, cell) in cells.iter().enumerate() {
                if cell.ch == ' ' {
                    continue;
                }
                let key = GlyphKey {
                    font,
                    ch: cell.ch,
                    size,
                };
                let fonts = &self.fonts;
                let mask = self
                    .cache
                    .entry(key)
                    .or_insert_with(|| GlyphMask::rasterize(fonts.font(font), cell.ch, size));
                let origin_x = (col as f32 * pitch_x).round() as i32;
                let c = cell.color.rgb();
                blit(target, mask, origin_x, origin_y, [c.r, c.g, c.b]);
            }
        }
    }

    fn resolve_font(&mut self, family: &str) -> usize {
        if self.last_family.as_deref() != Some(family) {
            if !self.fonts.has_family(family) {
                log::warn!("famille de police '{family}' inconnue, repli sur monospace");
            }
            self.last_family = Some(family.to_string());
        }
        self.fonts.resolve(family)
    }
}

/// Mélange un masque sur la surface (fond opaque), clippé aux bords.
fn blit(target: &mut FrameBuffer, mask: &GlyphMask, origin_x: i32, origin_y: i32, rgb: [u8; 3]) {
    let tw = target.width as i32;
    let th = target.height as i32;
    for my in 0..mask.height as i32 {
        let py = origin_y + mask.top + my;
        if py < 0 || py >= th {
            continue;
        }
        for mx in 0..mask.width as i32 {
            let px = origin_x + mask.left + mx;
            if px < 0 || px >= tw {
                continue;
            }
            let alpha = mask.coverage[(my as u32 * mask.width + mx as u32) as usize];
            if alpha == 0 {
                continue;
            }
            let a = f32::from(alpha) / 255.0;
            let idx = (py as usize * target.width as usize + px as usize) * 4;
            for (k, &src) in rgb.iter().enumerate() {
                let dst = f32::from(target.data[idx + k]);
                target.data[idx + k] = (f32::from(src) * a + dst * (1.0 - a)).round() as u8;
            }
            target.data[idx + 3] = 255;
        }
    }
}
