use ac_core::charset::reversed_glyphs;
use ac_core::color::Rgb;
use ac_core::config::AsciiConfig;
use ac_core::error::CoreError;
use ac_core::frame::{Cell, CellColor};

/// Luminance perceptuelle BT.709 sur des canaux [0, 255].
///
/// # Example
/// ```
/// use ac_ascii::tone::luminance;
/// assert!((luminance([255.0, 255.0, 255.0]) - 255.0).abs() < 1e-3);
/// assert_eq!(luminance([0.0, 0.0, 0.0]), 0.0);
/// ```
#[inline(always)]
#[must_use]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
}

/// Applique contraste et luminosité à un canal [0, 255].
///
/// Contraste : multiplication autour de 0.5. Luminosité : décalage.
/// Résultat clampé à [0, 255].
///
/// # Example
/// ```
/// use ac_ascii::tone::adjust_channel;
/// assert!((adjust_channel(200.0, 1.0, 0.0) - 200.0).abs() < 1e-3);
/// assert_eq!(adjust_channel(200.0, 2.0, 0.0), 255.0);
/// assert_eq!(adjust_channel(100.0, 1.0, -1.0), 0.0);
/// ```
#[inline(always)]
#[must_use]
pub fn adjust_channel(value: f32, contrast: f32, brightness: f32) -> f32 {
    let adjusted = ((value / 255.0 - 0.5) * contrast + 0.5) * 255.0 + brightness * 255.0;
    adjusted.clamp(0.0, 255.0)
}

/// Tone mapping + sélection de glyphe pour une passe.
///
/// Le jeu de caractères est inversé une seule fois à la construction :
/// le premier glyphe de `chars` va aux pixels les plus lumineux, le
/// dernier aux plus sombres.
///
/// # Example
/// ```
/// use ac_ascii::tone::ToneMapper;
/// use ac_core::AsciiConfig;
///
/// let config = AsciiConfig { chars: "AB".into(), colour: None, ..AsciiConfig::default() };
/// let tone = ToneMapper::new(&config).unwrap();
/// assert_eq!(tone.map([255.0; 3]).ch, 'A');
/// assert_eq!(tone.map([0.0; 3]).ch, 'B');
/// ```
#[derive(Clone, Debug)]
pub struct ToneMapper {
    reversed: Vec<char>,
    contrast: f32,
    brightness: f32,
    colour: Option<Rgb>,
}

impl ToneMapper {
    /// # Errors
    /// [`CoreError::EmptyCharset`] if `config.chars` is empty.
    pub fn new(config: &AsciiConfig) -> Result<Self, CoreError> {
        let reversed = reversed_glyphs(&config.chars);
        if reversed.is_empty() {
            return Err(CoreError::EmptyCharset);
        }
        Ok(Self {
            reversed,
            contrast: config.contrast,
            brightness: config.brightness,
            colour: config.colour,
        })
    }

    /// Canaux ajustés.
    #[inline]
    #[must_use]
    pub fn adjust(&self, rgb: [f32; 3]) -> [f32; 3] {
        rgb.map(|c| adjust_channel(c, self.contrast, self.brightness))
    }

    /// Index dans le jeu inversé : `round(L / 255 · (n − 1))`.
    #[inline]
    #[must_use]
    pub fn glyph_index(&self, luminance: f32) -> usize {
        let last = self.reversed.len() - 1;
        let idx = ((luminance / 255.0) * last as f32).round();
        (idx.max(0.0) as usize).min(last)
    }

    /// Glyphe pour une luminance déjà ajustée.
    #[inline]
    #[must_use]
    pub fn glyph(&self, luminance: f32) -> char {
        self.reversed[self.glyph_index(luminance)]
    }

    /// Cellule complète pour une moyenne brute de la source.
    #[must_use]
    pub fn map(&self, average: [f32; 3]) -> Cell {
        let adjusted = self.adjust(average);
        let ch = self.glyph(luminance(adjusted));
        let color = match self.colour {
            Some(c) => CellColor::Override(c),
            None => CellColor::Sampled(Rgb::from_f32(adjusted)),
        };
        Cell { ch, color }
    }
}
