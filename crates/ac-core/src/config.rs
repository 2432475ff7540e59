use std::ops::RangeInclusive;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::charset::{CHARSET_CLASSIC, COLOUR_PRESETS};
use crate::color::Rgb;
use crate::error::CoreError;

/// Bornes de la grille de sortie (en cellules).
pub const GRID_DIM_RANGE: RangeInclusive<u16> = 1..=300;
/// Bornes de la taille de police (px).
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 1..=32;
/// Bornes du contraste (1.0 = neutre).
pub const CONTRAST_RANGE: RangeInclusive<f32> = 0.0..=2.0;
/// Bornes de la luminosité (0.0 = neutre).
pub const BRIGHTNESS_RANGE: RangeInclusive<f32> = -1.0..=1.0;
/// Bornes du scheduler temps réel.
pub const FPS_RANGE: RangeInclusive<u32> = 15..=120;

/// Configuration complète de la conversion et du rendu.
///
/// Valeur immuable pour la durée d'une passe : le pipeline l'emprunte,
/// ne la modifie jamais. Sérialisable en TOML.
///
/// # Example
/// ```
/// use ac_core::config::AsciiConfig;
/// let config = AsciiConfig::default();
/// assert_eq!((config.output_width, config.output_height), (100, 75));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AsciiConfig {
    /// Largeur de la grille, en cellules [1, 300].
    pub output_width: u16,
    /// Hauteur de la grille, en cellules [1, 300].
    pub output_height: u16,
    /// Glyphes ordonnés : le premier va aux pixels les plus lumineux.
    pub chars: String,
    /// Famille de police (Renderer uniquement).
    pub font_family: String,
    /// Taille de police en px [1, 32] (Renderer uniquement).
    pub font_size: u32,
    /// Couleur forcée. `None` = couleur échantillonnée.
    pub colour: Option<Rgb>,
    /// Re-planifier une passe après chaque rendu.
    pub animate: bool,
    /// Multiplicateur de contraste. 1.0 = neutre.
    pub contrast: f32,
    /// Décalage de luminosité. 0.0 = neutre.
    pub brightness: f32,
    /// Cadence du scheduler temps réel.
    pub target_fps: u32,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            output_width: 100,
            output_height: 75,
            chars: CHARSET_CLASSIC.to_string(),
            font_family: "monospace".to_string(),
            font_size: 14,
            colour: Some(COLOUR_PRESETS[1]),
            animate: true,
            contrast: 1.0,
            brightness: 0.0,
            target_fps: 60,
        }
    }
}

impl AsciiConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization and CLI overrides.
    ///
    /// `chars` is left untouched: an empty set is reported by [`Self::validate`].
    pub fn clamp_all(&mut self) {
        self.output_width = self
            .output_width
            .clamp(*GRID_DIM_RANGE.start(), *GRID_DIM_RANGE.end());
        self.output_height = self
            .output_height
            .clamp(*GRID_DIM_RANGE.start(), *GRID_DIM_RANGE.end());
        self.font_size = self
            .font_size
            .clamp(*FONT_SIZE_RANGE.start(), *FONT_SIZE_RANGE.end());
        self.contrast = self
            .contrast
            .clamp(*CONTRAST_RANGE.start(), *CONTRAST_RANGE.end());
        self.brightness = self
            .brightness
            .clamp(*BRIGHTNESS_RANGE.start(), *BRIGHTNESS_RANGE.end());
        self.target_fps = self.target_fps.clamp(*FPS_RANGE.start(), *FPS_RANGE.end());
    }

    /// Check the invariants the pipeline relies on.
    ///
    /// # Errors
    /// [`CoreError::EmptyCharset`] if `chars` has no glyph,
    /// [`CoreError::InvalidDimensions`] if the grid is outside 1..=300.
    ///
    /// # Example
    /// ```
    /// use ac_core::config::AsciiConfig;
    /// use ac_core::CoreError;
    /// let config = AsciiConfig { chars: String::new(), ..AsciiConfig::default() };
    /// assert_eq!(config.validate(), Err(CoreError::EmptyCharset));
    /// ```
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.chars.is_empty() {
            return Err(CoreError::EmptyCharset);
        }
        if !GRID_DIM_RANGE.contains(&self.output_width)
            || !GRID_DIM_RANGE.contains(&self.output_height)
        {
            return Err(CoreError::InvalidDimensions {
                width: u32::from(self.output_width),
                height: u32::from(self.output_height),
            });
        }
        Ok(())
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    render: Option<RenderSection>,
}

/// Render section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct RenderSection {
    output_width: Option<u16>,
    output_height: Option<u16>,
    chars: Option<String>,
    font_family: Option<String>,
    font_size: Option<u32>,
    /// `""` désactive la couleur forcée.
    colour: Option<String>,
    animate: Option<bool>,
    contrast: Option<f32>,
    brightness: Option<f32>,
    target_fps: Option<u32>,
}

/// Parse un document TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the document is not valid TOML or a colour is malformed.
///
/// # Example
/// ```
/// use ac_core::config::parse_config;
/// let config = parse_config("[render]\noutput_width = 500\ncolour = \"\"").unwrap();
/// assert_eq!(config.output_width, 300);
/// assert_eq!(config.colour, None);
/// ```
pub fn parse_config(content: &str) -> Result<AsciiConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = AsciiConfig::default();

    if let Some(r) = file.render {
        if let Some(v) = r.output_width {
            config.output_width = v;
        }
        if let Some(v) = r.output_height {
            config.output_height = v;
        }
        if let Some(v) = r.chars {
            config.chars = v;
        }
        if let Some(v) = r.font_family {
            config.font_family = v;
        }
        if let Some(v) = r.font_size {
            config.font_size = v;
        }
        if let Some(v) = r.colour {
            config.colour = if v.trim().is_empty() {
                None
            } else {
                Some(v.parse::<Rgb>()?)
            };
        }
        if let Some(v) = r.animate {
            config.animate = v;
        }
        if let Some(v) = r.contrast {
            config.contrast = v;
        }
        if let Some(v) = r.brightness {
            config.brightness = v;
        }
        if let Some(v) = r.target_fps {
            config.target_fps = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use ac_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AsciiConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Config invalide : {}", path.display()))
}
