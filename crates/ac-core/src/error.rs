use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The configured character set contains no glyph.
    #[error("Configuration invalide : le jeu de caractères est vide")]
    EmptyCharset,

    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// A colour string that is not `#RGB` or `#RRGGBB`.
    #[error("Couleur invalide : {0:?}")]
    InvalidColour(String),

    /// Pixel data whose length does not match `width * height * 4`.
    #[error("Taille de buffer invalide : {actual} octets pour {width}×{height} (attendu {expected})")]
    BufferSize {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },
}
