use crate::color::Rgb;

/// Dense → clair. Le premier glyphe est attribué aux pixels les plus lumineux.
pub const CHARSET_CLASSIC: &str = "@%#*+=-:. ";

/// Binaire.
pub const CHARSET_BINARY: &str = "01";

/// Blocs Unicode, pseudo-pixels.
pub const CHARSET_SHADES: &str = "█▓▒░ ";

/// Barres verticales de hauteur décroissante.
pub const CHARSET_BARS: &str = "█▇▆▅▄▃▂▁ ";

/// Flèches.
pub const CHARSET_ARROWS: &str = "→↗↑↖←↙↓↘ ";

/// Built-in character presets, in UI order.
pub const CHAR_PRESETS: [&str; 5] = [
    CHARSET_CLASSIC,
    CHARSET_BINARY,
    CHARSET_SHADES,
    CHARSET_BARS,
    CHARSET_ARROWS,
];

/// Built-in colour overrides: white, phosphor green, amber, blue.
pub const COLOUR_PRESETS: [Rgb; 4] = [
    Rgb::new(0xFF, 0xFF, 0xFF),
    Rgb::new(0x33, 0xFF, 0x00),
    Rgb::new(0xFF, 0xB0, 0x00),
    Rgb::new(0x00, 0x99, 0xFF),
];

/// Glyph sequence in reverse order, as used for luminance lookup.
///
/// Glyphs are Unicode scalar values, so multi-byte characters count once.
///
/// # Example
/// ```
/// use ac_core::charset::reversed_glyphs;
/// assert_eq!(reversed_glyphs("AB→"), vec!['→', 'B', 'A']);
/// ```
#[must_use]
pub fn reversed_glyphs(chars: &str) -> Vec<char> {
    chars.chars().rev().collect()
}

/// Invert a charset (the "swap light/dark" toggle).
///
/// # Example
/// ```
/// use ac_core::charset::invert_charset;
/// assert_eq!(invert_charset("@%#"), "#%@");
/// ```
#[must_use]
pub fn invert_charset(chars: &str) -> String {
    chars.chars().rev().collect()
}

/// Index of `chars` among the built-in presets, if any.
#[must_use]
pub fn preset_index(chars: &str) -> Option<usize> {
    CHAR_PRESETS.iter().position(|p| *p == chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_non_empty() {
        for p in CHAR_PRESETS {
            assert!(p.chars().count() >= 2, "preset trop court : {p:?}");
        }
    }

    #[test]
    fn invert_is_an_involution() {
        for p in CHAR_PRESETS {
            assert_eq!(invert_charset(&invert_charset(p)), p);
        }
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(preset_index("01"), Some(1));
        assert_eq!(preset_index("10"), None);
    }
}
