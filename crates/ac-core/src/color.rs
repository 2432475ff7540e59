use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Couleur RGB 8 bits par canal.
///
/// Se parse depuis `#RRGGBB` ou `#RGB` et s'affiche en `#RRGGBB`.
///
/// # Example
/// ```
/// use ac_core::color::Rgb;
/// let c: Rgb = "#33FF00".parse().unwrap();
/// assert_eq!(c, Rgb::new(0x33, 0xFF, 0x00));
/// assert_eq!(c.to_string(), "#33FF00");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a colour from float channels, rounding and clamping to [0, 255].
    ///
    /// # Example
    /// ```
    /// use ac_core::color::Rgb;
    /// assert_eq!(Rgb::from_f32([12.4, 12.5, 300.0]), Rgb::new(12, 13, 255));
    /// ```
    #[must_use]
    pub fn from_f32(channels: [f32; 3]) -> Self {
        let q = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        Self::new(q(channels[0]), q(channels[1]), q(channels[2]))
    }

    /// CSS functional notation, `rgb(r,g,b)`.
    #[must_use]
    pub fn css(&self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidColour(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                // #RGB → #RRGGBB
                let expand = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!("#FFB000".parse::<Rgb>().unwrap(), Rgb::new(255, 176, 0));
        assert_eq!("#0099ff".parse::<Rgb>().unwrap(), Rgb::new(0, 153, 255));
        assert_eq!("#fff".parse::<Rgb>().unwrap(), Rgb::WHITE);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "#", "33FF00", "#33FF0", "#GGGGGG", "#33FF00AA", "#+1+"] {
            assert!(bad.parse::<Rgb>().is_err(), "{bad:?} aurait dû échouer");
        }
    }

    #[test]
    fn css_notation() {
        assert_eq!(Rgb::new(1, 22, 255).css(), "rgb(1,22,255)");
    }
}
