use std::fmt;

use crate::color::Rgb;
use crate::error::CoreError;

/// Buffer de pixels RGBA 8 bits, row-major, 4 bytes par pixel.
///
/// Sert à la fois de snapshot source (emprunté en lecture seule pour une
/// seule passe) et de surface cible du Renderer.
///
/// # Example
/// ```
/// use ac_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 400);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixels RGBA, row-major, 4 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer pré-alloué aux dimensions données (noir transparent).
    ///
    /// # Example
    /// ```
    /// use ac_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(100, 50);
    /// assert_eq!(fb.width, 100);
    /// assert_eq!(fb.height, 50);
    /// assert_eq!(fb.data.len(), 100 * 50 * 4);
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    /// Wrap existing RGBA bytes, checking the length.
    ///
    /// # Errors
    /// [`CoreError::BufferSize`] if `data.len() != width * height * 4`.
    ///
    /// # Example
    /// ```
    /// use ac_core::frame::FrameBuffer;
    /// assert!(FrameBuffer::from_rgba(2, 1, vec![0; 8]).is_ok());
    /// assert!(FrameBuffer::from_rgba(2, 1, vec![0; 7]).is_err());
    /// ```
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CoreError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(CoreError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Buffer uniformément rempli d'une couleur opaque.
    ///
    /// # Example
    /// ```
    /// use ac_core::{FrameBuffer, Rgb};
    /// let fb = FrameBuffer::solid(2, 2, Rgb::WHITE);
    /// assert_eq!(fb.pixel(1, 1), (255, 255, 255, 255));
    /// ```
    #[must_use]
    pub fn solid(width: u32, height: u32, colour: Rgb) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill([colour.r, colour.g, colour.b, 255]);
        fb
    }

    /// Accès au pixel (x, y) → (r, g, b, a).
    ///
    /// # Example
    /// ```
    /// use ac_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(10, 10);
    /// let (r, g, b, a) = fb.pixel(0, 0);
    /// assert_eq!((r, g, b, a), (0, 0, 0, 0));
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if idx + 3 >= self.data.len() {
            return (0, 0, 0, 0);
        }
        (
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        )
    }

    /// Redimensionne le buffer. N'alloue que si la taille change.
    ///
    /// Le contenu est indéfini après un changement de taille : appeler `fill`.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.data.resize(width as usize * height as usize * 4, 0);
        }
    }

    /// Remplit tous les pixels avec une valeur RGBA.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Efface en noir transparent.
    pub fn clear_transparent(&mut self) {
        self.data.fill(0);
    }

    /// `true` si aucun pixel n'a d'alpha non nul.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }
}

/// Couleur d'une cellule : échantillonnée ou imposée par la configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellColor {
    /// Moyenne ajustée (contraste/luminosité) des pixels de la cellule.
    Sampled(Rgb),
    /// Couleur forcée par `AsciiConfig::colour`.
    Override(Rgb),
}

impl CellColor {
    /// Valeur RGB à peindre.
    #[inline]
    #[must_use]
    pub fn rgb(&self) -> Rgb {
        match *self {
            Self::Sampled(c) | Self::Override(c) => c,
        }
    }
}

impl Default for CellColor {
    fn default() -> Self {
        Self::Sampled(Rgb::BLACK)
    }
}

impl fmt::Display for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sampled(c) => f.write_str(&c.css()),
            Self::Override(c) => write!(f, "{c}"),
        }
    }
}

/// Single cell in the ASCII grid.
///
/// # Example
/// ```
/// use ac_core::frame::Cell;
/// let cell = Cell::default();
/// assert_eq!(cell.ch, ' ');
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Caractère à afficher.
    pub ch: char,
    /// Couleur du glyphe.
    pub color: CellColor,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            color: CellColor::default(),
        }
    }
}

/// Grille de sortie ASCII : exactement `height` lignes de `width` cellules.
///
/// # Example
/// ```
/// use ac_core::frame::{Cell, Grid};
/// let mut grid = Grid::new(80, 24);
/// grid.set(0, 0, Cell { ch: '@', ..Cell::default() });
/// assert_eq!(grid.get(0, 0).ch, '@');
/// assert_eq!(grid.rows().count(), 24);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    /// Flat array of cells, row-major.
    pub cells: Vec<Cell>,
    /// Width in characters.
    pub width: u16,
    /// Height in characters.
    pub height: u16,
}

impl Grid {
    /// Crée une grille remplie de cellules par défaut.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            cells: vec![Cell::default(); width as usize * height as usize],
            width,
            height,
        }
    }

    /// Set a cell at position (x, y).
    #[inline(always)]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        self.cells[y as usize * self.width as usize + x as usize] = cell;
    }

    /// Get a cell reference at position (x, y).
    #[inline(always)]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> &Cell {
        &self.cells[y as usize * self.width as usize + x as usize]
    }

    /// Iterate rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(usize::from(self.width).max(1))
    }
}
