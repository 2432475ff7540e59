use ac_core::config::AsciiConfig;
use ac_core::error::CoreError;
use ac_core::frame::{FrameBuffer, Grid};

use crate::grid_builder::build;

/// Texte brut d'une grille : cellules concaténées par ligne, lignes
/// séparées par `\n`, sans saut de ligne final.
///
/// # Example
/// ```
/// use ac_ascii::grid_to_text;
/// use ac_core::frame::{Cell, Grid};
///
/// let mut grid = Grid::new(2, 2);
/// grid.set(0, 0, Cell { ch: '@', ..Cell::default() });
/// assert_eq!(grid_to_text(&grid), "@ \n  ");
/// ```
#[must_use]
pub fn grid_to_text(grid: &Grid) -> String {
    let mut out = String::with_capacity(grid.cells.len() + usize::from(grid.height));
    for (i, row) in grid.rows().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.extend(row.iter().map(|cell| cell.ch));
    }
    out
}

/// Construit la grille du buffer et la retourne en texte brut.
///
/// # Errors
/// Mêmes erreurs que [`build`].
pub fn export_text(frame: &FrameBuffer, config: &AsciiConfig) -> Result<String, CoreError> {
    let grid = build(frame, config)?;
    let text = grid_to_text(&grid);
    log::debug!(
        "export texte : {}x{} cellules, {} octets",
        grid.width,
        grid.height,
        text.len()
    );
    Ok(text)
}
