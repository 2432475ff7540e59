use ac_core::frame::Grid;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;

/// Écrit directement une `Grid` dans un `ratatui::Buffer`.
///
/// Pas de widget Canvas ratatui : écriture directe, fond noir, glyphe
/// dans la couleur de la cellule. La grille est centrée puis clippée à
/// `area`.
///
/// # Example
/// ```
/// use ac_core::frame::{Cell, Grid};
/// use ac_render::canvas::render_grid;
/// use ratatui::buffer::Buffer;
/// use ratatui::layout::Rect;
///
/// let mut grid = Grid::new(2, 1);
/// grid.set(0, 0, Cell { ch: '@', ..Cell::default() });
/// let area = Rect::new(0, 0, 2, 1);
/// let mut buf = Buffer::empty(area);
/// render_grid(&mut buf, area, &grid);
/// assert_eq!(buf[(0, 0)].symbol(), "@");
/// ```
pub fn render_grid(buf: &mut Buffer, area: Rect, grid: &Grid) {
    let off_x = area.width.saturating_sub(grid.width) / 2;
    let off_y = area.height.saturating_sub(grid.height) / 2;

    for cy in 0..grid.height.min(area.height) {
        for cx in 0..grid.width.min(area.width) {
            let cell = grid.get(cx, cy);
            let buf_x = area.x + off_x + cx;
            let buf_y = area.y + off_y + cy;

            if let Some(buf_cell) = buf.cell_mut((buf_x, buf_y)) {
                let c = cell.color.rgb();
                buf_cell
                    .set_char(cell.ch)
                    .set_fg(Color::Rgb(c.r, c.g, c.b))
                    .set_bg(Color::Black);
            }
        }
    }
}

/// Efface `area` (espaces sur fond par défaut).
pub fn clear_area(buf: &mut Buffer, area: Rect) {
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.reset();
            }
        }
    }
}
