use ac_core::config::AsciiConfig;
use ac_core::error::CoreError;
use ac_core::frame::{FrameBuffer, Grid};
use rayon::prelude::*;

use crate::aggregate::CellSampler;
use crate::tone::ToneMapper;

/// Convertit un snapshot en grille de `output_height` lignes de
/// `output_width` cellules.
///
/// Fonction pure : même buffer + même config → grille identique. Le
/// buffer n'est emprunté que pour la durée de l'appel.
///
/// # Errors
/// [`CoreError::EmptyCharset`] ou [`CoreError::InvalidDimensions`], levées
/// avant qu'aucune cellule ne soit produite.
///
/// # Example
/// ```
/// use ac_ascii::build;
/// use ac_core::{AsciiConfig, FrameBuffer, Rgb};
///
/// let frame = FrameBuffer::solid(2, 2, Rgb::WHITE);
/// let config = AsciiConfig {
///     output_width: 1,
///     output_height: 1,
///     chars: "AB".into(),
///     ..AsciiConfig::default()
/// };
/// let grid = build(&frame, &config).unwrap();
/// assert_eq!(grid.get(0, 0).ch, 'A');
/// ```
pub fn build(frame: &FrameBuffer, config: &AsciiConfig) -> Result<Grid, CoreError> {
    config.validate()?;
    let tone = ToneMapper::new(config)?;
    let sampler = CellSampler::new(
        frame.width,
        frame.height,
        config.output_width,
        config.output_height,
    );

    let mut grid = Grid::new(config.output_width, config.output_height);
    grid.cells
        .par_chunks_mut(usize::from(config.output_width))
        .enumerate()
        .for_each(|(row, cells)| {
            for (col, cell) in cells.iter_mut().enumerate() {
                let average = sampler.average(frame, col as u16, row as u16);
                *cell = tone.map(average);
            }
        });
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::Rgb;
    use ac_core::frame::CellColor;

    fn config(w: u16, h: u16, chars: &str) -> AsciiConfig {
        AsciiConfig {
            output_width: w,
            output_height: h,
            chars: chars.into(),
            colour: None,
            ..AsciiConfig::default()
        }
    }

    /// Dégradé horizontal noir → blanc, avec un peu de bruit vertical.
    fn gradient(w: u32, h: u32) -> FrameBuffer {
        let mut fb = FrameBuffer::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = (x * 255 / (w - 1).max(1)) as u8;
                let idx = ((y * w + x) * 4) as usize;
                fb.data[idx..idx + 4].copy_from_slice(&[v, v.wrapping_add(y as u8), v, 255]);
            }
        }
        fb
    }

    #[test]
    fn grid_has_exact_dimensions() {
        let frame = gradient(37, 23);
        for (w, h) in [(1, 1), (5, 3), (37, 23), (100, 75), (300, 1), (1, 300)] {
            let grid = build(&frame, &config(w, h, "@%#*+=-:. ")).unwrap();
            assert_eq!(grid.rows().count(), usize::from(h));
            assert!(grid.rows().all(|r| r.len() == usize::from(w)));
        }
    }

    #[test]
    fn build_is_deterministic() {
        let frame = gradient(640, 480);
        let c = config(80, 40, "@%#*+=-:. ");
        assert_eq!(build(&frame, &c).unwrap(), build(&frame, &c).unwrap());
    }

    #[test]
    fn white_source_selects_first_glyph() {
        let frame = FrameBuffer::solid(2, 2, Rgb::WHITE);
        let grid = build(&frame, &config(1, 1, "AB")).unwrap();
        assert_eq!(grid.get(0, 0).ch, 'A');
    }

    #[test]
    fn black_source_selects_last_glyph() {
        let frame = FrameBuffer::solid(2, 2, Rgb::BLACK);
        let grid = build(&frame, &config(1, 1, "AB")).unwrap();
        assert_eq!(grid.get(0, 0).ch, 'B');
    }

    #[test]
    fn empty_charset_fails_before_any_cell() {
        let frame = FrameBuffer::solid(2, 2, Rgb::WHITE);
        assert_eq!(
            build(&frame, &config(1, 1, "")),
            Err(CoreError::EmptyCharset)
        );
    }

    #[test]
    fn zero_sized_grid_is_rejected() {
        let frame = FrameBuffer::solid(2, 2, Rgb::WHITE);
        assert!(matches!(
            build(&frame, &config(0, 4, "AB")),
            Err(CoreError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn gradient_glyphs_move_from_last_to_first() {
        let frame = gradient(256, 4);
        let grid = build(&frame, &config(10, 1, "@%#*+=-:. ")).unwrap();
        let ramp: Vec<char> = " .:-=+*#%@".chars().collect();
        let ranks: Vec<usize> = (0..10)
            .map(|col| ramp.iter().position(|&c| c == grid.get(col, 0).ch).unwrap())
            .collect();
        assert_eq!(ranks[0], 0);
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "{ranks:?}");
        assert!(ranks[9] >= 8, "{ranks:?}");
    }

    #[test]
    fn sampled_colours_without_override() {
        let frame = FrameBuffer::solid(4, 4, Rgb::new(10, 20, 30));
        let grid = build(&frame, &config(2, 2, "AB")).unwrap();
        assert!(
            grid.cells
                .iter()
                .all(|c| c.color == CellColor::Sampled(Rgb::new(10, 20, 30)))
        );
    }

    #[test]
    fn empty_source_yields_complete_dark_grid() {
        let grid = build(&FrameBuffer::new(0, 0), &config(3, 2, "AB")).unwrap();
        assert_eq!(grid.cells.len(), 6);
        assert!(grid.cells.iter().all(|c| c.ch == 'B'));
    }
}
