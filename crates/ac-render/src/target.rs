use ac_core::config::AsciiConfig;
use ac_core::frame::{FrameBuffer, Grid};
use ac_core::traits::RenderTarget;

use crate::raster::Renderer;

/// Surface RGBA peinte par le [`Renderer`].
///
/// # Example
/// ```
/// use ac_core::traits::RenderTarget;
/// use ac_core::{AsciiConfig, Grid};
/// use ac_render::Renderer;
/// use ac_render::target::PixelTarget;
///
/// let mut target = PixelTarget::new(Renderer::new().unwrap());
/// target.present(&Grid::new(2, 2), (16, 16), &AsciiConfig::default());
/// assert!(!target.surface().is_transparent());
/// target.clear();
/// assert!(target.surface().is_transparent());
/// ```
pub struct PixelTarget {
    renderer: Renderer,
    surface: FrameBuffer,
}

impl PixelTarget {
    #[must_use]
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            surface: FrameBuffer::default(),
        }
    }

    /// Contenu courant de la surface.
    #[must_use]
    pub fn surface(&self) -> &FrameBuffer {
        &self.surface
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }
}

impl RenderTarget for PixelTarget {
    fn present(&mut self, grid: &Grid, source_size: (u32, u32), config: &AsciiConfig) {
        self.renderer
            .render(grid, source_size, &mut self.surface, config);
    }

    fn clear(&mut self) {
        self.surface.clear_transparent();
    }
}

/// Dernière grille présentée, pour un affichage terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Presented {
    pub grid: Grid,
    /// Taille du buffer d'origine.
    pub source_size: (u32, u32),
}

/// Cible terminal : conserve la dernière grille pour que la boucle ratatui
/// la peigne via [`crate::canvas::render_grid`].
#[derive(Debug, Default)]
pub struct TerminalTarget {
    latest: Option<Presented>,
    generation: u64,
}

impl TerminalTarget {
    /// `None` si la cible est vide (jamais présentée ou effacée).
    #[must_use]
    pub fn latest(&self) -> Option<&Presented> {
        self.latest.as_ref()
    }

    /// Incrémenté à chaque `present` ou `clear` : la boucle d'affichage ne
    /// redessine que si la valeur a changé.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl RenderTarget for TerminalTarget {
    fn present(&mut self, grid: &Grid, source_size: (u32, u32), _config: &AsciiConfig) {
        match &mut self.latest {
            Some(p) => {
                p.grid.clone_from(grid);
                p.source_size = source_size;
            }
            None => {
                self.latest = Some(Presented {
                    grid: grid.clone(),
                    source_size,
                });
            }
        }
        self.generation += 1;
    }

    fn clear(&mut self) {
        self.latest = None;
        self.generation += 1;
    }
}
