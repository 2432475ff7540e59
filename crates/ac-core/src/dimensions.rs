use crate::config::GRID_DIM_RANGE;

/// Ratio largeur/hauteur d'une grille "optimisée pour le copier-coller".
///
/// Les cellules d'un éditeur de texte sont ~2.5 fois plus hautes que larges.
pub const IDEAL_RATIO: f64 = 2.5;

fn clamp_dim(v: f64) -> u16 {
    let lo = f64::from(*GRID_DIM_RANGE.start());
    let hi = f64::from(*GRID_DIM_RANGE.end());
    v.round().clamp(lo, hi) as u16
}

/// Conserve le nombre de cellules et ramène le ratio à [`IDEAL_RATIO`].
///
/// # Example
/// ```
/// use ac_core::dimensions::ideal_dimensions;
/// assert_eq!(ideal_dimensions(100, 75), (137, 55));
/// ```
#[must_use]
pub fn ideal_dimensions(width: u16, height: u16) -> (u16, u16) {
    let area = f64::from(width) * f64::from(height);
    let new_width = (area * IDEAL_RATIO).sqrt().round();
    let new_height = (new_width / IDEAL_RATIO).round();
    (clamp_dim(new_width), clamp_dim(new_height))
}

/// Verrou de ratio pour l'édition des dimensions de la grille.
///
/// # Example
/// ```
/// use ac_core::dimensions::AspectLock;
/// let mut lock = AspectLock::new(100, 50);
/// assert_eq!(lock.set_width(60, 50), (60, 30));
/// lock.locked = false;
/// assert_eq!(lock.set_width(90, 30), (90, 30));
/// assert_eq!(lock.ratio(), 3.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct AspectLock {
    /// Quand vrai, modifier une dimension recalcule l'autre.
    pub locked: bool,
    ratio: f64,
}

impl AspectLock {
    /// Lock initialised from current dimensions.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            locked: true,
            ratio: f64::from(width) / f64::from(height.max(1)),
        }
    }

    /// Current width/height ratio.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Force a ratio (e.g. after "optimise for copy").
    pub fn set_ratio(&mut self, ratio: f64) {
        if ratio.is_finite() && ratio > 0.0 {
            self.ratio = ratio;
        }
    }

    /// New dimensions after a width edit.
    pub fn set_width(&mut self, width: u16, current_height: u16) -> (u16, u16) {
        let width = clamp_dim(f64::from(width));
        if self.locked {
            (width, clamp_dim(f64::from(width) / self.ratio))
        } else {
            let height = current_height.max(1);
            self.ratio = f64::from(width) / f64::from(height);
            (width, height)
        }
    }

    /// New dimensions after a height edit.
    pub fn set_height(&mut self, height: u16, current_width: u16) -> (u16, u16) {
        let height = clamp_dim(f64::from(height));
        if self.locked {
            (clamp_dim(f64::from(height) * self.ratio), height)
        } else {
            let width = current_width.max(1);
            self.ratio = f64::from(width) / f64::from(height);
            (width, height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_dimensions_stay_in_range() {
        assert_eq!(ideal_dimensions(300, 300), (300, 190));
        assert_eq!(ideal_dimensions(1, 1), (2, 1));
    }

    #[test]
    fn locked_height_edit_derives_width() {
        let mut lock = AspectLock::new(100, 75);
        assert_eq!(lock.set_height(30, 100), (40, 30));
    }

    #[test]
    fn locked_edit_is_clamped() {
        let mut lock = AspectLock::new(300, 10);
        assert_eq!(lock.set_height(200, 300), (300, 200));
    }
}
