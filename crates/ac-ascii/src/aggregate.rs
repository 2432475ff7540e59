use ac_core::frame::FrameBuffer;

/// Pas d'échantillonnage pour une cellule de `sample_w × sample_h` pixels.
///
/// Vise ~4 échantillons par axe quelle que soit la résolution source, ce qui
/// garde le coût d'une frame en O(W·H) plutôt qu'en O(largeur·hauteur source).
///
/// # Example
/// ```
/// use ac_ascii::aggregate::sampling_step;
/// assert_eq!(sampling_step(19.2, 14.4), 3);
/// assert_eq!(sampling_step(0.5, 0.5), 1);
/// ```
#[inline]
#[must_use]
pub fn sampling_step(sample_w: f64, sample_h: f64) -> usize {
    ((sample_w.min(sample_h) / 4.0).floor() as usize).max(1)
}

/// Échantillonneur de cellules pour un couple (taille source, taille grille).
///
/// # Example
/// ```
/// use ac_ascii::aggregate::CellSampler;
/// use ac_core::{FrameBuffer, Rgb};
///
/// let frame = FrameBuffer::solid(64, 48, Rgb::new(10, 20, 30));
/// let sampler = CellSampler::new(frame.width, frame.height, 8, 6);
/// assert_eq!(sampler.average(&frame, 7, 5), [10.0, 20.0, 30.0]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CellSampler {
    src_w: u32,
    src_h: u32,
    sample_w: f64,
    sample_h: f64,
    step: usize,
}

impl CellSampler {
    #[must_use]
    pub fn new(src_w: u32, src_h: u32, grid_w: u16, grid_h: u16) -> Self {
        let sample_w = f64::from(src_w) / f64::from(grid_w.max(1));
        let sample_h = f64::from(src_h) / f64::from(grid_h.max(1));
        Self {
            src_w,
            src_h,
            sample_w,
            sample_h,
            step: sampling_step(sample_w, sample_h),
        }
    }

    /// Pas d'échantillonnage retenu.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Nombre d'échantillons lus par cellule, par axe.
    #[must_use]
    pub fn samples_per_cell(&self) -> (usize, usize) {
        (
            Self::offsets(self.sample_w, self.step).count(),
            Self::offsets(self.sample_h, self.step).count(),
        )
    }

    /// Offsets 0, step, 2·step… strictement inférieurs à `extent`.
    fn offsets(extent: f64, step: usize) -> impl Iterator<Item = u32> {
        (0u32..)
            .step_by(step)
            .take_while(move |&d| f64::from(d) < extent)
    }

    /// Couleur moyenne `[r, g, b]` de la cellule (col, row).
    ///
    /// `[0.0, 0.0, 0.0]` si la région ne contient aucun échantillon.
    #[must_use]
    pub fn average(&self, frame: &FrameBuffer, col: u16, row: u16) -> [f32; 3] {
        if self.src_w == 0 || self.src_h == 0 {
            return [0.0; 3];
        }
        let x0 = (f64::from(col) * self.sample_w).floor() as u32;
        let y0 = (f64::from(row) * self.sample_h).floor() as u32;
        let max_x = self.src_w - 1;
        let max_y = self.src_h - 1;

        let (mut r, mut g, mut b, mut count) = (0u64, 0u64, 0u64, 0u64);
        for dy in Self::offsets(self.sample_h, self.step) {
            let py = y0.saturating_add(dy).min(max_y);
            for dx in Self::offsets(self.sample_w, self.step) {
                let px = x0.saturating_add(dx).min(max_x);
                let (pr, pg, pb, _) = frame.pixel(px, py);
                r += u64::from(pr);
                g += u64::from(pg);
                b += u64::from(pb);
                count += 1;
            }
        }

        if count == 0 {
            return [0.0; 3];
        }
        let n = count as f64;
        [
            (r as f64 / n) as f32,
            (g as f64 / n) as f32,
            (b as f64 / n) as f32,
        ]
    }
}

/// Réduit un buffer en `width × height` moyennes, row-major.
///
/// # Example
/// ```
/// use ac_ascii::aggregate::aggregate;
/// use ac_core::FrameBuffer;
/// let averages = aggregate(&FrameBuffer::new(40, 30), 4, 3);
/// assert_eq!(averages.len(), 12);
/// ```
#[must_use]
pub fn aggregate(frame: &FrameBuffer, width: u16, height: u16) -> Vec<[f32; 3]> {
    let sampler = CellSampler::new(frame.width, frame.height, width, height);
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (col, row)))
        .map(|(col, row)| sampler.average(frame, col, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::Rgb;

    fn split_frame() -> FrameBuffer {
        // 2×1 : pixel gauche noir, pixel droit blanc.
        let mut fb = FrameBuffer::new(2, 1);
        fb.data.copy_from_slice(&[0, 0, 0, 255, 255, 255, 255, 255]);
        fb
    }

    #[test]
    fn averages_both_halves() {
        let avg = aggregate(&split_frame(), 1, 1);
        assert_eq!(avg, vec![[127.5, 127.5, 127.5]]);
    }

    #[test]
    fn per_column_cells_see_their_own_pixel() {
        let avg = aggregate(&split_frame(), 2, 1);
        assert_eq!(avg, vec![[0.0; 3], [255.0; 3]]);
    }

    #[test]
    fn empty_source_averages_to_black() {
        let avg = aggregate(&FrameBuffer::new(0, 0), 3, 2);
        assert_eq!(avg.len(), 6);
        assert!(avg.iter().all(|c| *c == [0.0; 3]));
    }

    #[test]
    fn upscaling_repeats_source_pixels() {
        let frame = FrameBuffer::solid(1, 1, Rgb::new(9, 8, 7));
        let avg = aggregate(&frame, 3, 3);
        assert!(avg.iter().all(|c| *c == [9.0, 8.0, 7.0]));
    }

    #[test]
    fn sample_count_is_bounded_by_cell_size_not_resolution() {
        let small = CellSampler::new(400, 300, 100, 75);
        let large = CellSampler::new(4000, 3000, 100, 75);
        let (sx, sy) = small.samples_per_cell();
        let (lx, ly) = large.samples_per_cell();
        assert_eq!((sx, sy), (4, 4));
        assert!(lx <= 5 && ly <= 5, "{lx}×{ly}");
    }

    #[test]
    fn samples_stay_inside_the_source() {
        // 3×3 dans 2×2 : cellules de 1.5 px, la dernière déborde sans clamp.
        let frame = FrameBuffer::solid(3, 3, Rgb::WHITE);
        let avg = aggregate(&frame, 2, 2);
        assert!(avg.iter().all(|c| *c == [255.0; 3]));
    }
}
