use std::collections::VecDeque;
use std::time::Instant;

/// Cadence mesurée des passes, sur une fenêtre glissante de N ticks.
///
/// # Example
/// ```
/// use std::time::{Duration, Instant};
/// use ac_render::fps::RateMeter;
///
/// let mut meter = RateMeter::new(8);
/// let t0 = Instant::now();
/// for i in 0..5 {
///     meter.tick_at(t0 + Duration::from_millis(100 * i));
/// }
/// assert!((meter.rate() - 10.0).abs() < 1e-6);
/// ```
pub struct RateMeter {
    stamps: VecDeque<Instant>,
    window: usize,
    rate: f64,
    /// Durée de la dernière passe en ms.
    pub last_interval_ms: f64,
}

impl RateMeter {
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            stamps: VecDeque::with_capacity(window + 1),
            window: window.max(2),
            rate: 0.0,
            last_interval_ms: 0.0,
        }
    }

    /// Appeler une fois par passe, après le rendu.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        if let Some(&last) = self.stamps.back() {
            self.last_interval_ms = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
        }
        self.stamps.push_back(now);
        if self.stamps.len() > self.window {
            self.stamps.pop_front();
        }
        if let (Some(&first), true) = (self.stamps.front(), self.stamps.len() >= 2) {
            let secs = now.saturating_duration_since(first).as_secs_f64();
            if secs > 0.0 {
                self.rate = (self.stamps.len() - 1) as f64 / secs;
            }
        }
    }

    /// Passes par seconde sur la fenêtre.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Oublie l'historique (après une pause).
    pub fn reset(&mut self) {
        self.stamps.clear();
        self.rate = 0.0;
        self.last_interval_ms = 0.0;
    }
}
