use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::traits::{FrameHandle, Scheduler};

/// Scheduler temps réel cadencé à `fps`, un seul rappel en vol.
///
/// L'hôte interroge `time_until_due` pour dormir, puis `take_due` pour
/// récupérer le handle à délivrer au driver.
///
/// # Example
/// ```
/// use std::time::{Duration, Instant};
/// use ac_core::clock::FrameTicker;
/// use ac_core::traits::Scheduler;
///
/// let mut ticker = FrameTicker::new(60);
/// let handle = ticker.schedule();
/// let later = Instant::now() + Duration::from_millis(50);
/// assert_eq!(ticker.take_due(later), Some(handle));
/// assert_eq!(ticker.take_due(later), None);
/// ```
pub struct FrameTicker {
    period: Duration,
    next_id: u64,
    pending: Option<(FrameHandle, Instant)>,
    last_due: Option<Instant>,
}

impl FrameTicker {
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            period: Self::period_for(fps),
            next_id: 0,
            pending: None,
            last_due: None,
        }
    }

    fn period_for(fps: u32) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
    }

    /// Change la cadence ; s'applique au prochain `schedule`.
    pub fn set_fps(&mut self, fps: u32) {
        self.period = Self::period_for(fps);
    }

    /// Temps restant avant le rappel en attente, `None` si rien n'est planifié.
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|(_, deadline)| deadline.saturating_duration_since(now))
    }

    /// Retire et retourne le handle si son échéance est atteinte.
    pub fn take_due(&mut self, now: Instant) -> Option<FrameHandle> {
        match self.pending {
            Some((handle, deadline)) if deadline <= now => {
                self.pending = None;
                self.last_due = Some(deadline);
                Some(handle)
            }
            _ => None,
        }
    }

    /// `true` if a callback is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Scheduler for FrameTicker {
    fn schedule(&mut self) -> FrameHandle {
        let now = Instant::now();
        // Aligné sur la grille de rafraîchissement, sans rattrapage des retards.
        let deadline = self
            .last_due
            .map_or(now, |last| (last + self.period).max(now));
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending = Some((handle, deadline));
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        if self.pending.is_some_and(|(h, _)| h == handle) {
            self.pending = None;
        }
    }
}

/// Scheduler déterministe pour les tests : les rappels ne partent que sur
/// appel explicite de `fire`.
///
/// # Example
/// ```
/// use ac_core::clock::ManualScheduler;
/// use ac_core::traits::Scheduler;
///
/// let mut s = ManualScheduler::default();
/// let a = s.schedule();
/// s.cancel(a);
/// assert_eq!(s.fire(), None);
/// assert_eq!(s.scheduled(), 1);
/// assert_eq!(s.cancelled(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: VecDeque<FrameHandle>,
    scheduled: usize,
    cancelled: usize,
}

impl ManualScheduler {
    /// Délivre le plus ancien rappel en attente.
    pub fn fire(&mut self) -> Option<FrameHandle> {
        self.pending.pop_front()
    }

    /// Rappels actuellement en attente.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Total des appels à `schedule`.
    #[must_use]
    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    /// Total des annulations effectives.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self) -> FrameHandle {
        self.next_id += 1;
        self.scheduled += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push_back(handle);
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        if let Some(pos) = self.pending.iter().position(|h| *h == handle) {
            self.pending.remove(pos);
            self.cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_respects_period() {
        let mut ticker = FrameTicker::new(10);
        let first = ticker.schedule();
        let t0 = Instant::now() + Duration::from_millis(1);
        assert_eq!(ticker.take_due(t0), Some(first));

        let second = ticker.schedule();
        let wait = ticker.time_until_due(t0).unwrap();
        assert!(wait > Duration::from_millis(50), "attente trop courte : {wait:?}");
        assert_eq!(ticker.take_due(t0), None);
        assert_eq!(ticker.take_due(t0 + Duration::from_millis(150)), Some(second));
    }

    #[test]
    fn ticker_cancel_only_matching_handle() {
        let mut ticker = FrameTicker::new(30);
        let h = ticker.schedule();
        ticker.cancel(FrameHandle(h.0 + 1));
        assert!(ticker.is_pending());
        ticker.cancel(h);
        assert!(!ticker.is_pending());
        assert_eq!(ticker.time_until_due(Instant::now()), None);
    }

    #[test]
    fn manual_fifo_order() {
        let mut s = ManualScheduler::default();
        let a = s.schedule();
        let b = s.schedule();
        assert_eq!(s.pending(), 2);
        assert_eq!(s.fire(), Some(a));
        assert_eq!(s.fire(), Some(b));
        assert_eq!(s.fire(), None);
    }
}
