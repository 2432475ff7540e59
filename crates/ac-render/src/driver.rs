use ac_ascii::build;
use ac_core::config::AsciiConfig;
use ac_core::error::CoreError;
use ac_core::traits::{FrameHandle, FrameSource, RenderTarget, Scheduler};

/// État du driver.
///
/// # Example
/// ```
/// use ac_render::driver::DriverState;
/// assert_ne!(DriverState::Idle, DriverState::Active);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// Aucune passe planifiée, cible effacée.
    Idle,
    /// Passes en cours (une seule planification en vol au plus).
    Active,
}

/// Compteurs de passes, pour l'affichage et les tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Passes ayant présenté une grille.
    pub rendered: u64,
    /// Passes sautées faute de snapshot.
    pub skipped: u64,
}

/// Boucle temps réel : snapshot → grille → rendu, re-planifiée tant que le
/// driver est actif et que la config demande l'animation.
///
/// Le scheduler est injecté : l'hôte délivre chaque rappel en appelant
/// [`AnimationDriver::on_frame`] avec le handle reçu de `schedule`.
///
/// # Example
/// ```
/// use ac_core::clock::ManualScheduler;
/// use ac_core::traits::FrameSource;
/// use ac_core::{AsciiConfig, FrameBuffer, Rgb};
/// use ac_render::driver::AnimationDriver;
/// use ac_render::target::TerminalTarget;
///
/// struct Still(FrameBuffer);
/// impl FrameSource for Still {
///     fn snapshot(&mut self) -> Option<&FrameBuffer> { Some(&self.0) }
/// }
///
/// let source = Still(FrameBuffer::solid(8, 8, Rgb::WHITE));
/// let mut driver = AnimationDriver::new(
///     source,
///     TerminalTarget::default(),
///     ManualScheduler::default(),
///     AsciiConfig::default(),
/// );
/// driver.show().unwrap();
/// let handle = driver.scheduler_mut().fire().unwrap();
/// driver.on_frame(handle);
/// assert_eq!(driver.stats().rendered, 2);
/// driver.hide();
/// assert!(driver.target().latest().is_none());
/// ```
pub struct AnimationDriver<S: FrameSource, T: RenderTarget, C: Scheduler> {
    source: S,
    target: T,
    scheduler: C,
    config: AsciiConfig,
    state: DriverState,
    pending: Option<FrameHandle>,
    stats: PassStats,
}

impl<S: FrameSource, T: RenderTarget, C: Scheduler> AnimationDriver<S, T, C> {
    #[must_use]
    pub fn new(source: S, target: T, scheduler: C, config: AsciiConfig) -> Self {
        Self {
            source,
            target,
            scheduler,
            config,
            state: DriverState::Idle,
            pending: None,
            stats: PassStats::default(),
        }
    }

    /// `Idle → Active` : une passe immédiate, puis planification si `animate`.
    ///
    /// Appelé en état actif, équivaut à un redémarrage de la boucle.
    ///
    /// # Errors
    /// [`CoreError::EmptyCharset`] ou [`CoreError::InvalidDimensions`] si la
    /// config courante est invalide ; le driver reste alors `Idle`.
    pub fn show(&mut self) -> Result<(), CoreError> {
        self.config.validate()?;
        self.cancel_pending();
        if self.state == DriverState::Idle {
            log::debug!(
                "driver actif : {}x{}, animate={}",
                self.config.output_width,
                self.config.output_height,
                self.config.animate
            );
        }
        self.state = DriverState::Active;
        self.run_pass();
        self.reschedule();
        Ok(())
    }

    /// Rappel du scheduler.
    ///
    /// Sans effet si le driver est `Idle` (rappel arrivé après un `hide`).
    pub fn on_frame(&mut self, handle: FrameHandle) {
        if self.state != DriverState::Active {
            log::trace!("rappel {handle:?} ignoré : driver inactif");
            return;
        }
        if let Some(stale) = self.pending.take().filter(|p| *p != handle) {
            self.scheduler.cancel(stale);
        }
        self.run_pass();
        self.reschedule();
    }

    /// Remplace la configuration.
    ///
    /// En état actif : annule la planification, repasse immédiatement avec
    /// la nouvelle config, re-planifie si `animate`.
    ///
    /// # Errors
    /// Config invalide : elle est rejetée, l'ancienne reste en place.
    pub fn set_config(&mut self, config: AsciiConfig) -> Result<(), CoreError> {
        config.validate()?;
        self.config = config;
        if self.state == DriverState::Active {
            self.cancel_pending();
            self.run_pass();
            self.reschedule();
        }
        Ok(())
    }

    /// `Active → Idle` : annule la planification et efface la cible.
    ///
    /// Idempotent ; en état `Idle`, se contente d'effacer.
    pub fn hide(&mut self) {
        self.cancel_pending();
        self.target.clear();
        if self.state == DriverState::Active {
            log::debug!(
                "driver inactif ({} passes, {} sautées)",
                self.stats.rendered,
                self.stats.skipped
            );
        }
        self.state = DriverState::Idle;
    }

    /// Une passe complète ; jamais interrompue.
    fn run_pass(&mut self) {
        let Some(frame) = self.source.snapshot() else {
            self.stats.skipped += 1;
            log::trace!("snapshot indisponible, passe sautée");
            return;
        };
        let source_size = (frame.width, frame.height);
        match build(frame, &self.config) {
            Ok(grid) => {
                self.target.present(&grid, source_size, &self.config);
                self.stats.rendered += 1;
            }
            Err(e) => {
                // La config est validée à l'entrée : inatteignable en pratique.
                self.stats.skipped += 1;
                log::warn!("passe abandonnée : {e}");
            }
        }
    }

    fn reschedule(&mut self) {
        if self.state == DriverState::Active && self.config.animate {
            self.pending = Some(self.scheduler.schedule());
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
    }

    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == DriverState::Active
    }

    /// Handle du rappel en vol, s'il y en a un.
    #[must_use]
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    #[must_use]
    pub fn stats(&self) -> PassStats {
        self.stats
    }

    #[must_use]
    pub fn config(&self) -> &AsciiConfig {
        &self.config
    }

    #[must_use]
    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    #[must_use]
    pub fn scheduler(&self) -> &C {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut C {
        &mut self.scheduler
    }
}

impl<S: FrameSource, T: RenderTarget, C: Scheduler> Drop for AnimationDriver<S, T, C> {
    fn drop(&mut self) {
        self.hide();
    }
}
