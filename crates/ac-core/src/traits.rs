use crate::config::AsciiConfig;
use crate::frame::{FrameBuffer, Grid};
use crate::stream::{AudioInput, AudioTrack, MediaStream};

/// Fournit le snapshot courant d'une source visuelle.
///
/// Le snapshot est emprunté pour la durée d'une seule passe : la durée de
/// vie est liée à `&mut self`, le pipeline ne peut pas le conserver.
///
/// # Example
/// ```
/// use ac_core::traits::FrameSource;
/// use ac_core::frame::FrameBuffer;
///
/// struct Still(FrameBuffer);
/// impl FrameSource for Still {
///     fn snapshot(&mut self) -> Option<&FrameBuffer> { Some(&self.0) }
/// }
/// ```
pub trait FrameSource {
    /// Retourne `None` tant que la source n'est pas prête.
    fn snapshot(&mut self) -> Option<&FrameBuffer>;
}

/// Surface qui reçoit les grilles produites par le pipeline.
///
/// # Example
/// ```
/// use ac_core::traits::RenderTarget;
/// use ac_core::{AsciiConfig, Grid};
///
/// #[derive(Default)]
/// struct Last(Option<Grid>);
/// impl RenderTarget for Last {
///     fn present(&mut self, grid: &Grid, _source: (u32, u32), _config: &AsciiConfig) {
///         self.0 = Some(grid.clone());
///     }
///     fn clear(&mut self) { self.0 = None; }
/// }
/// ```
pub trait RenderTarget {
    /// Remplace entièrement le contenu de la surface.
    ///
    /// `source_size` est la taille du buffer d'origine, pas celle de la grille.
    fn present(&mut self, grid: &Grid, source_size: (u32, u32), config: &AsciiConfig);

    /// Efface la surface (vide/transparente).
    fn clear(&mut self);
}

/// Identifiant d'un rappel planifié.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Planificateur aligné sur le rafraîchissement de l'affichage.
///
/// `schedule` demande un unique rappel ; l'hôte le délivre plus tard en
/// appelant le driver avec le handle retourné.
pub trait Scheduler {
    fn schedule(&mut self) -> FrameHandle;
    /// Sans effet si le handle est déjà délivré ou annulé.
    fn cancel(&mut self, handle: FrameHandle);
}

/// Frame produite par une source vidéo lue séquentiellement.
pub enum VideoFrame<'a> {
    /// Une frame décodée et sa position de lecture (secondes).
    Frame {
        pixels: &'a FrameBuffer,
        time: f64,
    },
    /// Fin du média.
    Ended,
}

/// Source vidéo contrôlable (transcodage).
pub trait VideoSource {
    /// Résolution native du flux vidéo.
    fn native_size(&self) -> (u32, u32);
    /// Cadence nominale.
    fn fps(&self) -> f64;
    /// Durée totale en secondes (0.0 si inconnue).
    fn duration(&self) -> f64;
    /// Position de lecture courante en secondes.
    fn current_time(&self) -> f64;

    /// # Errors
    /// Returns an error if the source cannot seek.
    fn seek(&mut self, secs: f64) -> anyhow::Result<()>;

    /// # Errors
    /// Returns an error if playback cannot start.
    fn play(&mut self) -> anyhow::Result<()>;

    /// Bloque jusqu'à la prochaine frame.
    ///
    /// # Errors
    /// Returns an error on decode failure.
    fn next_frame(&mut self) -> anyhow::Result<VideoFrame<'_>>;

    /// Origine de la piste audio, si la source en a une.
    fn audio_input(&self) -> Option<AudioInput>;
}

/// Graphe audio : tape l'audio d'une source vers l'enregistrement.
pub trait AudioGraph {
    /// # Errors
    /// Returns an error if the audio graph cannot be built.
    fn tap(&mut self, input: &AudioInput) -> anyhow::Result<AudioTrack>;

    /// Libère le graphe. Idempotent.
    fn close(&mut self);
}

/// Encodeur externe : `start(stream) ; feed(frame) ; stop() -> chunks`.
pub trait Recorder {
    /// Capacité de l'encodeur pour un type MIME de conteneur.
    fn is_type_supported(&self, mime: &str) -> bool;

    /// # Errors
    /// Returns an error if the encoder cannot start.
    fn start(&mut self, stream: &MediaStream, mime: &str) -> anyhow::Result<()>;

    /// # Errors
    /// Returns an error if the frame cannot be delivered to the encoder.
    fn feed(&mut self, frame: &FrameBuffer, time: f64) -> anyhow::Result<()>;

    /// Finalise et retourne les chunks encodés, dans l'ordre.
    ///
    /// # Errors
    /// Returns an error if the encoder reports a failure.
    fn stop(&mut self) -> anyhow::Result<Vec<Vec<u8>>>;

    /// Arrêt sans résultat, après une erreur. Idempotent.
    fn abort(&mut self);
}

/// Presse-papiers externe.
pub trait Clipboard {
    /// # Errors
    /// Returns an error if the clipboard rejects the write.
    fn write_text(&mut self, text: &str) -> anyhow::Result<()>;
}
