use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Nature d'une piste média.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Piste d'un flux combiné, arrêtable une seule fois.
///
/// Les clones partagent le même état : arrêter l'un arrête tous les autres.
///
/// # Example
/// ```
/// use ac_core::stream::{StreamTrack, TrackKind};
/// let track = StreamTrack::new(TrackKind::Video);
/// let observer = track.clone();
/// track.stop();
/// assert!(!observer.is_live());
/// ```
#[derive(Clone, Debug)]
pub struct StreamTrack {
    kind: TrackKind,
    live: Arc<AtomicBool>,
}

impl StreamTrack {
    #[must_use]
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Idempotent.
    pub fn stop(&self) {
        self.live.store(false, Ordering::Release);
    }
}

/// Where the audio of a tapped source can be read from by an encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioInput {
    /// Première piste audio d'un fichier média.
    File(PathBuf),
}

/// Piste audio issue d'un graphe audio : la piste + son origine.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    pub track: StreamTrack,
    pub input: AudioInput,
}

/// Flux combiné remis à l'encodeur : vidéo capturée + audio tapé.
#[derive(Clone, Debug)]
pub struct MediaStream {
    /// Piste vidéo de la surface de capture ASCII.
    pub video: StreamTrack,
    /// Largeur des frames vidéo.
    pub width: u32,
    /// Hauteur des frames vidéo.
    pub height: u32,
    /// Cadence nominale des frames.
    pub fps: f64,
    /// Piste audio optionnelle (source muette = `None`).
    pub audio: Option<AudioTrack>,
}

impl MediaStream {
    /// Stop every track of the stream.
    pub fn stop_all(&self) {
        self.video.stop();
        if let Some(audio) = &self.audio {
            audio.track.stop();
        }
    }

    /// `true` if at least one track is still live.
    #[must_use]
    pub fn any_live(&self) -> bool {
        self.video.is_live() || self.audio.as_ref().is_some_and(|a| a.track.is_live())
    }
}

/// Résultat binaire d'un transcodage.
///
/// # Example
/// ```
/// use ac_core::stream::Blob;
/// let blob = Blob::from_chunks("video/webm", vec![vec![1, 2], vec![3]]);
/// assert_eq!(blob.data, vec![1, 2, 3]);
/// assert_eq!(blob.extension(), "webm");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    /// Type MIME négocié, ex. `video/mp4`.
    pub mime: String,
    pub data: Vec<u8>,
}

impl Blob {
    /// Concatène les chunks accumulés en un seul blob.
    #[must_use]
    pub fn from_chunks(mime: &str, chunks: Vec<Vec<u8>>) -> Self {
        let len = chunks.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity(len);
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }
        Self {
            mime: mime.to_string(),
            data,
        }
    }

    /// File extension derived from the MIME subtype (`video/mp4` → `mp4`).
    #[must_use]
    pub fn extension(&self) -> &str {
        self.mime
            .split('/')
            .nth(1)
            .and_then(|s| s.split(';').next())
            .unwrap_or("bin")
    }
}
