use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ac_core::stream::{AudioInput, AudioTrack, StreamTrack, TrackKind};
use ac_core::traits::AudioGraph;
use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Piste audio décodée, downmixée en mono.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Durée en secondes.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// Décode la première piste audio d'un fichier média via symphonia.
///
/// Au-delà de 24 kHz le signal est décimé par 2 pour borner la mémoire
/// sur les longs clips.
///
/// # Errors
/// Fichier absent ou illisible, aucune piste audio décodable, ou piste vide.
pub fn decode_audio(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .with_context(|| format!("impossible d'ouvrir {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("format audio non reconnu : {}", path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("aucune piste audio dans {}", path.display()))?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count)
        .max(1);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("décodeur audio indisponible")?;

    let decimation = if sample_rate > 24_000 { 2 } else { 1 };
    let mut samples = Vec::new();
    let mut frame_idx = 0usize;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_frames = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("paquet audio illisible : {e}");
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("trame audio ignorée : {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let frames = decoded.capacity();
        // Réalloué seulement pour un paquet plus grand que les précédents.
        if sample_buf.is_none() || frames > max_frames {
            sample_buf = Some(SampleBuffer::new(frames as u64, spec));
            max_frames = frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks(channels) {
            if frame_idx % decimation == 0 {
                samples.push(frame.iter().sum::<f32>() / frame.len() as f32);
            }
            frame_idx += 1;
        }
    }

    if samples.is_empty() {
        bail!("piste audio vide : {}", path.display());
    }
    let audio = DecodedAudio {
        samples,
        sample_rate: sample_rate / decimation as u32,
    };
    log::info!(
        "audio décodé : {:.2}s @ {} Hz depuis {}",
        audio.duration(),
        audio.sample_rate,
        path.display()
    );
    Ok(audio)
}

/// Écoute locale de l'audio tapé pendant le transcodage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Monitoring {
    /// Périphérique de sortie par défaut.
    #[default]
    Speakers,
    /// Décodage seul, rien n'est joué.
    Muted,
}

/// Flux de sortie cpal, tenu par un thread dédié jusqu'à `stop`.
#[derive(Debug)]
struct Monitor {
    stop: Option<flume::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Monitor {
    fn spawn(audio: Arc<DecodedAudio>, track: StreamTrack) -> Result<Self> {
        let (ready_tx, ready_rx) = flume::bounded::<Result<()>>(1);
        let (stop_tx, stop_rx) = flume::bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("ac-audio-monitor".to_string())
            .spawn(move || {
                let stream = match open_output(&audio, track) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Bloque jusqu'à `stop` (ou l'abandon du sender).
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop: Some(stop_tx),
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                bail!("thread de sortie audio terminé prématurément")
            }
        }
    }

    fn stop(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::warn!("thread de sortie audio en panique");
        }
    }
}

/// Ouvre la sortie par défaut et joue `audio` une fois, silence ensuite
/// ou dès que la piste est arrêtée.
fn open_output(audio: &Arc<DecodedAudio>, track: StreamTrack) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("aucun périphérique de sortie audio"))?;
    let channels = device
        .default_output_config()
        .map_or(2, |c| c.channels())
        .max(1);
    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(audio.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let source = Arc::clone(audio);
    let mut pos = 0usize;
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !track.is_live() {
                    data.fill(0.0);
                    return;
                }
                for frame in data.chunks_mut(usize::from(channels)) {
                    frame.fill(source.samples.get(pos).copied().unwrap_or(0.0));
                    pos = pos.saturating_add(1);
                }
            },
            |err| log::error!("sortie audio : {err}"),
            None,
        )
        .context("flux de sortie audio")?;
    stream.play().context("démarrage de la sortie audio")?;
    log::info!("écoute audio @ {} Hz, {channels} canaux", audio.sample_rate);
    Ok(stream)
}

/// Graphe audio d'une session de transcodage.
///
/// `tap` décode la piste du fichier source et, sauf en [`Monitoring::Muted`],
/// la joue sur la sortie par défaut. L'encodeur relit lui-même la piste du
/// fichier pour le mux ; la piste retournée porte l'origine et l'état
/// d'arrêt partagé.
///
/// # Example
/// ```
/// use ac_core::stream::AudioInput;
/// use ac_core::traits::AudioGraph;
/// use ac_export::audio::SourceAudioGraph;
///
/// let mut graph = SourceAudioGraph::muted();
/// assert!(graph.tap(&AudioInput::File("absent.mp4".into())).is_err());
/// assert_eq!(graph.live_tracks(), 0);
/// ```
#[derive(Debug, Default)]
pub struct SourceAudioGraph {
    monitoring: Monitoring,
    tracks: Vec<StreamTrack>,
    monitors: Vec<Monitor>,
    decoded: Option<Arc<DecodedAudio>>,
    closed: bool,
}

impl SourceAudioGraph {
    /// Graphe avec écoute sur la sortie par défaut.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn muted() -> Self {
        Self::with_monitoring(Monitoring::Muted)
    }

    #[must_use]
    pub fn with_monitoring(monitoring: Monitoring) -> Self {
        let mut graph = Self::default();
        graph.monitoring = monitoring;
        graph
    }

    /// Nombre de pistes encore actives.
    #[must_use]
    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    /// Dernière piste décodée, jusqu'au `close`.
    #[must_use]
    pub fn decoded(&self) -> Option<&DecodedAudio> {
        self.decoded.as_deref()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl AudioGraph for SourceAudioGraph {
    fn tap(&mut self, input: &AudioInput) -> Result<AudioTrack> {
        let AudioInput::File(path) = input;
        let audio = Arc::new(decode_audio(path)?);
        let track = StreamTrack::new(TrackKind::Audio);
        if self.monitoring == Monitoring::Speakers {
            let monitor = Monitor::spawn(Arc::clone(&audio), track.clone())
                .context("sortie audio indisponible (--mute pour transcoder sans écoute)")?;
            self.monitors.push(monitor);
        }
        // Un graphe fermé peut resservir pour une nouvelle session.
        self.closed = false;
        self.tracks.push(track.clone());
        self.decoded = Some(audio);
        log::debug!("audio tapé depuis {} ({:?})", path.display(), self.monitoring);
        Ok(AudioTrack {
            track,
            input: input.clone(),
        })
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        for track in self.tracks.drain(..) {
            track.stop();
        }
        for mut monitor in self.monitors.drain(..) {
            monitor.stop();
        }
        self.decoded = None;
        self.closed = true;
        log::debug!("graphe audio fermé");
    }
}

impl Drop for SourceAudioGraph {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// WAV PCM 16 bits mono.
    fn write_wav(dir: &Path, rate: u32, samples: &[i16]) -> PathBuf {
        let path = dir.join("tone.wav");
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn decodes_pcm_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), 8_000, &[16_384; 800]);
        let audio = decode_audio(&path).unwrap();
        assert_eq!(audio.sample_rate, 8_000);
        assert_eq!(audio.samples.len(), 800);
        assert!((audio.samples[0] - 0.5).abs() < 1e-3);
        assert!((audio.duration() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn high_rates_are_decimated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), 48_000, &[0; 960]);
        let audio = decode_audio(&path).unwrap();
        assert_eq!(audio.sample_rate, 24_000);
        assert_eq!(audio.samples.len(), 480);
    }

    #[test]
    fn missing_file_is_rejected() {
        let mut graph = SourceAudioGraph::muted();
        let input = AudioInput::File("/nulle/part/clip.mp4".into());
        assert!(graph.tap(&input).is_err());
        assert_eq!(graph.live_tracks(), 0);
        assert!(graph.decoded().is_none());
    }

    #[test]
    fn file_without_audio_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = SourceAudioGraph::muted();

        let text = dir.path().join("notes.mp4");
        std::fs::write(&text, b"pas un media").unwrap();
        assert!(graph.tap(&AudioInput::File(text)).is_err());

        let silent = write_wav(dir.path(), 8_000, &[]);
        assert!(graph.tap(&AudioInput::File(silent)).is_err());
        assert_eq!(graph.live_tracks(), 0);
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = SourceAudioGraph::muted();
        assert!(graph.tap(&AudioInput::File(dir.path().to_path_buf())).is_err());
    }

    #[test]
    fn tap_decodes_and_keeps_the_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = AudioInput::File(write_wav(dir.path(), 8_000, &[1_000; 80]));
        let mut graph = SourceAudioGraph::muted();
        let track = graph.tap(&input).unwrap();
        assert_eq!(track.input, input);
        assert_eq!(track.track.kind(), TrackKind::Audio);
        assert_eq!(graph.live_tracks(), 1);
        assert_eq!(graph.decoded().map(|a| a.samples.len()), Some(80));
    }

    #[test]
    fn close_is_idempotent_and_reusable() {
        let dir = tempfile::tempdir().unwrap();
        let input = AudioInput::File(write_wav(dir.path(), 8_000, &[0; 16]));
        let mut graph = SourceAudioGraph::muted();
        let first = graph.tap(&input).unwrap();
        graph.close();
        graph.close();
        assert!(graph.is_closed());
        assert!(!first.track.is_live());
        assert!(graph.decoded().is_none());

        let again = graph.tap(&input).unwrap();
        assert!(!graph.is_closed());
        assert!(again.track.is_live());
    }
}
