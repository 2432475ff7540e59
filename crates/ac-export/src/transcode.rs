use ac_ascii::build;
use ac_core::config::AsciiConfig;
use ac_core::error::CoreError;
use ac_core::frame::FrameBuffer;
use ac_core::stream::{AudioTrack, Blob, MediaStream, StreamTrack, TrackKind};
use ac_core::traits::{AudioGraph, Recorder, VideoFrame, VideoSource};
use ac_render::Renderer;
use flume::Sender;
use thiserror::Error;

/// Conteneurs essayés dans l'ordre.
pub const PREFERRED_MIME: [&str; 2] = ["video/mp4", "video/webm"];

/// Échec terminal d'une session de transcodage.
///
/// Toujours retourné après libération complète des ressources.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("configuration invalide : {0}")]
    Config(#[from] CoreError),
    #[error("aucun conteneur supporté parmi {0:?}")]
    NoSupportedFormat(Vec<String>),
    #[error("graphe audio : {0:#}")]
    Audio(#[source] anyhow::Error),
    #[error("encodeur : {0:#}")]
    Encoder(#[source] anyhow::Error),
    #[error("lecture : {0:#}")]
    Playback(#[source] anyhow::Error),
    #[error("décodage : {0:#}")]
    Decode(#[source] anyhow::Error),
}

/// Avancement, publié sur le canal optionnel du transcodeur.
#[derive(Clone, Debug, PartialEq)]
pub enum TranscodeProgress {
    Started {
        mime: String,
        width: u32,
        height: u32,
    },
    Frame {
        index: u64,
        time: f64,
        duration: f64,
    },
    Finished {
        frames: u64,
        bytes: usize,
    },
}

/// Ressources d'une session, libérées quel que soit le résultat.
#[derive(Default)]
struct Session {
    audio: Option<AudioTrack>,
    stream: Option<MediaStream>,
    recording: bool,
}

/// Surfaces de capture, à la résolution native de la vidéo.
struct Surfaces {
    /// Frame brute copiée depuis la source.
    raw: FrameBuffer,
    /// Rendu ASCII remis à l'encodeur.
    ascii: FrameBuffer,
}

/// Ré-exécute le pipeline sur chaque frame d'une vidéo et produit un média
/// encodé avec l'audio de la source.
pub struct Transcoder<R: Recorder, A: AudioGraph> {
    recorder: R,
    audio: A,
    renderer: Renderer,
    progress: Option<Sender<TranscodeProgress>>,
}

impl<R: Recorder, A: AudioGraph> Transcoder<R, A> {
    #[must_use]
    pub fn new(recorder: R, audio: A, renderer: Renderer) -> Self {
        Self {
            recorder,
            audio,
            renderer,
            progress: None,
        }
    }

    /// Publie l'avancement sur `tx` ; un récepteur fermé est ignoré.
    #[must_use]
    pub fn with_progress(mut self, tx: Sender<TranscodeProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    #[must_use]
    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    #[must_use]
    pub fn audio_graph(&self) -> &A {
        &self.audio
    }

    /// Premier conteneur de [`PREFERRED_MIME`] que l'encodeur accepte.
    ///
    /// # Errors
    /// [`TranscodeError::NoSupportedFormat`] if none is supported.
    pub fn negotiate(&self) -> Result<&'static str, TranscodeError> {
        PREFERRED_MIME
            .into_iter()
            .find(|mime| self.recorder.is_type_supported(mime))
            .ok_or_else(|| {
                TranscodeError::NoSupportedFormat(
                    PREFERRED_MIME.iter().map(ToString::to_string).collect(),
                )
            })
    }

    /// Transcode `video` entière depuis t = 0.
    ///
    /// # Errors
    /// Toute erreur de configuration, audio, encodeur, lecture ou décodage
    /// termine la session : l'encodeur est interrompu, l'audio libéré, les
    /// pistes arrêtées, et aucun blob partiel n'est retourné.
    pub fn transcode<V: VideoSource>(
        &mut self,
        video: &mut V,
        config: &AsciiConfig,
    ) -> Result<Blob, TranscodeError> {
        config.validate()?;
        let mut session = Session::default();
        let result = self.run(video, config, &mut session);
        if result.is_err() && session.recording {
            self.recorder.abort();
        }
        self.release(&session);
        match &result {
            Ok(blob) => log::info!("transcodage terminé : {} ({} octets)", blob.mime, blob.data.len()),
            Err(e) => log::warn!("transcodage abandonné : {e}"),
        }
        result
    }

    fn run<V: VideoSource>(
        &mut self,
        video: &mut V,
        config: &AsciiConfig,
        session: &mut Session,
    ) -> Result<Blob, TranscodeError> {
        let (width, height) = video.native_size();
        let mut surfaces = Surfaces {
            raw: FrameBuffer::new(width, height),
            ascii: FrameBuffer::new(width, height),
        };

        if let Some(input) = video.audio_input() {
            let track = self.audio.tap(&input).map_err(TranscodeError::Audio)?;
            session.audio = Some(track);
        }

        let mime = self.negotiate()?;
        let stream = MediaStream {
            video: StreamTrack::new(TrackKind::Video),
            width,
            height,
            fps: video.fps(),
            audio: session.audio.clone(),
        };
        session.stream = Some(stream.clone());

        self.recorder
            .start(&stream, mime)
            .map_err(TranscodeError::Encoder)?;
        session.recording = true;
        log::debug!("enregistrement {mime} {width}x{height} @ {:.2} fps", stream.fps);
        self.emit(TranscodeProgress::Started {
            mime: mime.to_string(),
            width,
            height,
        });

        video.seek(0.0).map_err(TranscodeError::Playback)?;
        video.play().map_err(TranscodeError::Playback)?;

        let duration = video.duration();
        let mut frames = 0u64;
        let mut last_time: Option<f64> = None;
        loop {
            let time = match video.next_frame().map_err(TranscodeError::Decode)? {
                VideoFrame::Ended => break,
                VideoFrame::Frame { pixels, time } => {
                    // Position non croissante : la source a rebouclé.
                    if last_time.is_some_and(|prev| time <= prev) {
                        log::debug!("position {time:.3}s non croissante, fin de la capture");
                        break;
                    }
                    copy_into(&mut surfaces.raw, pixels)?;
                    time
                }
            };
            self.capture(&mut surfaces, config)?;
            self.recorder
                .feed(&surfaces.ascii, time)
                .map_err(TranscodeError::Encoder)?;
            last_time = Some(time);
            self.emit(TranscodeProgress::Frame {
                index: frames,
                time,
                duration,
            });
            frames += 1;
        }

        let chunks = self.recorder.stop().map_err(TranscodeError::Encoder)?;
        session.recording = false;
        let blob = Blob::from_chunks(mime, chunks);
        self.emit(TranscodeProgress::Finished {
            frames,
            bytes: blob.data.len(),
        });
        Ok(blob)
    }

    /// Surface brute → grille → surface ASCII.
    fn capture(&mut self, surfaces: &mut Surfaces, config: &AsciiConfig) -> Result<(), TranscodeError> {
        let grid = build(&surfaces.raw, config)?;
        let size = (surfaces.raw.width, surfaces.raw.height);
        self.renderer.render(&grid, size, &mut surfaces.ascii, config);
        Ok(())
    }

    fn release(&mut self, session: &Session) {
        self.audio.close();
        if let Some(track) = &session.audio {
            track.track.stop();
        }
        if let Some(stream) = &session.stream {
            stream.stop_all();
        }
    }

    fn emit(&self, event: TranscodeProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(event);
        }
    }
}

/// Copie une frame décodée dans la surface brute (redimensionnée si la
/// source change de taille en cours de route).
///
/// # Errors
/// [`TranscodeError::Decode`] si `src.data` ne fait pas `width * height * 4`.
fn copy_into(dst: &mut FrameBuffer, src: &FrameBuffer) -> Result<(), TranscodeError> {
    let expected = src.width as usize * src.height as usize * 4;
    if src.data.len() != expected {
        return Err(TranscodeError::Decode(anyhow::anyhow!(
            "frame {}x{} de {} octets, {expected} attendus",
            src.width,
            src.height,
            src.data.len()
        )));
    }
    dst.resize(src.width, src.height);
    dst.data.copy_from_slice(&src.data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use ac_core::Rgb;
    use ac_core::stream::AudioInput;
    use anyhow::{Result, anyhow};

    struct FakeVideo {
        frames: Vec<(FrameBuffer, f64)>,
        cursor: usize,
        playing: bool,
        has_audio: bool,
        fail_play: bool,
        fail_at: Option<usize>,
        seeks: Vec<f64>,
    }

    impl FakeVideo {
        fn with_times(times: &[f64]) -> Self {
            Self {
                frames: times
                    .iter()
                    .map(|&t| (FrameBuffer::solid(8, 6, Rgb::WHITE), t))
                    .collect(),
                cursor: 0,
                playing: false,
                has_audio: true,
                fail_play: false,
                fail_at: None,
                seeks: Vec::new(),
            }
        }
    }

    impl VideoSource for FakeVideo {
        fn native_size(&self) -> (u32, u32) {
            (8, 6)
        }
        fn fps(&self) -> f64 {
            10.0
        }
        fn duration(&self) -> f64 {
            self.frames.last().map_or(0.0, |(_, t)| *t)
        }
        fn current_time(&self) -> f64 {
            self.frames.get(self.cursor).map_or(0.0, |(_, t)| *t)
        }
        fn seek(&mut self, secs: f64) -> Result<()> {
            self.seeks.push(secs);
            self.cursor = 0;
            Ok(())
        }
        fn play(&mut self) -> Result<()> {
            if self.fail_play {
                return Err(anyhow!("lecture refusée"));
            }
            self.playing = true;
            Ok(())
        }
        fn next_frame(&mut self) -> Result<VideoFrame<'_>> {
            assert!(self.playing, "next_frame avant play");
            if self.fail_at == Some(self.cursor) {
                return Err(anyhow!("frame corrompue"));
            }
            let Some((fb, t)) = self.frames.get(self.cursor) else {
                return Ok(VideoFrame::Ended);
            };
            self.cursor += 1;
            Ok(VideoFrame::Frame { pixels: fb, time: *t })
        }
        fn audio_input(&self) -> Option<AudioInput> {
            self.has_audio
                .then(|| AudioInput::File(PathBuf::from("clip.mp4")))
        }
    }

    #[derive(Default)]
    struct FakeRecorder {
        supported: Vec<&'static str>,
        started: Option<(String, MediaStream)>,
        fed: Vec<(FrameBuffer, f64)>,
        fail_feed_at: Option<usize>,
        fail_stop: bool,
        stopped: bool,
        aborted: bool,
    }

    impl Recorder for FakeRecorder {
        fn is_type_supported(&self, mime: &str) -> bool {
            self.supported.contains(&mime)
        }
        fn start(&mut self, stream: &MediaStream, mime: &str) -> Result<()> {
            self.started = Some((mime.to_string(), stream.clone()));
            Ok(())
        }
        fn feed(&mut self, frame: &FrameBuffer, time: f64) -> Result<()> {
            if self.fail_feed_at == Some(self.fed.len()) {
                return Err(anyhow!("pipe fermé"));
            }
            self.fed.push((frame.clone(), time));
            Ok(())
        }
        fn stop(&mut self) -> Result<Vec<Vec<u8>>> {
            self.stopped = true;
            if self.fail_stop {
                return Err(anyhow!("muxer en échec"));
            }
            Ok(self.fed.iter().map(|_| vec![0xAB]).collect())
        }
        fn abort(&mut self) {
            self.aborted = true;
        }
    }

    #[derive(Default)]
    struct FakeAudio {
        tracks: Vec<StreamTrack>,
        closed: usize,
        fail: bool,
    }

    impl AudioGraph for FakeAudio {
        fn tap(&mut self, input: &AudioInput) -> Result<AudioTrack> {
            if self.fail {
                return Err(anyhow!("pas de contexte audio"));
            }
            let track = StreamTrack::new(TrackKind::Audio);
            self.tracks.push(track.clone());
            Ok(AudioTrack {
                track,
                input: input.clone(),
            })
        }
        fn close(&mut self) {
            self.closed += 1;
        }
    }

    fn transcoder(recorder: FakeRecorder) -> Transcoder<FakeRecorder, FakeAudio> {
        Transcoder::new(recorder, FakeAudio::default(), Renderer::new().unwrap())
    }

    fn mp4_only() -> FakeRecorder {
        FakeRecorder {
            supported: vec!["video/mp4"],
            ..FakeRecorder::default()
        }
    }

    fn config() -> AsciiConfig {
        AsciiConfig {
            output_width: 4,
            output_height: 3,
            ..AsciiConfig::default()
        }
    }

    fn all_tracks_stopped(t: &Transcoder<FakeRecorder, FakeAudio>) -> bool {
        let stream_dead = t
            .recorder()
            .started
            .as_ref()
            .is_none_or(|(_, s)| !s.any_live());
        stream_dead && t.audio_graph().tracks.iter().all(|tr| !tr.is_live())
    }

    #[test]
    fn full_video_produces_one_blob() {
        let mut t = transcoder(mp4_only());
        let mut video = FakeVideo::with_times(&[0.0, 0.1, 0.2]);
        let blob = t.transcode(&mut video, &config()).unwrap();

        assert_eq!(blob.mime, "video/mp4");
        assert_eq!(blob.data, vec![0xAB; 3]);
        assert_eq!(video.seeks, vec![0.0]);
        let fed = &t.recorder().fed;
        assert_eq!(fed.len(), 3);
        // Surfaces à la résolution native, pas à celle de la grille.
        assert!(fed.iter().all(|(f, _)| (f.width, f.height) == (8, 6)));
        assert!(t.recorder().stopped);
        assert!(!t.recorder().aborted);
        assert_eq!(t.audio_graph().closed, 1);
        assert!(all_tracks_stopped(&t));
    }

    #[test]
    fn stream_carries_audio_and_native_size() {
        let mut t = transcoder(mp4_only());
        t.transcode(&mut FakeVideo::with_times(&[0.0]), &config()).unwrap();
        let (_, stream) = t.recorder().started.as_ref().unwrap();
        assert_eq!((stream.width, stream.height), (8, 6));
        assert_eq!(
            stream.audio.as_ref().map(|a| a.input.clone()),
            Some(AudioInput::File(PathBuf::from("clip.mp4")))
        );
    }

    #[test]
    fn silent_video_has_no_audio_track() {
        let mut t = transcoder(mp4_only());
        let mut video = FakeVideo::with_times(&[0.0]);
        video.has_audio = false;
        t.transcode(&mut video, &config()).unwrap();
        let (_, stream) = t.recorder().started.as_ref().unwrap();
        assert!(stream.audio.is_none());
        assert!(t.audio_graph().tracks.is_empty());
    }

    #[test]
    fn falls_back_to_second_container() {
        let mut t = transcoder(FakeRecorder {
            supported: vec!["video/webm"],
            ..FakeRecorder::default()
        });
        let blob = t.transcode(&mut FakeVideo::with_times(&[0.0]), &config()).unwrap();
        assert_eq!(blob.mime, "video/webm");
    }

    #[test]
    fn no_supported_container_fails_after_cleanup() {
        let mut t = transcoder(FakeRecorder::default());
        let err = t
            .transcode(&mut FakeVideo::with_times(&[0.0]), &config())
            .unwrap_err();
        assert!(matches!(err, TranscodeError::NoSupportedFormat(_)));
        assert!(t.recorder().started.is_none());
        assert_eq!(t.audio_graph().closed, 1);
        assert!(all_tracks_stopped(&t));
    }

    #[test]
    fn non_monotonic_time_ends_capture() {
        let mut t = transcoder(mp4_only());
        let mut video = FakeVideo::with_times(&[0.0, 0.1, 0.2, 0.0, 0.1]);
        let blob = t.transcode(&mut video, &config()).unwrap();
        assert_eq!(t.recorder().fed.len(), 3);
        assert_eq!(blob.data.len(), 3);
    }

    #[test]
    fn decode_error_aborts_without_blob() {
        let mut t = transcoder(mp4_only());
        let mut video = FakeVideo::with_times(&[0.0, 0.1, 0.2]);
        video.fail_at = Some(1);
        let err = t.transcode(&mut video, &config()).unwrap_err();
        assert!(matches!(err, TranscodeError::Decode(_)));
        assert!(t.recorder().aborted);
        assert!(!t.recorder().stopped);
        assert_eq!(t.audio_graph().closed, 1);
        assert!(all_tracks_stopped(&t));
    }

    #[test]
    fn truncated_frame_is_a_decode_error() {
        let mut t = transcoder(mp4_only());
        let mut video = FakeVideo::with_times(&[0.0, 0.1]);
        video.frames[1].0.data.truncate(10);
        let err = t.transcode(&mut video, &config()).unwrap_err();
        assert!(matches!(err, TranscodeError::Decode(_)));
        assert_eq!(t.recorder().fed.len(), 1);
        assert!(t.recorder().aborted);
        assert!(all_tracks_stopped(&t));
    }

    #[test]
    fn playback_rejection_aborts_recorder() {
        let mut t = transcoder(mp4_only());
        let mut video = FakeVideo::with_times(&[0.0]);
        video.fail_play = true;
        let err = t.transcode(&mut video, &config()).unwrap_err();
        assert!(matches!(err, TranscodeError::Playback(_)));
        assert!(t.recorder().aborted);
        assert!(all_tracks_stopped(&t));
    }

    #[test]
    fn encoder_failure_mid_stream_is_terminal() {
        let mut t = transcoder(FakeRecorder {
            fail_feed_at: Some(1),
            ..mp4_only()
        });
        let err = t
            .transcode(&mut FakeVideo::with_times(&[0.0, 0.1]), &config())
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Encoder(_)));
        assert!(t.recorder().aborted);
        assert!(all_tracks_stopped(&t));
    }

    #[test]
    fn failing_stop_returns_no_blob() {
        let mut t = transcoder(FakeRecorder {
            fail_stop: true,
            ..mp4_only()
        });
        let err = t
            .transcode(&mut FakeVideo::with_times(&[0.0]), &config())
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Encoder(_)));
        assert!(t.recorder().aborted);
        assert!(all_tracks_stopped(&t));
    }

    #[test]
    fn audio_failure_happens_before_recording() {
        let mut t = Transcoder::new(
            mp4_only(),
            FakeAudio {
                fail: true,
                ..FakeAudio::default()
            },
            Renderer::new().unwrap(),
        );
        let err = t
            .transcode(&mut FakeVideo::with_times(&[0.0]), &config())
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Audio(_)));
        assert!(t.recorder().started.is_none());
        assert_eq!(t.audio_graph().closed, 1);
    }

    #[test]
    fn empty_charset_is_rejected_before_any_resource() {
        let mut t = transcoder(mp4_only());
        let bad = AsciiConfig {
            chars: String::new(),
            ..config()
        };
        let err = t
            .transcode(&mut FakeVideo::with_times(&[0.0]), &bad)
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Config(CoreError::EmptyCharset)));
        assert_eq!(t.audio_graph().closed, 0);
        assert!(t.recorder().started.is_none());
    }

    #[test]
    fn progress_events_are_published() {
        let (tx, rx) = flume::unbounded();
        let mut t = transcoder(mp4_only()).with_progress(tx);
        t.transcode(&mut FakeVideo::with_times(&[0.0, 0.5]), &config())
            .unwrap();
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], TranscodeProgress::Started { width: 8, height: 6, .. }));
        assert_eq!(
            events[3],
            TranscodeProgress::Finished {
                frames: 2,
                bytes: 2
            }
        );
    }

    #[test]
    fn ascii_frame_differs_from_raw_frame() {
        let mut t = transcoder(mp4_only());
        t.transcode(&mut FakeVideo::with_times(&[0.0]), &config()).unwrap();
        let (frame, _) = &t.recorder().fed[0];
        // Fond noir opaque du rendu, pas le blanc de la source.
        assert_eq!(frame.pixel(7, 5).3, 255);
        assert_ne!(*frame, FrameBuffer::solid(8, 6, Rgb::WHITE));
    }
}
