use std::path::{Path, PathBuf};
use std::process::Child;

use ac_core::frame::FrameBuffer;
use ac_core::stream::AudioInput;
use ac_core::traits::{VideoFrame, VideoSource};
use anyhow::{Context, Result, bail};

use crate::ffmpeg::{PipeSpec, VideoInfo, kill_child, probe_video, read_exact_or_eof, spawn_rgba_pipe};

/// Source vidéo séquentielle à résolution native, pour le transcodage.
///
/// `seek` fixe la position de départ, `play` lance le décodeur, puis
/// chaque `next_frame` bloque jusqu'à la frame suivante.
pub struct FfmpegVideo {
    path: PathBuf,
    info: VideoInfo,
    child: Option<Child>,
    frame: FrameBuffer,
    start: f64,
    frames_read: u64,
    position: f64,
}

impl FfmpegVideo {
    /// Probe le fichier ; aucun décodeur n'est lancé avant `play`.
    ///
    /// # Errors
    /// Returns an error if ffprobe fails or finds no video stream.
    pub fn open(path: &Path) -> Result<Self> {
        let info = probe_video(path)?;
        Ok(Self::with_info(path, info))
    }

    #[must_use]
    pub fn with_info(path: &Path, info: VideoInfo) -> Self {
        Self {
            path: path.to_path_buf(),
            info,
            child: None,
            frame: FrameBuffer::new(info.width, info.height),
            start: 0.0,
            frames_read: 0,
            position: 0.0,
        }
    }

    #[must_use]
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn stop_decoder(&mut self) {
        if let Some(mut child) = self.child.take() {
            kill_child(&mut child);
        }
    }

    /// Fin du pipe : statut ffmpeg → fin normale ou erreur de décodage.
    fn finish(&mut self) -> Result<VideoFrame<'_>> {
        if let Some(mut child) = self.child.take() {
            let status = child.wait().context("attente de ffmpeg")?;
            if !status.success() {
                bail!(
                    "ffmpeg a échoué ({status}) à {:.2}s de {}",
                    self.position,
                    self.path.display()
                );
            }
        }
        log::debug!("fin de flux après {} frames", self.frames_read);
        Ok(VideoFrame::Ended)
    }
}

impl VideoSource for FfmpegVideo {
    fn native_size(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn duration(&self) -> f64 {
        self.info.duration
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, secs: f64) -> Result<()> {
        self.stop_decoder();
        self.start = secs.max(0.0);
        self.position = self.start;
        self.frames_read = 0;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let spec = PipeSpec {
            width: self.info.width,
            height: self.info.height,
            start: self.start,
            fps: self.info.fps,
        };
        self.child = Some(spawn_rgba_pipe(&self.path, spec)?);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<VideoFrame<'_>> {
        let Some(stdout) = self.child.as_mut().and_then(|c| c.stdout.as_mut()) else {
            bail!("lecture non démarrée");
        };
        let complete = match read_exact_or_eof(stdout, &mut self.frame.data) {
            Ok(complete) => complete,
            Err(e) => {
                self.stop_decoder();
                return Err(e.context("lecture du pipe ffmpeg"));
            }
        };
        if !complete {
            return self.finish();
        }
        self.position = self.start + self.frames_read as f64 / self.info.fps.max(1.0);
        self.frames_read += 1;
        Ok(VideoFrame::Frame {
            pixels: &self.frame,
            time: self.position,
        })
    }

    fn audio_input(&self) -> Option<AudioInput> {
        self.info
            .has_audio
            .then(|| AudioInput::File(self.path.clone()))
    }
}

impl Drop for FfmpegVideo {
    fn drop(&mut self) {
        self.stop_decoder();
    }
}
