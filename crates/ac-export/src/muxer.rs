use std::collections::HashSet;
use std::io::Write;
use std::process::{Child, Command, Stdio};

use ac_core::frame::FrameBuffer;
use ac_core::stream::{AudioInput, MediaStream};
use ac_core::traits::Recorder;
use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

/// Un encodeur ffmpeg et les options qui l'accompagnent.
struct Codec {
    encoder: &'static str,
    args: &'static [&'static str],
}

/// Paramètres ffmpeg d'un conteneur ; encodeurs par ordre de préférence.
struct Container {
    mime: &'static str,
    muxer: &'static str,
    extension: &'static str,
    video: &'static [Codec],
    audio: &'static [Codec],
}

static CONTAINERS: [Container; 2] = [
    Container {
        mime: "video/mp4",
        muxer: "mp4",
        extension: "mp4",
        video: &[Codec {
            encoder: "libx264",
            // yuv420p : dimensions paires obligatoires.
            args: &[
                "-vf",
                "scale=trunc(iw/2)*2:trunc(ih/2)*2",
                "-preset",
                "veryfast",
                "-crf",
                "20",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ],
        }],
        audio: &[Codec {
            encoder: "aac",
            args: &["-b:a", "192k"],
        }],
    },
    Container {
        mime: "video/webm",
        muxer: "webm",
        extension: "webm",
        video: &[
            Codec {
                encoder: "libvpx-vp9",
                args: &[
                    "-b:v",
                    "0",
                    "-crf",
                    "32",
                    "-deadline",
                    "realtime",
                    "-pix_fmt",
                    "yuv420p",
                ],
            },
            // VP8 : le crf exige un débit plafond.
            Codec {
                encoder: "libvpx",
                args: &[
                    "-b:v",
                    "2M",
                    "-crf",
                    "10",
                    "-deadline",
                    "realtime",
                    "-pix_fmt",
                    "yuv420p",
                ],
            },
        ],
        audio: &[
            Codec {
                encoder: "libopus",
                args: &["-b:a", "128k"],
            },
            Codec {
                encoder: "libvorbis",
                args: &["-q:a", "5"],
            },
        ],
    },
];

fn container(mime: &str) -> Option<&'static Container> {
    CONTAINERS.iter().find(|c| c.mime == mime)
}

/// Muxers et encodeurs déclarés par le binaire ffmpeg.
#[derive(Clone, Debug, Default)]
pub struct FfmpegCaps {
    pub muxers: HashSet<String>,
    pub encoders: HashSet<String>,
}

impl FfmpegCaps {
    /// Interroge `ffmpeg -muxers` et `ffmpeg -encoders`.
    ///
    /// # Errors
    /// Returns an error if ffmpeg cannot be run.
    pub fn probe() -> Result<Self> {
        let list = |flag: &str| -> Result<String> {
            let out = Command::new("ffmpeg")
                .args(["-hide_banner", flag])
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .with_context(|| format!("ffmpeg {flag}"))?;
            Ok(String::from_utf8_lossy(&out.stdout).into_owned())
        };
        Ok(Self {
            muxers: parse_capability_list(&list("-muxers")?),
            encoders: parse_capability_list(&list("-encoders")?),
        })
    }

    /// Le conteneur et au moins un de ses encodeurs vidéo sont disponibles.
    #[must_use]
    pub fn supports(&self, mime: &str) -> bool {
        container(mime).is_some_and(|c| {
            self.muxers.contains(c.muxer) && self.video_codec(c).is_some()
        })
    }

    /// Premier encodeur vidéo du conteneur présent dans ffmpeg.
    fn video_codec(&self, c: &'static Container) -> Option<&'static Codec> {
        c.video.iter().find(|codec| self.encoders.contains(codec.encoder))
    }

    /// Premier encodeur audio présent ; à défaut le préféré, ffmpeg
    /// signalera l'absence à l'arrêt.
    fn audio_codec(&self, c: &'static Container) -> &'static Codec {
        c.audio
            .iter()
            .find(|codec| self.encoders.contains(codec.encoder))
            .unwrap_or(&c.audio[0])
    }
}

/// Noms de la liste `ffmpeg -muxers` / `-encoders`.
///
/// Lignes de la forme ` E  mp4   MP4 (MPEG-4 Part 14)` (muxers) ou
/// ` V....D libx264  H.264` (encodeurs), après la ligne de tirets.
///
/// # Example
/// ```
/// use ac_export::muxer::parse_capability_list;
/// let text = "File formats:\n D. = Demuxing\n --\n  E mp4  MP4\n  E webm WebM\n";
/// let names = parse_capability_list(text);
/// assert!(names.contains("mp4") && names.contains("webm"));
/// ```
#[must_use]
pub fn parse_capability_list(text: &str) -> HashSet<String> {
    text.lines()
        .skip_while(|l| {
            let l = l.trim();
            l.len() < 2 || !l.chars().all(|c| c == '-')
        })
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let _flags = parts.next()?;
            parts.next()
        })
        // Certaines entrées groupent plusieurs noms : "matroska,webm".
        .flat_map(|names| names.split(',').map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Encodeur ffmpeg en subprocess : frames RGBA sur stdin, audio de la
/// source en seconde entrée, sortie dans un fichier temporaire.
pub struct FfmpegRecorder {
    caps: FfmpegCaps,
    child: Option<Child>,
    output: Option<NamedTempFile>,
    frame_size: (u32, u32),
    frames: u64,
}

impl FfmpegRecorder {
    /// Probe ffmpeg une fois ; sans ffmpeg, aucun type n'est supporté.
    #[must_use]
    pub fn new() -> Self {
        let caps = FfmpegCaps::probe().unwrap_or_else(|e| {
            log::warn!("capacités ffmpeg inconnues : {e:#}");
            FfmpegCaps::default()
        });
        Self::with_caps(caps)
    }

    #[must_use]
    pub fn with_caps(caps: FfmpegCaps) -> Self {
        Self {
            caps,
            child: None,
            output: None,
            frame_size: (0, 0),
            frames: 0,
        }
    }

    fn command(
        stream: &MediaStream,
        c: &Container,
        video: &Codec,
        audio_codec: &Codec,
        out: &std::path::Path,
    ) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgba", "-s"])
            .arg(format!("{}x{}", stream.width, stream.height))
            .arg("-r")
            .arg(format!("{:.3}", stream.fps.max(1.0)))
            .args(["-i", "pipe:0"]);
        let audio = stream.audio.as_ref().filter(|a| a.track.is_live());
        if let Some(track) = audio {
            let AudioInput::File(path) = &track.input;
            cmd.arg("-i").arg(path).args(["-map", "0:v:0", "-map", "1:a:0?"]);
        }
        cmd.args(["-c:v", video.encoder]).args(video.args);
        if audio.is_some() {
            cmd.args(["-c:a", audio_codec.encoder])
                .args(audio_codec.args)
                .arg("-shortest");
        }
        cmd.args(["-f", c.muxer]).arg(out);
        cmd
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            drop(child.stdin.take());
            if let Err(e) = child.kill() {
                log::trace!("kill encodeur : {e}");
            }
            if let Err(e) = child.wait() {
                log::warn!("wait encodeur : {e}");
            }
        }
    }
}

impl Default for FfmpegRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder for FfmpegRecorder {
    fn is_type_supported(&self, mime: &str) -> bool {
        self.caps.supports(mime)
    }

    fn start(&mut self, stream: &MediaStream, mime: &str) -> Result<()> {
        if self.child.is_some() {
            bail!("encodeur déjà démarré");
        }
        let Some(c) = container(mime) else {
            bail!("type {mime} non géré");
        };
        let Some(video) = self.caps.video_codec(c) else {
            bail!("aucun encodeur vidéo disponible pour {mime}");
        };
        let audio = self.caps.audio_codec(c);
        let output = tempfile::Builder::new()
            .prefix("asciicam-")
            .suffix(&format!(".{}", c.extension))
            .tempfile()
            .context("fichier temporaire de sortie")?;

        let child = Self::command(stream, c, video, audio, output.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("impossible de lancer l'encodeur ffmpeg (installé et dans le PATH ?)")?;
        log::debug!(
            "encodeur {mime}/{} lancé → {} ({}x{}, audio={})",
            video.encoder,
            output.path().display(),
            stream.width,
            stream.height,
            stream.audio.is_some()
        );

        self.child = Some(child);
        self.output = Some(output);
        self.frame_size = (stream.width, stream.height);
        self.frames = 0;
        Ok(())
    }

    fn feed(&mut self, frame: &FrameBuffer, _time: f64) -> Result<()> {
        if (frame.width, frame.height) != self.frame_size {
            bail!(
                "frame {}x{} pour un flux {}x{}",
                frame.width,
                frame.height,
                self.frame_size.0,
                self.frame_size.1
            );
        }
        let Some(stdin) = self.child.as_mut().and_then(|c| c.stdin.as_mut()) else {
            bail!("encodeur non démarré");
        };
        stdin
            .write_all(&frame.data)
            .context("écriture vers l'encodeur")?;
        self.frames += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<Vec<u8>>> {
        let Some(mut child) = self.child.take() else {
            bail!("encodeur non démarré");
        };
        drop(child.stdin.take());
        let out = child.wait_with_output().context("attente de l'encodeur")?;
        if !out.status.success() {
            self.output = None;
            bail!(
                "ffmpeg ({}) : {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        let Some(file) = self.output.take() else {
            bail!("fichier de sortie perdu");
        };
        let data = std::fs::read(file.path()).context("lecture du média encodé")?;
        log::debug!("encodeur arrêté : {} frames, {} octets", self.frames, data.len());
        Ok(vec![data])
    }

    fn abort(&mut self) {
        self.kill();
        // NamedTempFile supprime le fichier partiel au drop.
        self.output = None;
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        self.kill();
    }
}
