// ffmpeg et ffprobe sont appelés en subprocess (std::process::Command).
// Prérequis runtime : `ffmpeg` et `ffprobe` dans le PATH.
//
//   - `probe_video`       : ffprobe → dimensions, fps, durée, présence d'audio
//   - `spawn_rgba_pipe`   : ffmpeg → frames RGBA brutes sur stdout
//   - `read_exact_or_eof` : lecture d'une frame complète, EOF distingué

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result, bail};

/// Métadonnées extraites via ffprobe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Images par seconde (ex : 23.976, 30.0).
    pub fps: f64,
    /// Durée en secondes, 0.0 si inconnue.
    pub duration: f64,
    /// Au moins un flux audio présent.
    pub has_audio: bool,
}

/// Interroge `ffprobe` sur le fichier.
///
/// # Errors
/// Retourne une erreur si `ffprobe` est introuvable ou si le fichier ne
/// contient aucun flux vidéo.
pub fn probe_video(path: &Path) -> Result<VideoInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-show_entries",
            "stream=codec_type,width,height,r_frame_rate:format=duration",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .context("impossible de lancer ffprobe (installé et dans le PATH ?)")?;

    let info = parse_probe(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("aucun flux vidéo dans {}", path.display()))?;
    log::info!(
        "probe : {}x{} @ {:.3} fps, {:.1}s, audio={} ({})",
        info.width,
        info.height,
        info.fps,
        info.duration,
        info.has_audio,
        path.display()
    );
    Ok(info)
}

/// Parse la sortie `key=value` de ffprobe.
///
/// Seul le premier flux vidéo est retenu ; les flux audio ne servent qu'à
/// `has_audio`.
///
/// # Errors
/// Returns an error if no video stream with valid dimensions is present.
///
/// # Example
/// ```
/// use ac_source::ffmpeg::parse_probe;
/// let text = "codec_type=video\nwidth=640\nheight=480\nr_frame_rate=30000/1001\nduration=12.5\n";
/// let info = parse_probe(text).unwrap();
/// assert_eq!((info.width, info.height), (640, 480));
/// assert!((info.fps - 29.97).abs() < 0.01);
/// assert!(!info.has_audio);
/// ```
pub fn parse_probe(text: &str) -> Result<VideoInfo> {
    let mut seen_video = false;
    let mut in_first_video = false;
    let mut info = VideoInfo {
        width: 0,
        height: 0,
        fps: 30.0,
        duration: 0.0,
        has_audio: false,
    };

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "codec_type" => {
                in_first_video = value == "video" && !seen_video;
                seen_video |= value == "video";
                info.has_audio |= value == "audio";
            }
            "width" if in_first_video => info.width = value.parse().unwrap_or(0),
            "height" if in_first_video => info.height = value.parse().unwrap_or(0),
            "r_frame_rate" if in_first_video => {
                if let Some(fps) = parse_rate(value) {
                    info.fps = fps;
                }
            }
            "duration" => {
                // Durée du conteneur (section format), `N/A` possible.
                if let Ok(d) = value.parse::<f64>() {
                    info.duration = d.max(0.0);
                }
            }
            _ => {}
        }
    }

    if !seen_video || info.width == 0 || info.height == 0 {
        bail!("flux vidéo absent ou dimensions nulles");
    }
    Ok(info)
}

/// `"24000/1001"` → 23.976 ; `None` pour `0/0` ou une valeur illisible.
fn parse_rate(value: &str) -> Option<f64> {
    let (num, den) = value.split_once('/').unwrap_or((value, "1"));
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    (den > 0.0 && num > 0.0).then(|| num / den)
}

/// Paramètres d'un pipe ffmpeg → RGBA.
#[derive(Clone, Copy, Debug)]
pub struct PipeSpec {
    pub width: u32,
    pub height: u32,
    /// Position de départ en secondes.
    pub start: f64,
    /// Cadence de sortie forcée.
    pub fps: f64,
}

/// Lance `ffmpeg` qui écrit des frames RGBA brutes sur stdout.
///
/// Chaque frame = `width × height × 4` bytes, sans padding. L'audio est
/// ignoré (`-an`).
///
/// # Errors
/// Returns an error if ffmpeg cannot be spawned.
pub fn spawn_rgba_pipe(path: &Path, spec: PipeSpec) -> Result<Child> {
    let scale = format!("scale={}:{}:flags=bilinear", spec.width, spec.height);
    let child = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-ss"])
        .arg(format!("{:.3}", spec.start.max(0.0)))
        .arg("-i")
        .arg(path)
        .args(["-vf", &scale, "-f", "rawvideo", "-pix_fmt", "rgba", "-r"])
        .arg(format!("{:.3}", spec.fps))
        .args(["-an", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("impossible de lancer ffmpeg (installé et dans le PATH ?)")?;
    log::debug!(
        "ffmpeg spawné : {}x{} @ {:.2} fps depuis {:.2}s",
        spec.width,
        spec.height,
        spec.fps,
        spec.start
    );
    Ok(child)
}

/// Tue et récolte un processus ffmpeg. Les échecs sont journalisés.
pub fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        // Déjà terminé : kill échoue, wait récolte quand même.
        log::trace!("kill ffmpeg : {e}");
    }
    if let Err(e) = child.wait() {
        log::warn!("wait ffmpeg : {e}");
    }
}

/// Lit exactement `buf.len()` bytes depuis `reader`.
///
/// `Ok(true)` si la frame est complète, `Ok(false)` sur EOF (frame
/// partielle comprise).
///
/// # Errors
/// Fatal I/O error.
///
/// # Example
/// ```
/// use ac_source::ffmpeg::read_exact_or_eof;
/// let mut data: &[u8] = &[1, 2, 3];
/// let mut buf = [0u8; 2];
/// assert!(read_exact_or_eof(&mut data, &mut buf).unwrap());
/// assert!(!read_exact_or_eof(&mut data, &mut buf).unwrap());
/// ```
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => return Ok(false),
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WITH_AUDIO: &str = "\
codec_type=video
width=1920
height=1080
r_frame_rate=24/1
codec_type=audio
r_frame_rate=0/0
duration=N/A
duration=95.040000
";

    #[test]
    fn audio_stream_is_detected() {
        let info = parse_probe(WITH_AUDIO).unwrap();
        assert!(info.has_audio);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 24.0).abs() < 1e-9);
        assert!((info.duration - 95.04).abs() < 1e-9);
    }

    #[test]
    fn only_first_video_stream_counts() {
        let text = "codec_type=video\nwidth=320\nheight=240\ncodec_type=video\nwidth=64\nheight=64\n";
        let info = parse_probe(text).unwrap();
        assert_eq!((info.width, info.height), (320, 240));
    }

    #[test]
    fn audio_only_file_is_rejected() {
        assert!(parse_probe("codec_type=audio\nduration=3.0\n").is_err());
    }

    #[test]
    fn unreadable_rate_keeps_default() {
        let info = parse_probe("codec_type=video\nwidth=2\nheight=2\nr_frame_rate=0/0\n").unwrap();
        assert!((info.fps - 30.0).abs() < 1e-9);
    }
}
