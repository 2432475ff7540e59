// Commandes hors ligne : texte, PNG, transcodage vidéo.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;

use ac_ascii::export_text;
use ac_core::config::AsciiConfig;
use ac_core::stream::Blob;
use ac_export::audio::{Monitoring, SourceAudioGraph};
use ac_export::clipboard::{SystemClipboard, copy_text};
use ac_export::muxer::FfmpegRecorder;
use ac_export::png::{export_png, timestamped_name};
use ac_export::transcode::{TranscodeProgress, Transcoder};
use ac_render::Renderer;
use ac_source::image::load_image;
use ac_source::video::FfmpegVideo;
use anyhow::{Context, Result, bail};

/// Imprime l'export texte de l'image, ou le copie.
///
/// # Errors
/// Unreadable image, invalid config, or clipboard refusal with `--copy`.
pub fn run_text(input: &Path, config: &AsciiConfig, copy: bool) -> Result<()> {
    let frame = load_image(input)?;
    if copy {
        if !copy_text(&frame, config, &mut SystemClipboard::new()) {
            bail!("copie dans le presse-papiers impossible");
        }
        eprintln!("Texte copié ({}x{}).", config.output_width, config.output_height);
        return Ok(());
    }
    let text = export_text(&frame, config)?;
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes())?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Rend l'image en ASCII à sa taille d'origine et l'écrit en PNG.
///
/// # Errors
/// Unreadable image, invalid config, or write failure.
pub fn run_png(
    input: &Path,
    output: Option<&Path>,
    config: &AsciiConfig,
    renderer: &mut Renderer,
) -> Result<PathBuf> {
    let frame = load_image(input)?;
    let path = output.map_or_else(
        || PathBuf::from(timestamped_name("png", chrono::Utc::now())),
        Path::to_path_buf,
    );
    export_png(&frame, config, renderer, &path)?;
    eprintln!("PNG écrit : {}", path.display());
    Ok(path)
}

/// Transcode la vidéo et écrit le blob obtenu.
///
/// Le transcodage tourne sur un thread dédié ; ce thread-ci affiche
/// l'avancement. La piste audio est jouée localement sauf en
/// [`Monitoring::Muted`].
///
/// # Errors
/// Any transcoding failure, or the output cannot be written.
pub fn run_transcode(
    input: &Path,
    output: Option<&Path>,
    config: &AsciiConfig,
    renderer: Renderer,
    monitoring: Monitoring,
) -> Result<PathBuf> {
    let mut video = FfmpegVideo::open(input)?;
    let (tx, rx) = flume::unbounded();
    let audio = SourceAudioGraph::with_monitoring(monitoring);
    let mut transcoder =
        Transcoder::new(FfmpegRecorder::new(), audio, renderer).with_progress(tx);

    let blob = thread::scope(|s| {
        let worker = s.spawn(|| {
            let result = transcoder.transcode(&mut video, config);
            // Ferme le canal : la boucle d'affichage se termine.
            drop(transcoder);
            result
        });
        for event in rx.iter() {
            report(&event);
        }
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("thread de transcodage en panique"))
    })??;

    let path = output_path(output, &blob);
    std::fs::write(&path, &blob.data).with_context(|| format!("écriture de {}", path.display()))?;
    eprintln!("\n{} écrit ({} octets).", path.display(), blob.data.len());
    Ok(path)
}

fn output_path(output: Option<&Path>, blob: &Blob) -> PathBuf {
    match output {
        Some(path) => {
            let ext = path.extension().and_then(|e| e.to_str());
            if ext.is_some_and(|e| e != blob.extension()) {
                log::warn!(
                    "{} : conteneur négocié {}, extension conservée",
                    path.display(),
                    blob.mime
                );
            }
            path.to_path_buf()
        }
        None => PathBuf::from(timestamped_name(blob.extension(), chrono::Utc::now())),
    }
}

fn report(event: &TranscodeProgress) {
    match event {
        TranscodeProgress::Started {
            mime,
            width,
            height,
        } => eprintln!("Transcodage {width}x{height} → {mime}"),
        TranscodeProgress::Frame {
            index,
            time,
            duration,
        } => {
            if index % 30 == 0 {
                if *duration > 0.0 {
                    eprint!("\r{:5.1}%  {time:7.2}s / {duration:.2}s", time / duration * 100.0);
                } else {
                    eprint!("\r{time:7.2}s");
                }
            }
        }
        TranscodeProgress::Finished { frames, bytes } => {
            eprint!("\r{frames} frames, {bytes} octets");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::Rgb;
    use ac_core::frame::FrameBuffer;

    fn write_png(dir: &Path) -> PathBuf {
        let path = dir.join("in.png");
        let frame = FrameBuffer::solid(16, 8, Rgb::WHITE);
        image::save_buffer(&path, &frame.data, 16, 8, image::ExtendedColorType::Rgba8).unwrap();
        path
    }

    #[test]
    fn png_goes_to_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path());
        let out = dir.path().join("out.png");
        let mut renderer = Renderer::new().unwrap();
        let written = run_png(&input, Some(&out), &AsciiConfig::default(), &mut renderer).unwrap();
        assert_eq!(written, out);
        assert!(out.exists());
    }

    #[test]
    fn text_rejects_empty_charset() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_png(dir.path());
        let config = AsciiConfig {
            chars: String::new(),
            ..AsciiConfig::default()
        };
        assert!(run_text(&input, &config, false).is_err());
    }

    #[test]
    fn output_name_follows_the_negotiated_container() {
        let blob = Blob::from_chunks("video/webm", vec![vec![0]]);
        let name = output_path(None, &blob);
        let name = name.to_string_lossy();
        assert!(name.starts_with("ascii-") && name.ends_with(".webm"));
        assert_eq!(
            output_path(Some(Path::new("x.mp4")), &blob),
            PathBuf::from("x.mp4")
        );
    }
}
