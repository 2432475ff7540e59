// Presse-papiers système via les outils en ligne de commande courants.
// Aucun n'est obligatoire : le premier qui accepte le texte gagne.

use std::io::Write;
use std::process::{Command, Stdio};

use ac_ascii::export_text;
use ac_core::config::AsciiConfig;
use ac_core::frame::FrameBuffer;
use ac_core::traits::Clipboard;
use anyhow::{Context, Result, bail};

/// Outils essayés dans l'ordre : Wayland, X11 (deux variantes), macOS, Windows.
const TOOLS: [(&str, &[&str]); 5] = [
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip", &[]),
];

/// Presse-papiers de la session, par subprocess.
#[derive(Debug, Default)]
pub struct SystemClipboard {
    /// Dernier outil qui a fonctionné, essayé en premier.
    preferred: Option<usize>,
}

impl SystemClipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn order(&self) -> impl Iterator<Item = usize> + '_ {
        self.preferred
            .into_iter()
            .chain((0..TOOLS.len()).filter(move |i| Some(*i) != self.preferred))
    }
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("{program} introuvable"))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .with_context(|| format!("écriture vers {program}"))?;
    }
    let status = child.wait().with_context(|| format!("attente de {program}"))?;
    if !status.success() {
        bail!("{program} a échoué ({status})");
    }
    Ok(())
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut last_err = None;
        let order: Vec<usize> = self.order().collect();
        for i in order {
            let (program, args) = TOOLS[i];
            match pipe_to(program, args, text) {
                Ok(()) => {
                    log::debug!("presse-papiers : {} octets via {program}", text.len());
                    self.preferred = Some(i);
                    return Ok(());
                }
                Err(e) => {
                    log::trace!("presse-papiers : {e:#}");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| anyhow::anyhow!("aucun outil"))
            .context("aucun outil de presse-papiers disponible"))
    }
}

/// Exporte `frame` en texte et le remet au presse-papiers.
///
/// Ne propage jamais d'erreur : `false` si la grille ne peut pas être
/// construite ou si le presse-papiers refuse l'écriture.
///
/// # Example
/// ```
/// use ac_core::traits::Clipboard;
/// use ac_core::{AsciiConfig, FrameBuffer, Rgb};
/// use ac_export::clipboard::copy_text;
///
/// #[derive(Default)]
/// struct Memory(String);
/// impl Clipboard for Memory {
///     fn write_text(&mut self, text: &str) -> anyhow::Result<()> {
///         self.0 = text.to_string();
///         Ok(())
///     }
/// }
///
/// let config = AsciiConfig { output_width: 3, output_height: 2, ..AsciiConfig::default() };
/// let mut clip = Memory::default();
/// assert!(copy_text(&FrameBuffer::solid(6, 4, Rgb::WHITE), &config, &mut clip));
/// assert_eq!(clip.0, "@@@\n@@@");
/// ```
pub fn copy_text(frame: &FrameBuffer, config: &AsciiConfig, clipboard: &mut impl Clipboard) -> bool {
    let text = match export_text(frame, config) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("export texte impossible : {e}");
            return false;
        }
    };
    match clipboard.write_text(&text) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("copie refusée : {e:#}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::Rgb;
    use anyhow::anyhow;

    struct Fake {
        accept: bool,
        written: Vec<String>,
    }

    impl Clipboard for Fake {
        fn write_text(&mut self, text: &str) -> Result<()> {
            if !self.accept {
                return Err(anyhow!("refusé"));
            }
            self.written.push(text.to_string());
            Ok(())
        }
    }

    fn config() -> AsciiConfig {
        AsciiConfig {
            output_width: 2,
            output_height: 2,
            ..AsciiConfig::default()
        }
    }

    #[test]
    fn copied_text_matches_export() {
        let frame = FrameBuffer::solid(4, 4, Rgb::BLACK);
        let mut clip = Fake {
            accept: true,
            written: Vec::new(),
        };
        assert!(copy_text(&frame, &config(), &mut clip));
        assert_eq!(clip.written, vec![export_text(&frame, &config()).unwrap()]);
    }

    #[test]
    fn rejection_is_reported_as_false() {
        let mut clip = Fake {
            accept: false,
            written: Vec::new(),
        };
        assert!(!copy_text(&FrameBuffer::solid(4, 4, Rgb::WHITE), &config(), &mut clip));
    }

    #[test]
    fn empty_charset_never_reaches_the_clipboard() {
        let mut clip = Fake {
            accept: true,
            written: Vec::new(),
        };
        let config = AsciiConfig {
            chars: String::new(),
            ..config()
        };
        assert!(!copy_text(&FrameBuffer::solid(4, 4, Rgb::WHITE), &config, &mut clip));
        assert!(clip.written.is_empty());
    }

    #[test]
    fn preferred_tool_is_tried_first() {
        let clip = SystemClipboard {
            preferred: Some(3),
        };
        let order: Vec<usize> = clip.order().collect();
        assert_eq!(order, vec![3, 0, 1, 2, 4]);
        assert_eq!(SystemClipboard::new().order().count(), TOOLS.len());
    }
}
