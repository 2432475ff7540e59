use std::path::{Path, PathBuf};

use ac_core::charset::{CHAR_PRESETS, COLOUR_PRESETS};
use ac_core::config::AsciiConfig;
use ac_core::Rgb;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

/// asciicam : conversion image/vidéo → ASCII, en direct ou hors ligne.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Affichage live dans le terminal (image ou vidéo).
    Show {
        /// Image (PNG, JPEG, BMP, GIF) ou vidéo.
        input: PathBuf,
        /// Plus grand côté des frames décodées, en pixels.
        #[arg(long, default_value_t = 640)]
        max_side: u32,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Export texte d'une image, sur stdout ou dans le presse-papiers.
    Text {
        input: PathBuf,
        /// Copier au lieu d'imprimer.
        #[arg(long)]
        copy: bool,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Rendu ASCII d'une image en PNG, à la taille de l'image.
    Png {
        input: PathBuf,
        /// Défaut : ascii-<horodatage>.png
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Transcode une vidéo entière en clip ASCII (mp4, sinon webm), audio compris.
    Transcode {
        input: PathBuf,
        /// Défaut : ascii-<horodatage>.<mp4|webm>
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// N'écoute pas la piste audio pendant le transcodage.
        #[arg(long)]
        mute: bool,
        #[command(flatten)]
        render: RenderArgs,
    },
}

impl Command {
    #[must_use]
    pub fn render_args(&self) -> &RenderArgs {
        match self {
            Self::Show { render, .. }
            | Self::Text { render, .. }
            | Self::Png { render, .. }
            | Self::Transcode { render, .. } => render,
        }
    }
}

/// Surcharges de rendu, appliquées par-dessus le fichier de config.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Largeur de la grille en cellules [1, 300].
    #[arg(short = 'W', long)]
    pub width: Option<u16>,

    /// Hauteur de la grille en cellules [1, 300].
    #[arg(short = 'H', long)]
    pub height: Option<u16>,

    /// Jeu de caractères, du plus lumineux au plus sombre.
    #[arg(long, conflicts_with = "preset")]
    pub chars: Option<String>,

    /// Index d'un preset de caractères (0-4).
    #[arg(long)]
    pub preset: Option<usize>,

    /// Couleur forcée (#RRGGBB) ou index de preset (0-3).
    #[arg(long, conflicts_with = "no_colour")]
    pub colour: Option<String>,

    /// Couleurs échantillonnées dans la source.
    #[arg(long)]
    pub no_colour: bool,

    #[arg(long, allow_hyphen_values = true)]
    pub contrast: Option<f32>,

    #[arg(long, allow_hyphen_values = true)]
    pub brightness: Option<f32>,

    /// Famille de police de la config.
    #[arg(long)]
    pub font: Option<String>,

    /// Fichier TTF/OTF enregistré sous la famille courante.
    #[arg(long)]
    pub font_file: Option<PathBuf>,

    #[arg(long)]
    pub font_size: Option<u32>,

    /// FPS cible de l'affichage live.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Désactive l'animation (une seule passe).
    #[arg(long)]
    pub still: bool,
}

impl RenderArgs {
    /// Applique les surcharges puis re-clampe.
    ///
    /// # Errors
    /// Unknown preset index or malformed colour.
    pub fn apply(&self, config: &mut AsciiConfig) -> Result<()> {
        if let Some(v) = self.width {
            config.output_width = v;
        }
        if let Some(v) = self.height {
            config.output_height = v;
        }
        if let Some(i) = self.preset {
            let Some(chars) = CHAR_PRESETS.get(i) else {
                bail!("preset {i} inconnu (0-{})", CHAR_PRESETS.len() - 1);
            };
            config.chars = (*chars).to_string();
        }
        if let Some(v) = &self.chars {
            config.chars.clone_from(v);
        }
        if let Some(v) = &self.colour {
            config.colour = Some(parse_colour(v)?);
        }
        if self.no_colour {
            config.colour = None;
        }
        if let Some(v) = self.contrast {
            config.contrast = v;
        }
        if let Some(v) = self.brightness {
            config.brightness = v;
        }
        if let Some(v) = &self.font {
            config.font_family.clone_from(v);
        }
        if let Some(v) = self.font_size {
            config.font_size = v;
        }
        if let Some(v) = self.fps {
            config.target_fps = v;
        }
        if self.still {
            config.animate = false;
        }
        config.clamp_all();
        Ok(())
    }
}

/// `#RRGGBB`, `#RGB` ou index de preset.
fn parse_colour(value: &str) -> Result<Rgb> {
    if let Ok(i) = value.parse::<usize>() {
        return COLOUR_PRESETS
            .get(i)
            .copied()
            .with_context(|| format!("preset de couleur {i} inconnu (0-{})", COLOUR_PRESETS.len() - 1));
    }
    value
        .parse::<Rgb>()
        .with_context(|| format!("couleur invalide : {value}"))
}

/// Config du fichier si présent, défauts sinon, puis surcharges CLI.
///
/// # Errors
/// Invalid config file or CLI override.
pub fn resolve_config(path: &Path, render: &RenderArgs) -> Result<AsciiConfig> {
    let mut config = if path.exists() {
        ac_core::config::load_config(path)?
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            path.display()
        );
        AsciiConfig::default()
    };
    render.apply(&mut config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("asciicam").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn overrides_are_clamped() {
        let cli = parse(&["show", "cat.png", "-W", "900", "--contrast", "5"]);
        let mut config = AsciiConfig::default();
        cli.command.render_args().apply(&mut config).unwrap();
        assert_eq!(config.output_width, 300);
        assert!((config.contrast - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn negative_brightness_is_accepted() {
        let cli = parse(&["text", "cat.png", "--brightness", "-0.5"]);
        let mut config = AsciiConfig::default();
        cli.command.render_args().apply(&mut config).unwrap();
        assert!((config.brightness + 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn preset_and_colour_index() {
        let cli = parse(&["png", "cat.png", "--preset", "1", "--colour", "2"]);
        let mut config = AsciiConfig::default();
        cli.command.render_args().apply(&mut config).unwrap();
        assert_eq!(config.chars, "01");
        assert_eq!(config.colour, Some(COLOUR_PRESETS[2]));
    }

    #[test]
    fn no_colour_samples_the_source() {
        let cli = parse(&["transcode", "clip.mp4", "--no-colour", "-o", "out.mp4"]);
        let mut config = AsciiConfig::default();
        cli.command.render_args().apply(&mut config).unwrap();
        assert_eq!(config.colour, None);
    }

    #[test]
    fn transcode_mute_flag() {
        let cli = parse(&["transcode", "clip.mp4", "--mute"]);
        assert!(matches!(cli.command, Command::Transcode { mute: true, .. }));
        let cli = parse(&["transcode", "clip.mp4"]);
        assert!(matches!(cli.command, Command::Transcode { mute: false, .. }));
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let render = RenderArgs {
            preset: Some(42),
            ..RenderArgs::default()
        };
        assert!(render.apply(&mut AsciiConfig::default()).is_err());
    }

    #[test]
    fn bad_colour_is_an_error() {
        assert!(parse_colour("#GG0000").is_err());
        assert_eq!(parse_colour("#fff").unwrap(), Rgb::WHITE);
    }

    #[test]
    fn empty_chars_survive_until_build() {
        let cli = parse(&["text", "cat.png", "--chars", ""]);
        let mut config = AsciiConfig::default();
        cli.command.render_args().apply(&mut config).unwrap();
        assert!(config.chars.is_empty());
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve_config(&dir.path().join("absent.toml"), &RenderArgs::default()).unwrap();
        assert_eq!(config, AsciiConfig::default());
    }

    #[test]
    fn file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "[render]\noutput_width = 40\nchars = \"01\"\n").unwrap();
        let render = RenderArgs {
            height: Some(10),
            ..RenderArgs::default()
        };
        let config = resolve_config(&path, &render).unwrap();
        assert_eq!((config.output_width, config.output_height), (40, 10));
        assert_eq!(config.chars, "01");
    }
}
