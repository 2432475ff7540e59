use std::path::Path;
use std::sync::Arc;

use ac_core::config::AsciiConfig;
use ac_export::audio::Monitoring;
use ac_render::{FontBook, Renderer};
use anyhow::Result;
use arc_swap::ArcSwap;
use clap::Parser;

pub mod batch;
pub mod cli;
pub mod hotreload;
pub mod viewer;

use cli::{Command, RenderArgs};

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Config : fichier, puis surcharges CLI
    let render = cli.command.render_args();
    let config = cli::resolve_config(&cli.config, render)?;
    let mut renderer = build_renderer(&config, render)?;

    match &cli.command {
        Command::Text { input, copy, .. } => batch::run_text(input, &config, *copy),
        Command::Png { input, output, .. } => {
            batch::run_png(input, output.as_deref(), &config, &mut renderer).map(|_| ())
        }
        Command::Transcode {
            input,
            output,
            mute,
            ..
        } => {
            let monitoring = if *mute {
                Monitoring::Muted
            } else {
                Monitoring::Speakers
            };
            batch::run_transcode(input, output.as_deref(), &config, renderer, monitoring)
                .map(|_| ())
        }
        Command::Show {
            input, max_side, ..
        } => run_viewer(&cli.config, input, *max_side, render, config, renderer),
    }
}

/// Renderer avec la police embarquée, plus `--font-file` si fourni.
fn build_renderer(config: &AsciiConfig, render: &RenderArgs) -> Result<Renderer> {
    let mut fonts = FontBook::new()?;
    if let Some(path) = &render.font_file {
        fonts.load(&config.font_family, path)?;
    }
    Ok(Renderer::with_fonts(fonts))
}

fn run_viewer(
    config_path: &Path,
    input: &Path,
    max_side: u32,
    render: &RenderArgs,
    config: AsciiConfig,
    renderer: Renderer,
) -> Result<()> {
    let visual = viewer::Visual::open(input, max_side)?;
    let config = Arc::new(ArcSwap::from_pointee(config));

    // Hot-reload : le watcher doit vivre aussi longtemps que la boucle.
    let _watcher = if config_path.exists() {
        Some(hotreload::spawn_config_watcher(
            config_path,
            render.clone(),
            &config,
        )?)
    } else {
        None
    };

    let terminal = ratatui::init();
    let mut app = viewer::Viewer::new(visual, config, renderer);
    let result = app.run(terminal);
    // Restaurer le terminal (TOUJOURS, même en cas d'erreur)
    ratatui::restore();
    result
}
