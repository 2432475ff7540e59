use ac_core::config::AsciiConfig;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::canvas;
use crate::fps::RateMeter;
use crate::target::Presented;

/// Hauteur de la barre d'état.
pub const STATUS_HEIGHT: u16 = 2;

/// Données de la barre d'état, calculées par la boucle d'affichage.
pub struct StatusLine<'a> {
    pub config: &'a AsciiConfig,
    pub visible: bool,
    pub aspect_locked: bool,
    /// Nom du preset de caractères, ou `None` pour un jeu personnalisé.
    pub preset_name: Option<&'a str>,
    /// Message éphémère (copie, export…).
    pub notice: Option<&'a str>,
}

/// Dessine l'UI complète : grille + barre d'état + aide optionnelle.
pub fn draw(
    frame: &mut Frame,
    presented: Option<&Presented>,
    status: &StatusLine<'_>,
    meter: &RateMeter,
    show_help: bool,
) {
    let area = frame.area();
    let [canvas_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(STATUS_HEIGHT)]).areas(area);

    match presented {
        Some(p) => canvas::render_grid(frame.buffer_mut(), canvas_area, &p.grid),
        None => canvas::clear_area(frame.buffer_mut(), canvas_area),
    }

    draw_status(frame, status_area, status, meter);

    if show_help {
        draw_help_overlay(frame, area);
    }
}

/// Surface disponible pour la grille, barre d'état déduite.
#[must_use]
pub fn canvas_size(terminal: Rect) -> (u16, u16) {
    (terminal.width, terminal.height.saturating_sub(STATUS_HEIGHT))
}

fn draw_status(frame: &mut Frame, area: Rect, status: &StatusLine<'_>, meter: &RateMeter) {
    let c = status.config;
    let state = if status.visible {
        Span::styled("▶ ON ", Style::default().fg(Color::Green))
    } else {
        Span::styled("⏸ OFF", Style::default().fg(Color::DarkGray))
    };
    let colour = c.colour.map_or_else(|| "source".to_string(), |rgb| rgb.to_string());
    let chars = status.preset_name.unwrap_or("custom");
    let lock = if status.aspect_locked { "🔒" } else { "🔓" };

    let line = Line::from(vec![
        state,
        Span::raw(format!(
            " │ {}x{} {lock} │ chars: {chars} │ colour: {colour} │ contr {:.2} │ bright {:+.2} │ {:.0} fps",
            c.output_width,
            c.output_height,
            c.contrast,
            c.brightness,
            meter.rate(),
        )),
    ]);
    let mut lines = vec![line];
    if let Some(notice) = status.notice {
        lines.push(Line::from(Span::styled(
            format!(" {notice}"),
            Style::default().fg(Color::Yellow),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            " ? = aide",
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::NONE)),
        area,
    );
}

fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            " asciicam : commandes ",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(" Espace   Afficher / masquer"),
        Line::from(" c        Copier le texte"),
        Line::from(" s        Exporter en PNG"),
        Line::from(" i        Inverser les caractères"),
        Line::from(" p        Preset de caractères suivant"),
        Line::from(" k        Preset de couleur suivant"),
        Line::from(" o        Optimiser pour la copie"),
        Line::from(" l        Verrouiller le ratio"),
        Line::from(" ←/→      Largeur ∓"),
        Line::from(" ↑/↓      Hauteur ±"),
        Line::from(" +/-      Contraste ±"),
        Line::from(" ]/[      Luminosité ±"),
        Line::from(" a        Animation on/off"),
        Line::from(" ?        Aide"),
        Line::from(" q/Échap  Quitter"),
    ];

    let help_width = 40u16;
    let help_height = help_text.len() as u16 + 2;
    let x = area.x + area.width.saturating_sub(help_width) / 2;
    let y = area.y + area.height.saturating_sub(help_height) / 2;
    let help_area = Rect::new(x, y, help_width.min(area.width), help_height.min(area.height));

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Aide ")
            .style(Style::default().bg(Color::Black).fg(Color::White)),
    );

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}
