use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ac_core::charset::{CHAR_PRESETS, COLOUR_PRESETS, invert_charset, preset_index};
use ac_core::clock::FrameTicker;
use ac_core::config::AsciiConfig;
use ac_core::dimensions::{AspectLock, ideal_dimensions};
use ac_core::frame::FrameBuffer;
use ac_core::traits::FrameSource;
use ac_export::clipboard::{SystemClipboard, copy_text};
use ac_export::png::{export_png, timestamped_name};
use ac_render::fps::RateMeter;
use ac_render::target::TerminalTarget;
use ac_render::ui::{self, StatusLine};
use ac_render::{AnimationDriver, Renderer};
use ac_source::image::ImageSource;
use ac_source::playback::Playback;
use anyhow::Result;
use arc_swap::ArcSwap;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;

/// Attente maximale sans événement ni rappel planifié.
const IDLE_POLL: Duration = Duration::from_millis(100);
/// Durée d'affichage d'un message de la barre d'état.
const NOTICE_TTL: Duration = Duration::from_secs(3);

const DIM_STEP: u16 = 2;
const CONTRAST_STEP: f32 = 0.1;
const BRIGHTNESS_STEP: f32 = 0.05;

/// Source du viewer : image fixe ou vidéo en lecture continue.
pub enum Visual {
    Image(ImageSource),
    Video(Playback),
}

impl Visual {
    /// Choisit la source d'après l'extension du fichier.
    ///
    /// # Errors
    /// Decoding or probing failure.
    pub fn open(path: &Path, max_side: u32) -> Result<Self> {
        if is_image(path) {
            Ok(Self::Image(ImageSource::open(path, Some(max_side))?))
        } else {
            Ok(Self::Video(Playback::spawn(path, max_side)?))
        }
    }

    /// La vidéo ne décode que lorsque le driver affiche.
    fn set_running(&mut self, running: bool) {
        if let Self::Video(playback) = self {
            if running {
                playback.play();
            } else {
                playback.pause();
            }
        }
    }
}

impl FrameSource for Visual {
    fn snapshot(&mut self) -> Option<&FrameBuffer> {
        match self {
            Self::Image(image) => image.snapshot(),
            Self::Video(playback) => playback.snapshot(),
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "gif"))
}

/// Applique une touche d'édition à la config. `None` si la touche
/// n'en modifie pas.
fn edit_config(code: KeyCode, config: &AsciiConfig, lock: &mut AspectLock) -> Option<AsciiConfig> {
    let mut next = config.clone();
    match code {
        KeyCode::Char('i') => next.chars = invert_charset(&config.chars),
        KeyCode::Char('p') => {
            let i = preset_index(&config.chars).map_or(0, |i| (i + 1) % CHAR_PRESETS.len());
            next.chars = CHAR_PRESETS[i].to_string();
        }
        KeyCode::Char('k') => {
            // Presets, puis couleur échantillonnée, puis retour au premier.
            next.colour = match config.colour {
                None => Some(COLOUR_PRESETS[0]),
                Some(c) => COLOUR_PRESETS
                    .iter()
                    .position(|p| *p == c)
                    .and_then(|i| COLOUR_PRESETS.get(i + 1))
                    .copied(),
            };
        }
        KeyCode::Char('o') => {
            let (w, h) = ideal_dimensions(config.output_width, config.output_height);
            lock.set_ratio(f64::from(w) / f64::from(h));
            (next.output_width, next.output_height) = (w, h);
        }
        KeyCode::Left | KeyCode::Right => {
            let w = if code == KeyCode::Left {
                config.output_width.saturating_sub(DIM_STEP)
            } else {
                config.output_width.saturating_add(DIM_STEP)
            };
            (next.output_width, next.output_height) = lock.set_width(w, config.output_height);
        }
        KeyCode::Up | KeyCode::Down => {
            let h = if code == KeyCode::Down {
                config.output_height.saturating_sub(DIM_STEP)
            } else {
                config.output_height.saturating_add(DIM_STEP)
            };
            (next.output_width, next.output_height) = lock.set_height(h, config.output_width);
        }
        KeyCode::Char('+' | '=') => next.contrast += CONTRAST_STEP,
        KeyCode::Char('-') => next.contrast -= CONTRAST_STEP,
        KeyCode::Char(']') => next.brightness += BRIGHTNESS_STEP,
        KeyCode::Char('[') => next.brightness -= BRIGHTNESS_STEP,
        KeyCode::Char('a') => next.animate = !config.animate,
        _ => return None,
    }
    next.clamp_all();
    (next != *config).then_some(next)
}

/// Affichage live dans le terminal.
pub struct Viewer {
    driver: AnimationDriver<Visual, TerminalTarget, FrameTicker>,
    config: Arc<ArcSwap<AsciiConfig>>,
    /// Dernière config transmise au driver.
    applied: Arc<AsciiConfig>,
    renderer: Renderer,
    clipboard: SystemClipboard,
    lock: AspectLock,
    meter: RateMeter,
    seen_generation: u64,
    show_help: bool,
    quitting: bool,
    notice: Option<(String, Instant)>,
    export_dir: PathBuf,
}

impl Viewer {
    #[must_use]
    pub fn new(visual: Visual, config: Arc<ArcSwap<AsciiConfig>>, renderer: Renderer) -> Self {
        let applied = config.load_full();
        let ticker = FrameTicker::new(applied.target_fps);
        let driver = AnimationDriver::new(visual, TerminalTarget::default(), ticker, (*applied).clone());
        Self {
            driver,
            lock: AspectLock::new(applied.output_width, applied.output_height),
            config,
            applied,
            renderer,
            clipboard: SystemClipboard::new(),
            meter: RateMeter::new(30),
            seen_generation: 0,
            show_help: false,
            quitting: false,
            notice: None,
            export_dir: PathBuf::from("."),
        }
    }

    /// Boucle principale : événements, rappels du ticker, dessin.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        if let Err(e) = self.driver.show() {
            self.set_notice(format!("{e}"));
        }

        while !self.quitting {
            self.sync_config();

            let wait = self
                .driver
                .scheduler()
                .time_until_due(Instant::now())
                .map_or(IDLE_POLL, |d| d.min(IDLE_POLL));
            if event::poll(wait)? {
                self.handle_event(&event::read()?);
                while event::poll(Duration::ZERO)? {
                    self.handle_event(&event::read()?);
                }
            }

            if let Some(handle) = self.driver.scheduler_mut().take_due(Instant::now()) {
                self.driver.on_frame(handle);
            }
            let generation = self.driver.target().generation();
            if generation != self.seen_generation {
                self.seen_generation = generation;
                if self.driver.target().latest().is_some() {
                    self.meter.tick();
                }
            }
            if self
                .notice
                .as_ref()
                .is_some_and(|(_, at)| at.elapsed() > NOTICE_TTL)
            {
                self.notice = None;
            }

            let presented = self.driver.target().latest();
            let status = StatusLine {
                config: &self.applied,
                visible: self.driver.is_active(),
                aspect_locked: self.lock.locked,
                preset_name: preset_index(&self.applied.chars).map(|i| CHAR_PRESETS[i]),
                notice: self.notice.as_ref().map(|(n, _)| n.as_str()),
            };
            let (meter, show_help) = (&self.meter, self.show_help);
            terminal.draw(|frame| ui::draw(frame, presented, &status, meter, show_help))?;
        }

        self.driver.hide();
        Ok(())
    }

    /// Transmet au driver toute config publiée (touche ou rechargement).
    fn sync_config(&mut self) {
        let current = self.config.load_full();
        if Arc::ptr_eq(&current, &self.applied) {
            return;
        }
        self.driver.scheduler_mut().set_fps(current.target_fps);
        match self.driver.set_config((*current).clone()) {
            Ok(()) => {
                if !self.lock.locked {
                    self.lock = AspectLock::new(current.output_width, current.output_height);
                    self.lock.locked = false;
                }
            }
            Err(e) => self.set_notice(format!("config rejetée : {e}")),
        }
        self.applied = current;
    }

    fn publish(&self, config: AsciiConfig) {
        self.config.store(Arc::new(config));
    }

    fn set_notice(&mut self, text: String) {
        log::debug!("{text}");
        self.notice = Some((text, Instant::now()));
    }

    fn handle_event(&mut self, event: &Event) {
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = *event
        else {
            return;
        };

        if self.show_help && matches!(code, KeyCode::Esc | KeyCode::Char('?')) {
            self.show_help = false;
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quitting = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char(' ') => self.toggle_visible(),
            KeyCode::Char('c') => self.copy(),
            KeyCode::Char('s') => self.save_png(),
            KeyCode::Char('l') => {
                self.lock.locked = !self.lock.locked;
                if self.lock.locked {
                    self.lock.set_ratio(
                        f64::from(self.applied.output_width)
                            / f64::from(self.applied.output_height.max(1)),
                    );
                }
            }
            _ => {
                if let Some(next) = edit_config(code, &self.applied, &mut self.lock) {
                    self.publish(next);
                }
            }
        }
    }

    fn toggle_visible(&mut self) {
        if self.driver.is_active() {
            self.driver.hide();
            self.driver.source_mut().set_running(false);
            self.meter.reset();
        } else {
            self.driver.source_mut().set_running(true);
            if let Err(e) = self.driver.show() {
                self.set_notice(format!("{e}"));
            }
        }
    }

    fn copy(&mut self) {
        let Some(frame) = self.driver.source_mut().snapshot() else {
            self.notice = Some(("aucune frame à copier".into(), Instant::now()));
            return;
        };
        let text = if copy_text(frame, &self.applied, &mut self.clipboard) {
            "texte copié"
        } else {
            "copie impossible"
        };
        self.set_notice(text.to_string());
    }

    fn save_png(&mut self) {
        let path = self
            .export_dir
            .join(timestamped_name("png", chrono::Utc::now()));
        let Some(frame) = self.driver.source_mut().snapshot() else {
            self.notice = Some(("aucune frame à exporter".into(), Instant::now()));
            return;
        };
        let text = match export_png(frame, &self.applied, &mut self.renderer, &path) {
            Ok(()) => format!("PNG écrit : {}", path.display()),
            Err(e) => {
                log::warn!("export PNG : {e:#}");
                format!("export PNG impossible : {e}")
            }
        };
        self.set_notice(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_core::Rgb;

    fn lock(config: &AsciiConfig) -> AspectLock {
        AspectLock::new(config.output_width, config.output_height)
    }

    #[test]
    fn extensions_pick_the_source_kind() {
        assert!(is_image(Path::new("a/cat.PNG")));
        assert!(is_image(Path::new("cat.jpeg")));
        assert!(!is_image(Path::new("clip.mp4")));
        assert!(!is_image(Path::new("noext")));
    }

    #[test]
    fn invert_twice_restores_chars() {
        let config = AsciiConfig::default();
        let mut l = lock(&config);
        let once = edit_config(KeyCode::Char('i'), &config, &mut l).unwrap();
        assert_eq!(once.chars, " .:-=+*#%@");
        let twice = edit_config(KeyCode::Char('i'), &once, &mut l).unwrap();
        assert_eq!(twice.chars, config.chars);
    }

    #[test]
    fn char_presets_cycle_and_wrap() {
        let mut config = AsciiConfig::default();
        let mut l = lock(&config);
        for expected in CHAR_PRESETS.iter().skip(1).chain(CHAR_PRESETS.iter().take(1)) {
            config = edit_config(KeyCode::Char('p'), &config, &mut l).unwrap();
            assert_eq!(config.chars, *expected);
        }
        // Jeu personnalisé : retour au premier preset.
        config.chars = "xyz".into();
        let next = edit_config(KeyCode::Char('p'), &config, &mut l).unwrap();
        assert_eq!(next.chars, CHAR_PRESETS[0]);
    }

    #[test]
    fn colour_cycle_passes_through_sampled() {
        let mut config = AsciiConfig {
            colour: Some(COLOUR_PRESETS[3]),
            ..AsciiConfig::default()
        };
        let mut l = lock(&config);
        config = edit_config(KeyCode::Char('k'), &config, &mut l).unwrap();
        assert_eq!(config.colour, None);
        config = edit_config(KeyCode::Char('k'), &config, &mut l).unwrap();
        assert_eq!(config.colour, Some(Rgb::WHITE));
    }

    #[test]
    fn locked_width_drags_height() {
        let config = AsciiConfig {
            output_width: 100,
            output_height: 50,
            ..AsciiConfig::default()
        };
        let mut l = lock(&config);
        let next = edit_config(KeyCode::Right, &config, &mut l).unwrap();
        assert_eq!((next.output_width, next.output_height), (102, 51));
    }

    #[test]
    fn unlocked_height_keeps_width() {
        let config = AsciiConfig {
            output_width: 100,
            output_height: 50,
            ..AsciiConfig::default()
        };
        let mut l = lock(&config);
        l.locked = false;
        let next = edit_config(KeyCode::Down, &config, &mut l).unwrap();
        assert_eq!((next.output_width, next.output_height), (100, 48));
    }

    #[test]
    fn optimise_for_copy_sets_the_lock_ratio() {
        let config = AsciiConfig::default();
        let mut l = lock(&config);
        let next = edit_config(KeyCode::Char('o'), &config, &mut l).unwrap();
        assert_eq!((next.output_width, next.output_height), (137, 55));
        assert!((l.ratio() - 137.0 / 55.0).abs() < 1e-9);
    }

    #[test]
    fn tone_keys_are_clamped() {
        let config = AsciiConfig {
            contrast: 2.0,
            brightness: -1.0,
            ..AsciiConfig::default()
        };
        let mut l = lock(&config);
        assert!(edit_config(KeyCode::Char('+'), &config, &mut l).is_none());
        assert!(edit_config(KeyCode::Char('['), &config, &mut l).is_none());
        let lower = edit_config(KeyCode::Char('-'), &config, &mut l).unwrap();
        assert!((lower.contrast - 1.9).abs() < 1e-6);
    }

    #[test]
    fn unrelated_key_changes_nothing() {
        let config = AsciiConfig::default();
        let mut l = lock(&config);
        assert!(edit_config(KeyCode::Char('z'), &config, &mut l).is_none());
    }

    #[test]
    fn image_visual_serves_its_frame() {
        let mut visual = Visual::Image(ImageSource::from_frame(FrameBuffer::solid(3, 2, Rgb::BLACK)));
        visual.set_running(false);
        assert_eq!(visual.snapshot().map(|f| (f.width, f.height)), Some((3, 2)));
    }
}
