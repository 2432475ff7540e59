// Lecture vidéo temps réel pour l'affichage live.
//
// Un thread dédié lit les frames RGBA du pipe ffmpeg au rythme de la vidéo,
// reboucle en fin de fichier, et publie chaque frame sur un canal flume.
// Côté consommateur, `Playback` ne garde que la plus récente : le driver
// rend toujours la dernière frame disponible, quitte à en sauter.

use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ac_core::frame::FrameBuffer;
use ac_core::traits::FrameSource;
use anyhow::{Context, Result};
use flume::{Receiver, Sender, TryRecvError, TrySendError};

use crate::ffmpeg::{PipeSpec, VideoInfo, kill_child, probe_video, read_exact_or_eof, spawn_rgba_pipe};
use crate::resize::fit_within;

/// Taille du pool de frames ; doit dépasser la capacité du canal.
const POOL_SIZE: usize = 4;
/// Capacité du canal de frames.
const CHANNEL_CAP: usize = 2;

/// Commandes du thread de lecture.
///
/// # Example
/// ```
/// use ac_source::playback::PlaybackCommand;
/// assert_ne!(PlaybackCommand::Play, PlaybackCommand::Pause);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    /// Arrêt propre du thread.
    Quit,
}

/// Vidéo en lecture continue, exposée comme [`FrameSource`].
///
/// Le snapshot reste `None` tant que la première frame n'est pas décodée.
pub struct Playback {
    cmd_tx: Sender<PlaybackCommand>,
    frame_rx: Receiver<Arc<FrameBuffer>>,
    latest: Option<Arc<FrameBuffer>>,
    handle: Option<thread::JoinHandle<()>>,
    size: (u32, u32),
    paused: bool,
}

impl Playback {
    /// Probe puis lance le thread de lecture. Le plus grand côté des
    /// frames est limité à `max_side`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be probed or the thread cannot start.
    pub fn spawn(path: &Path, max_side: u32) -> Result<Self> {
        let info = probe_video(path)?;
        let size = fit_within(info.width, info.height, max_side);
        let (frame_tx, frame_rx) = flume::bounded(CHANNEL_CAP);
        let (cmd_tx, cmd_rx) = flume::unbounded();
        let path = path.to_path_buf();

        let handle = thread::Builder::new()
            .name("ac-playback".to_string())
            .spawn(move || {
                PlaybackLoop::new(path, info, size).run(&frame_tx, &cmd_rx);
            })
            .context("impossible de lancer le thread de lecture")?;

        Ok(Self {
            cmd_tx,
            frame_rx,
            latest: None,
            handle: Some(handle),
            size,
            paused: false,
        })
    }

    /// Dimensions des frames publiées.
    #[must_use]
    pub fn frame_size(&self) -> (u32, u32) {
        self.size
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn play(&mut self) {
        self.paused = false;
        self.send(PlaybackCommand::Play);
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.send(PlaybackCommand::Pause);
    }

    fn send(&self, cmd: PlaybackCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            log::warn!("thread de lecture arrêté, commande {cmd:?} perdue");
        }
    }
}

impl FrameSource for Playback {
    fn snapshot(&mut self) -> Option<&FrameBuffer> {
        while let Ok(frame) = self.frame_rx.try_recv() {
            self.latest = Some(frame);
        }
        self.latest.as_deref()
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PlaybackCommand::Quit);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("thread de lecture terminé en panique");
        }
    }
}

/// État du thread de lecture.
struct PlaybackLoop {
    path: PathBuf,
    spec: PipeSpec,
    period: Duration,
    paused: bool,
    child: Option<Child>,
    pool: Vec<Arc<FrameBuffer>>,
}

impl PlaybackLoop {
    fn new(path: PathBuf, info: VideoInfo, (width, height): (u32, u32)) -> Self {
        let fps = info.fps.clamp(1.0, 120.0);
        Self {
            path,
            spec: PipeSpec {
                width,
                height,
                start: 0.0,
                fps,
            },
            period: Duration::from_secs_f64(1.0 / fps),
            paused: false,
            child: None,
            pool: (0..POOL_SIZE)
                .map(|_| Arc::new(FrameBuffer::new(width, height)))
                .collect(),
        }
    }

    /// `true` si le thread doit s'arrêter.
    fn process_commands(&mut self, cmd_rx: &Receiver<PlaybackCommand>) -> bool {
        loop {
            match cmd_rx.try_recv() {
                Ok(PlaybackCommand::Play) => self.paused = false,
                Ok(PlaybackCommand::Pause) => self.paused = true,
                Ok(PlaybackCommand::Quit) | Err(TryRecvError::Disconnected) => return true,
                Err(TryRecvError::Empty) => return false,
            }
        }
    }

    fn restart(&mut self) {
        self.stop();
        match spawn_rgba_pipe(&self.path, self.spec) {
            Ok(child) => self.child = Some(child),
            Err(e) => log::warn!("lecture : {e:#}"),
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            kill_child(&mut child);
        }
    }

    fn run(mut self, frame_tx: &Sender<Arc<FrameBuffer>>, cmd_rx: &Receiver<PlaybackCommand>) {
        let mut next_due = Instant::now();
        self.restart();

        loop {
            if self.process_commands(cmd_rx) {
                break;
            }
            if self.paused {
                thread::sleep(Duration::from_millis(10));
                next_due = Instant::now();
                continue;
            }
            if self.child.is_none() {
                // ffmpeg introuvable : pas de busy loop.
                thread::sleep(Duration::from_millis(250));
                self.restart();
                continue;
            }

            let now = Instant::now();
            if now < next_due {
                thread::sleep((next_due - now).min(Duration::from_millis(10)));
                continue;
            }
            next_due += self.period;
            if next_due < now {
                next_due = now + self.period;
            }

            let idx = find_or_create_slot(&mut self.pool, self.spec.width, self.spec.height);
            let Some(fb) = Arc::get_mut(&mut self.pool[idx]) else {
                continue;
            };
            let read = self
                .child
                .as_mut()
                .and_then(|c| c.stdout.as_mut())
                .map_or(Ok(false), |stdout| read_exact_or_eof(stdout, &mut fb.data));

            match read {
                Ok(true) => match frame_tx.try_send(Arc::clone(&self.pool[idx])) {
                    // Consommateur en retard : la frame est sautée.
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                },
                Ok(false) => {
                    log::debug!("lecture : fin de fichier, reprise au début");
                    self.restart();
                }
                Err(e) => {
                    log::warn!("lecture : erreur pipe : {e:#}");
                    self.stop();
                }
            }
        }

        self.stop();
        log::debug!("thread de lecture terminé");
    }
}

/// Index d'un slot libre du pool (`strong_count == 1`), alloué au besoin.
fn find_or_create_slot(pool: &mut Vec<Arc<FrameBuffer>>, width: u32, height: u32) -> usize {
    if let Some(i) = pool.iter().position(|a| Arc::strong_count(a) == 1) {
        return i;
    }
    pool.push(Arc::new(FrameBuffer::new(width, height)));
    pool.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_slots_are_reused() {
        let mut pool: Vec<Arc<FrameBuffer>> = (0..2).map(|_| Arc::new(FrameBuffer::new(2, 2))).collect();
        let held = Arc::clone(&pool[0]);
        assert_eq!(find_or_create_slot(&mut pool, 2, 2), 1);
        drop(held);
        assert_eq!(find_or_create_slot(&mut pool, 2, 2), 0);
    }

    #[test]
    fn saturated_pool_grows() {
        let mut pool = vec![Arc::new(FrameBuffer::new(1, 1))];
        let _held = Arc::clone(&pool[0]);
        assert_eq!(find_or_create_slot(&mut pool, 1, 1), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn quit_and_disconnect_stop_the_loop() {
        let info = VideoInfo {
            width: 4,
            height: 4,
            fps: 30.0,
            duration: 1.0,
            has_audio: false,
        };
        let mut lp = PlaybackLoop::new(PathBuf::from("x.mp4"), info, (4, 4));
        let (tx, rx) = flume::unbounded();
        tx.send(PlaybackCommand::Pause).unwrap();
        assert!(!lp.process_commands(&rx));
        assert!(lp.paused);
        tx.send(PlaybackCommand::Quit).unwrap();
        assert!(lp.process_commands(&rx));
        drop(tx);
        assert!(lp.process_commands(&rx));
    }

    #[test]
    fn snapshot_keeps_only_the_latest_frame() {
        let (frame_tx, frame_rx) = flume::bounded(4);
        let (cmd_tx, _cmd_rx) = flume::unbounded();
        let mut playback = Playback {
            cmd_tx,
            frame_rx,
            latest: None,
            handle: None,
            size: (1, 1),
            paused: false,
        };
        assert!(playback.snapshot().is_none());
        for w in 1..=3 {
            frame_tx.send(Arc::new(FrameBuffer::new(w, 1))).unwrap();
        }
        assert_eq!(playback.snapshot().map(|f| f.width), Some(3));
        // Rien de neuf : la dernière frame reste servie.
        assert_eq!(playback.snapshot().map(|f| f.width), Some(3));
    }
}
