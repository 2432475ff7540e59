use std::path::Path;
use std::sync::Arc;

use ac_core::config::{AsciiConfig, load_config};
use anyhow::Result;
use arc_swap::ArcSwap;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::cli::RenderArgs;

/// Recharge le fichier et ré-applique les surcharges CLI.
///
/// # Errors
/// Unreadable or invalid file; the caller keeps the previous config.
pub fn reload(path: &Path, overrides: &RenderArgs) -> Result<AsciiConfig> {
    let mut config = load_config(path)?;
    overrides.apply(&mut config)?;
    Ok(config)
}

/// Lance un watcher qui recharge le fichier config dans l'ArcSwap.
///
/// La boucle d'affichage détecte le nouvel `Arc` et le transmet au driver.
/// Retourne le Watcher (doit rester vivant tant que l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
pub fn spawn_config_watcher(
    config_path: &Path,
    overrides: RenderArgs,
    config: &Arc<ArcSwap<AsciiConfig>>,
) -> Result<impl Watcher + use<>> {
    let config = Arc::clone(config);
    let path = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        {
            match reload(&path, &overrides) {
                Ok(new_config) => {
                    if **config.load() != new_config {
                        config.store(Arc::new(new_config));
                        log::info!("Config rechargée depuis {}", path.display());
                    }
                }
                Err(e) => {
                    // On garde l'ancienne config.
                    log::warn!("Erreur de rechargement config : {e:#}");
                }
            }
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "[render]\noutput_width = 20\ncontrast = 1.5\n").unwrap();
        let overrides = RenderArgs {
            width: Some(64),
            ..RenderArgs::default()
        };
        let config = reload(&path, &overrides).unwrap();
        assert_eq!(config.output_width, 64);
        assert!((config.contrast - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn broken_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(&path, "[render\n").unwrap();
        assert!(reload(&path, &RenderArgs::default()).is_err());
    }
}
