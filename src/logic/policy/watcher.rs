//! Config file watcher
//!
//! Watches the policy and rules files and calls back on change. Parent
//! directories are watched so editors that replace files atomically still
//! trigger a reload.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::ConfigError;

/// Keeps the underlying watcher alive; dropping it stops watching.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    files: Vec<PathBuf>,
}

impl ConfigWatcher {
    pub fn watch<F>(files: Vec<PathBuf>, on_change: F) -> Result<Self, ConfigError>
    where
        F: Fn(&Path) + Send + 'static,
    {
        let targets: Vec<PathBuf> = files.iter().map(|f| absolute(f)).collect();
        let wanted = targets.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let touched: BTreeSet<&PathBuf> = event
                    .paths
                    .iter()
                    .filter_map(|p| wanted.iter().find(|w| same_file(w, p)))
                    .collect();
                for path in touched {
                    tracing::debug!(path = %path.display(), "Config file changed");
                    on_change(path);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Config watch error"),
        })?;

        let dirs: BTreeSet<PathBuf> = targets
            .iter()
            .map(|f| f.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")))
            .collect();
        for dir in &dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(files = targets.len(), "Watching config files");
        Ok(Self {
            _watcher: watcher,
            files: targets,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Absolute form of a configured path, with `.` components dropped
pub fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

pub fn same_file(wanted: &Path, event_path: &Path) -> bool {
    if wanted == event_path {
        return true;
    }
    // event paths may be canonicalized (e.g. /private/var on macOS)
    match (wanted.file_name(), event_path.file_name()) {
        (Some(a), Some(b)) if a == b => {
            let canon = |p: &Path| p.parent().and_then(|d| d.canonicalize().ok());
            canon(wanted).is_some() && canon(wanted) == canon(event_path)
        }
        _ => false,
    }
}
