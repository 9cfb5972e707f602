//! Filesystem watch on the active agent config
//!
//! The notify callback runs on the watcher's own thread; it only forwards a
//! unit event into a tokio channel that the supervisor drains.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Signals that the watched file may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigChanged;

/// Keeps the underlying watcher alive. Dropping it stops notifications.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Watch the directory holding `path` and report create/modify events
    /// that touch the file itself.
    pub fn spawn(path: &Path) -> notify::Result<(Self, mpsc::UnboundedReceiver<ConfigChanged>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let file_name: Option<OsString> = path.file_name().map(|n| n.to_os_string());
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        return;
                    }
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_file {
                        debug!("Config event: {:?}", event.kind);
                        let _ = tx.send(ConfigChanged);
                    }
                }
                Err(e) => warn!("Config watch error: {}", e),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!("Watching {} for agent changes", path.display());

        Ok((Self { _watcher: watcher }, rx))
    }
}
