//! Configuration file watcher for hot reload.
//!
//! Editors often replace a file instead of writing it in place, which drops
//! a watch on the file itself. The watcher therefore watches the parent
//! directory and filters events down to the configuration file.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

/// Watches one configuration file and publishes validated reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Dropping the returned handle stops the watch.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let ConfigWatcher { path, update_tx } = self;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|n| n.to_os_string());

        // Unchanged content (touch, metadata-only writes) is not a reload.
        let last_content = Mutex::new(std::fs::read_to_string(&path).ok());
        let target = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };

                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let concerns_target = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !concerns_target {
                    return;
                }

                let content = std::fs::read_to_string(&target).ok();
                {
                    let mut last = last_content.lock().expect("config watcher mutex poisoned");
                    if content.is_some() && *last == content {
                        return;
                    }
                    *last = content;
                }

                match load_config(&target) {
                    Ok(config) => {
                        tracing::info!(path = ?target, "Configuration reloaded");
                        let _ = update_tx.send(config);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected configuration change; keeping current configuration");
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
