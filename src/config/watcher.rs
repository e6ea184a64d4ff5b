//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself, since many
//! editors save by replacing the file. Events that leave the file content
//! unchanged do not produce an update.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::RouterConfig;

/// Re-reads the configuration file and reports content changes.
#[derive(Debug)]
pub struct ConfigReloader {
    path: PathBuf,
    digest: Option<[u8; 32]>,
}

impl ConfigReloader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            digest: None,
        }
    }

    /// Load the file if its content changed since the last call.
    ///
    /// `None` means nothing changed. A file that fails to load is remembered,
    /// so the same broken content is reported once.
    pub fn poll(&mut self) -> Option<Result<RouterConfig, ConfigError>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => return Some(Err(ConfigError::Io(e))),
        };

        let digest: [u8; 32] = Sha256::digest(content.as_bytes()).into();
        if self.digest == Some(digest) {
            return None;
        }
        self.digest = Some(digest);
        Some(parse_config(&content))
    }
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RouterConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RouterConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name: Option<OsString> = self.path.file_name().map(OsString::from);
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // The running configuration was loaded from this content already.
        let mut reloader = ConfigReloader::new(&self.path);
        let _ = reloader.poll();
        let reloader = Mutex::new(reloader);
        let tx = self.update_tx;

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
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(OsString::from) == file_name);
                if !touches_config {
                    return;
                }

                let mut reloader = reloader
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                match reloader.poll() {
                    None => {}
                    Some(Ok(config)) => {
                        tracing::info!("Config file changed, reloading");
                        if tx.send(config).is_err() {
                            tracing::debug!("Config update receiver closed");
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
