use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::RecommendedWatcher;
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind, Debouncer};

const DEBOUNCE: Duration = Duration::from_millis(200);
const MAX_RETRIES: u32 = 3;

type WatchEvents = Result<Vec<DebouncedEvent>, notify::Error>;

/// Live reload for the displayed file.
///
/// A dropped or failing watcher is recreated up to three times before
/// watching is switched off.
pub struct FileWatcher {
    path: Option<PathBuf>,
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    rx: Option<Receiver<WatchEvents>>,
    enabled: bool,
    retries: u32,
}

impl FileWatcher {
    pub fn new(enabled: bool) -> Self {
        Self {
            path: None,
            debouncer: None,
            rx: None,
            enabled,
            retries: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_active(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Point the watcher at a newly displayed file.
    pub fn follow(&mut self, path: &Path) {
        if self.path.as_deref() == Some(path) && self.is_active() {
            return;
        }
        self.path = Some(path.to_path_buf());
        if self.enabled {
            self.retries = 0;
            self.start();
        }
    }

    /// Stop watching without turning live reload off, e.g. while an error page is shown.
    pub fn unfollow(&mut self) {
        self.path = None;
        self.stop();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.retries = 0;
            self.start();
        } else {
            self.stop();
        }
    }

    fn start(&mut self) {
        self.stop();

        let Some(path) = &self.path else {
            log::warn!("Cannot start watching: no file loaded");
            return;
        };

        let (tx, rx) = mpsc::channel();
        let mut debouncer = match new_debouncer(DEBOUNCE, tx) {
            Ok(debouncer) => debouncer,
            Err(e) => {
                log::error!("Failed to create file watcher: {}", e);
                return;
            }
        };
        if let Err(e) = debouncer.watcher().watch(path, notify::RecursiveMode::NonRecursive) {
            log::error!("Failed to watch file {:?}: {}", path, e);
            return;
        }

        log::info!("Started watching file: {:?}", path);
        self.debouncer = Some(debouncer);
        self.rx = Some(rx);
    }

    fn stop(&mut self) {
        if self.debouncer.take().is_some() {
            log::info!("Stopped watching file");
        }
        self.rx = None;
    }

    fn retry(&mut self) {
        if self.retries >= MAX_RETRIES {
            log::error!("File watcher failed after {} retries, disabling", MAX_RETRIES);
            self.enabled = false;
            return;
        }
        self.retries += 1;
        log::info!("Attempting watcher recovery (attempt {})", self.retries);
        self.start();
    }

    /// Non-blocking. Returns the watched path when it changed since the last call.
    pub fn poll(&mut self) -> Option<PathBuf> {
        if !self.enabled || self.path.is_none() {
            return None;
        }
        let Some(rx) = &self.rx else {
            self.retry();
            return None;
        };

        let mut changed = false;
        let mut failed = false;
        while let Ok(result) = rx.try_recv() {
            match result {
                Ok(events) => {
                    self.retries = 0;
                    for event in events {
                        if event.kind == DebouncedEventKind::Any {
                            log::debug!("File change detected: {:?}", event.path);
                            changed = true;
                        }
                    }
                }
                Err(e) => {
                    log::error!("File watcher error: {}", e);
                    failed = true;
                    break;
                }
            }
        }

        if failed {
            self.stop();
            self.retry();
            return None;
        }
        changed.then(|| self.path.clone()).flatten()
    }
}
