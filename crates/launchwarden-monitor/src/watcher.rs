//! Change watcher for domain directories.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::error::WatchError;

const RAW_CHANNEL_CAPACITY: usize = 256;
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Emitted once per burst of directory changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEvent {
    /// Time of the last change in the burst.
    pub at: DateTime<Utc>,
    /// Distinct paths touched during the burst.
    pub paths: Vec<PathBuf>,
}

type SharedTimestamp = Arc<Mutex<Option<DateTime<Utc>>>>;

/// Watches domain directories (non-recursively) and emits debounced
/// [`WatchEvent`]s.
pub struct ChangeWatcher {
    watcher: Option<RecommendedWatcher>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    events: broadcast::Sender<WatchEvent>,
    last_change: SharedTimestamp,
    watched: Vec<PathBuf>,
}

impl ChangeWatcher {
    /// Start watching every existing directory in `directories`.
    pub fn start(directories: &[PathBuf], debounce: Duration) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = mpsc::channel::<Vec<PathBuf>>(RAW_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let last_change: SharedTimestamp = Arc::new(Mutex::new(None));

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event.kind) => {
                    // Dropping on a full channel is fine; the burst is already pending.
                    let _ = raw_tx.try_send(event.paths);
                }
                Ok(_) => {}
                Err(e) => error!("Directory watcher error: {}", e),
            },
            Config::default(),
        )?;

        let mut watched = Vec::new();
        for dir in directories {
            if !dir.exists() {
                warn!("Watch directory does not exist: {:?}", dir);
                continue;
            }
            match watcher.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    info!("Watching directory: {:?}", dir);
                    watched.push(dir.clone());
                }
                Err(e) => warn!("Failed to watch directory {:?}: {}", dir, e),
            }
        }

        spawn_debouncer(debounce, raw_rx, shutdown_rx, events.clone(), last_change.clone());

        Ok(Self {
            watcher: Some(watcher),
            shutdown_tx: Some(shutdown_tx),
            events,
            last_change,
            watched,
        })
    }

    /// The debounced change stream.
    pub fn watched_directories_changed(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    /// Time of the most recent raw change, debounced or not.
    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        *self.last_change.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Release every watch handle and end the debounce task.
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            info!("Directory watcher stopped ({} directories)", self.watched.len());
        }
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_))
}

/// Trailing debounce: every raw change pushes the deadline out by
/// `debounce`; one event fires when the deadline passes quietly.
pub(crate) fn spawn_debouncer(
    debounce: Duration,
    mut raw_rx: mpsc::Receiver<Vec<PathBuf>>,
    mut shutdown_rx: mpsc::Receiver<()>,
    events: broadcast::Sender<WatchEvent>,
    last_change: SharedTimestamp,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut deadline: Option<Instant> = None;
        let mut pending: BTreeSet<PathBuf> = BTreeSet::new();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Debouncer shutting down");
                    break;
                }
                raw = raw_rx.recv() => {
                    let Some(paths) = raw else {
                        break;
                    };
                    *last_change.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
                    pending.extend(paths);
                    deadline = Some(Instant::now() + debounce);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    let at = (*last_change.lock().unwrap_or_else(|e| e.into_inner())).unwrap_or_else(Utc::now);
                    let event = WatchEvent {
                        at,
                        paths: std::mem::take(&mut pending).into_iter().collect(),
                    };
                    debug!("Directories changed ({} paths)", event.paths.len());
                    // No receivers is fine.
                    let _ = events.send(event);
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
