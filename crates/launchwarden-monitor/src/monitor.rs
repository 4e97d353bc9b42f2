//! Monitor: wires the registry, control bridge, elevator, actor and
//! directory watcher together.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use launchwarden_config::Config;
use launchwarden_core::{DomainRegistry, ServiceDomain};
use launchwarden_launchctl::{ControlBridge, Elevator, OsascriptElevator, SystemRunner};

use crate::actor::{MonitorActor, MonitorOptions};
use crate::error::WatchError;
use crate::handle::MonitorHandle;
use crate::pass::PassContext;
use crate::watcher::{ChangeWatcher, WatchEvent};

/// A running monitor: the actor plus an optional directory watcher feeding it.
pub struct Monitor {
    handle: MonitorHandle,
    directories: Vec<PathBuf>,
    watcher: Option<ChangeWatcher>,
    forwarder: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Build a monitor for the current user from configuration.
    pub fn from_config(config: &Config) -> Result<Self, WatchError> {
        let registry = registry_from_config(config);

        let launchctl = config.launchctl.path.to_string_lossy().into_owned();
        let osascript = config.launchctl.osascript_path.to_string_lossy().into_owned();

        let bridge = ControlBridge::new(
            Arc::new(SystemRunner::with_timeout(config.launchctl.command_timeout())),
            launchctl.clone(),
        );
        // The authorization prompt waits on the user, so no timeout here.
        let elevator = OsascriptElevator::new(Arc::new(SystemRunner::new())).with_paths(osascript, launchctl);

        let ctx = PassContext::new(registry, bridge, config.monitor.show_system_services);
        let options = MonitorOptions {
            settle_delay: config.monitor.settle_delay(),
        };

        let mut monitor = Self::with_parts(ctx, Arc::new(elevator), options);
        if config.monitor.watch {
            monitor.watch(config.monitor.debounce())?;
        }
        Ok(monitor)
    }

    /// Start the actor from explicit parts, without a watcher.
    pub fn with_parts(ctx: PassContext, elevator: Arc<dyn Elevator>, options: MonitorOptions) -> Self {
        let directories = ctx
            .active_domains()
            .iter()
            .map(|d| ctx.registry.directory(*d).to_path_buf())
            .collect();
        let handle = MonitorActor::spawn(ctx, elevator, options);
        Self {
            handle,
            directories,
            watcher: None,
            forwarder: None,
        }
    }

    /// Watch the active domain directories; each debounced change queues a
    /// refresh.
    pub fn watch(&mut self, debounce: Duration) -> Result<(), WatchError> {
        if self.watcher.is_some() {
            return Ok(());
        }

        let watcher = ChangeWatcher::start(&self.directories, debounce)?;
        let mut events = watcher.watched_directories_changed();
        let handle = self.handle.clone();

        self.forwarder = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!("Refreshing after change to {} paths", event.paths.len());
                        handle.notify_changed();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Skipped {} change events", skipped);
                        handle.notify_changed();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
        self.watcher = Some(watcher);
        Ok(())
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Debounced directory change events, when watching.
    pub fn watched_directories_changed(&self) -> Option<broadcast::Receiver<WatchEvent>> {
        self.watcher.as_ref().map(ChangeWatcher::watched_directories_changed)
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(ChangeWatcher::is_running)
    }

    /// Stop watching, then stop the actor.
    pub async fn shutdown(mut self) {
        self.stop_watching();
        self.handle.shutdown().await;
        info!("Monitor shut down");
    }

    fn stop_watching(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        if let Some(task) = self.forwarder.take() {
            task.abort();
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop_watching();
    }
}

/// The registry for the current user with `[domains]` overrides applied.
pub fn registry_from_config(config: &Config) -> DomainRegistry {
    config
        .domains
        .overrides()
        .fold(DomainRegistry::system(), |registry, (name, dir)| match name.parse::<ServiceDomain>() {
            Ok(domain) => registry.with_directory(domain, dir.clone()),
            Err(e) => {
                warn!("Ignoring domain override: {}", e);
                registry
            }
        })
}
