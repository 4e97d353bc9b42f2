//! The monitor actor: sole owner of the published snapshot, the in-flight
//! command set and the error state.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use launchwarden_core::{ServiceKey, ServiceRecord};
use launchwarden_launchctl::{CommandPlan, Elevator};

use crate::error::{elevation_outcome, CommandError, CommandOutcome};
use crate::handle::MonitorHandle;
use crate::merge::reconcile;
use crate::pass::{run_pass, PassContext};
use crate::snapshot::{PassStage, Snapshot};

const CHANNEL_CAPACITY: usize = 64;

/// A state change requested for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAction {
    Start,
    Stop,
    Enable,
    Disable,
}

impl ServiceAction {
    /// Whether the action loads the service (needs a descriptor file).
    pub fn activates(&self) -> bool {
        matches!(self, ServiceAction::Start | ServiceAction::Enable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) type CommandReply = oneshot::Sender<Result<CommandOutcome, CommandError>>;

/// Messages handled by the actor.
pub(crate) enum MonitorMessage {
    // === Requests ===
    Refresh {
        /// Start from state observed after a change; never join an older pass.
        after_change: bool,
        reply: Option<oneshot::Sender<Arc<Snapshot>>>,
    },
    Execute {
        key: ServiceKey,
        action: ServiceAction,
        reply: CommandReply,
    },
    Blame {
        key: ServiceKey,
        reply: oneshot::Sender<Result<Option<String>, CommandError>>,
    },
    LastError {
        reply: oneshot::Sender<Option<String>>,
    },
    ClearError,
    Stage {
        reply: oneshot::Sender<PassStage>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },

    // === Completions from spawned tasks ===
    /// Descriptors and live status are in; merging has begun.
    PassGathered,
    PassFinished {
        records: Vec<ServiceRecord>,
        control_available: bool,
    },
    CommandFinished {
        key: ServiceKey,
        action: ServiceAction,
        result: Result<CommandOutcome, CommandError>,
        reply: CommandReply,
    },
}

/// Tunables of the actor.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Pause between a command and the refresh it triggers.
    pub settle_delay: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
        }
    }
}

pub(crate) struct MonitorActor {
    rx: mpsc::Receiver<MonitorMessage>,
    self_tx: mpsc::WeakSender<MonitorMessage>,
    ctx: Arc<PassContext>,
    elevator: Arc<dyn Elevator>,
    options: MonitorOptions,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    generation: u64,
    stage: PassStage,
    in_flight: bool,
    waiters: Vec<oneshot::Sender<Arc<Snapshot>>>,
    /// Set when a refresh after a change arrived during a pass.
    follow_up: Option<Vec<oneshot::Sender<Arc<Snapshot>>>>,
    busy: HashSet<ServiceKey>,
    last_error: Option<String>,
}

impl MonitorActor {
    /// Spawn the actor on the current runtime and return its handle.
    pub(crate) fn spawn(ctx: PassContext, elevator: Arc<dyn Elevator>, options: MonitorOptions) -> MonitorHandle {
        let (actor, handle) = Self::new(ctx, elevator, options);
        tokio::spawn(actor.run());
        handle
    }

    fn new(ctx: PassContext, elevator: Arc<dyn Elevator>, options: MonitorOptions) -> (Self, MonitorHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::empty()));

        let actor = MonitorActor {
            rx,
            self_tx: tx.downgrade(),
            ctx: Arc::new(ctx),
            elevator,
            options,
            snapshot_tx,
            generation: 0,
            stage: PassStage::Idle,
            in_flight: false,
            waiters: Vec::new(),
            follow_up: None,
            busy: HashSet::new(),
            last_error: None,
        };
        (actor, MonitorHandle::new(tx, snapshot_rx))
    }

    async fn run(mut self) {
        debug!("Monitor actor started");
        while let Some(msg) = self.rx.recv().await {
            if let MonitorMessage::Shutdown { reply } = msg {
                info!("Monitor actor shutting down");
                let _ = reply.send(());
                break;
            }
            self.handle(msg);
        }
        debug!("Monitor actor stopped");
    }

    fn handle(&mut self, msg: MonitorMessage) {
        match msg {
            MonitorMessage::Refresh { after_change, reply } => self.request_pass(after_change, reply),
            MonitorMessage::Execute { key, action, reply } => self.execute(key, action, reply),
            MonitorMessage::Blame { key, reply } => self.blame(key, reply),
            MonitorMessage::LastError { reply } => {
                let _ = reply.send(self.last_error.clone());
            }
            MonitorMessage::ClearError => self.last_error = None,
            MonitorMessage::Stage { reply } => {
                let _ = reply.send(self.stage);
            }
            MonitorMessage::PassGathered => self.stage = PassStage::Merging,
            MonitorMessage::PassFinished {
                records,
                control_available,
            } => self.publish(records, control_available),
            MonitorMessage::CommandFinished {
                key,
                action,
                result,
                reply,
            } => self.finish_command(key, action, result, reply),
            MonitorMessage::Shutdown { .. } => {}
        }
    }

    // === Reconciliation ===

    fn request_pass(&mut self, after_change: bool, reply: Option<oneshot::Sender<Arc<Snapshot>>>) {
        if !self.in_flight {
            self.waiters.extend(reply);
            self.start_pass();
        } else if after_change {
            debug!("Pass in flight, queueing follow-up");
            self.follow_up.get_or_insert_with(Vec::new).extend(reply);
        } else {
            debug!("Joining in-flight pass");
            self.waiters.extend(reply);
        }
    }

    fn start_pass(&mut self) {
        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };
        self.in_flight = true;
        self.stage = PassStage::Scanning;

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            let data = run_pass(ctx.clone()).await;
            let _ = tx.send(MonitorMessage::PassGathered).await;

            let control_available = data.live.is_available();
            let records = reconcile(data.descriptors, &data.live, &ctx.registry, ctx.include_system);
            let _ = tx
                .send(MonitorMessage::PassFinished {
                    records,
                    control_available,
                })
                .await;
        });
    }

    fn publish(&mut self, records: Vec<ServiceRecord>, control_available: bool) {
        self.generation += 1;
        let snapshot = Arc::new(Snapshot {
            records,
            generation: self.generation,
            refreshed_at: Some(Utc::now()),
            control_available,
        });
        self.snapshot_tx.send_replace(snapshot.clone());
        self.stage = PassStage::Published;
        self.in_flight = false;

        info!(
            "Published snapshot {} ({} services)",
            snapshot.generation,
            snapshot.records.len()
        );
        if !control_available {
            warn!("launchctl unavailable, all states unknown");
        }

        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(snapshot.clone());
        }

        if let Some(next) = self.follow_up.take() {
            self.waiters = next;
            self.start_pass();
        }
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot_tx.borrow().clone()
    }

    // === Commands ===

    fn execute(&mut self, key: ServiceKey, action: ServiceAction, reply: CommandReply) {
        match self.prepare(&key, action) {
            Ok(plan) => self.dispatch(key, action, plan, reply),
            Err(e) => {
                debug!("Rejected {} {}: {}", action, key, e);
                let _ = reply.send(Err(e));
            }
        }
    }

    /// Every check that can fail without running anything.
    fn prepare(&self, key: &ServiceKey, action: ServiceAction) -> Result<CommandPlan, CommandError> {
        if self.ctx.registry.is_read_only(key.domain) {
            return Err(CommandError::ReadOnlyDomain(key.domain));
        }

        let snapshot = self.current();
        let record = snapshot
            .find(key)
            .ok_or_else(|| CommandError::ServiceNotFound(key.clone()))?;

        if self.busy.contains(key) {
            return Err(CommandError::Busy(key.clone()));
        }

        let target = self.ctx.registry.control_target(key.domain);
        let plan = if action.activates() {
            let path = record
                .source_path()
                .ok_or_else(|| CommandError::MissingDescriptor(key.clone()))?;
            CommandPlan::activate(target, &record.label, path)?
        } else {
            CommandPlan::deactivate(target, &record.label)?
        };
        Ok(plan)
    }

    fn dispatch(&mut self, key: ServiceKey, action: ServiceAction, plan: CommandPlan, reply: CommandReply) {
        let Some(tx) = self.self_tx.upgrade() else {
            let _ = reply.send(Err(CommandError::MonitorStopped));
            return;
        };

        let elevated = self.ctx.registry.requires_elevation(key.domain);
        info!(
            "Running {} for {}{}",
            action,
            key,
            if elevated { " (elevated)" } else { "" }
        );
        self.busy.insert(key.clone());

        let ctx = self.ctx.clone();
        let elevator = self.elevator.clone();
        let settle_delay = self.options.settle_delay;

        tokio::spawn(async move {
            let result = if elevated {
                elevation_outcome(elevator.run_elevated(&plan).await)
            } else {
                ctx.bridge
                    .run_plan(&plan)
                    .await
                    .map(|()| CommandOutcome::Completed)
                    .map_err(CommandError::from)
            };

            if result != Ok(CommandOutcome::Cancelled) {
                tokio::time::sleep(settle_delay).await;
            }

            let _ = tx
                .send(MonitorMessage::CommandFinished {
                    key,
                    action,
                    result,
                    reply,
                })
                .await;
        });
    }

    fn finish_command(
        &mut self,
        key: ServiceKey,
        action: ServiceAction,
        result: Result<CommandOutcome, CommandError>,
        reply: CommandReply,
    ) {
        self.busy.remove(&key);

        match &result {
            Ok(CommandOutcome::Cancelled) => {
                info!("{} {} cancelled by user", action, key);
            }
            Ok(CommandOutcome::Completed) => {
                info!("{} {} completed", action, key);
                self.last_error = None;
                self.request_pass(true, None);
            }
            Err(e) => {
                error!("{} {} failed: {}", action, key, e);
                self.last_error = Some(e.to_string());
                self.request_pass(true, None);
            }
        }

        let _ = reply.send(result);
    }

    fn blame(&self, key: ServiceKey, reply: oneshot::Sender<Result<Option<String>, CommandError>>) {
        if self.current().find(&key).is_none() {
            let _ = reply.send(Err(CommandError::ServiceNotFound(key)));
            return;
        }

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            let target = ctx.registry.control_target(key.domain);
            let result = ctx
                .bridge
                .blame(target, &key.label)
                .await
                .map_err(CommandError::from);
            let _ = reply.send(result);
        });
    }
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod tests;
