//! MonitorHandle: the cloneable front door to the monitor actor.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::warn;

use launchwarden_core::{ServiceDomain, ServiceKey, ServiceRecord};

use crate::actor::{MonitorMessage, ServiceAction};
use crate::error::{CommandError, CommandOutcome};
use crate::snapshot::{PassStage, Snapshot};

/// Handle for talking to the monitor actor. Cheap to clone.
///
/// Reads of the published snapshot never wait on the actor.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<MonitorMessage>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
}

impl MonitorHandle {
    pub(crate) fn new(tx: mpsc::Sender<MonitorMessage>, snapshots: watch::Receiver<Arc<Snapshot>>) -> Self {
        Self { tx, snapshots }
    }

    async fn send(&self, msg: MonitorMessage) -> Result<(), CommandError> {
        self.tx.send(msg).await.map_err(|_| CommandError::MonitorStopped)
    }

    // === Reconciliation ===

    /// Run a pass, or join the one already running, and return its snapshot.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CommandError> {
        self.request_refresh(false).await
    }

    /// Like [`refresh`](Self::refresh), but never served by a pass that
    /// started before this call.
    pub async fn refresh_after_change(&self) -> Result<Arc<Snapshot>, CommandError> {
        self.request_refresh(true).await
    }

    async fn request_refresh(&self, after_change: bool) -> Result<Arc<Snapshot>, CommandError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MonitorMessage::Refresh {
            after_change,
            reply: Some(reply_tx),
        })
        .await?;
        reply_rx.await.map_err(|_| CommandError::MonitorStopped)
    }

    /// Queue a post-change refresh without waiting for it.
    pub fn notify_changed(&self) {
        if let Err(e) = self.tx.try_send(MonitorMessage::Refresh {
            after_change: true,
            reply: None,
        }) {
            warn!("Could not queue refresh: {}", e);
        }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// Records of the latest snapshot, optionally filtered.
    pub fn records(&self, domain: Option<ServiceDomain>, search: Option<&str>) -> Vec<ServiceRecord> {
        self.snapshot().filter(domain, search)
    }

    pub fn record(&self, key: &ServiceKey) -> Option<ServiceRecord> {
        self.snapshot().find(key).cloned()
    }

    /// Receive every snapshot publication.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    pub async fn stage(&self) -> Result<PassStage, CommandError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MonitorMessage::Stage { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| CommandError::MonitorStopped)
    }

    // === Commands ===

    pub async fn start(&self, key: &ServiceKey) -> Result<CommandOutcome, CommandError> {
        self.execute(key, ServiceAction::Start).await
    }

    pub async fn stop(&self, key: &ServiceKey) -> Result<CommandOutcome, CommandError> {
        self.execute(key, ServiceAction::Stop).await
    }

    pub async fn enable(&self, key: &ServiceKey) -> Result<CommandOutcome, CommandError> {
        self.execute(key, ServiceAction::Enable).await
    }

    pub async fn disable(&self, key: &ServiceKey) -> Result<CommandOutcome, CommandError> {
        self.execute(key, ServiceAction::Disable).await
    }

    pub async fn execute(&self, key: &ServiceKey, action: ServiceAction) -> Result<CommandOutcome, CommandError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MonitorMessage::Execute {
            key: key.clone(),
            action,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| CommandError::MonitorStopped)?
    }

    /// Why the service manager last started the service.
    pub async fn blame(&self, key: &ServiceKey) -> Result<Option<String>, CommandError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(MonitorMessage::Blame {
            key: key.clone(),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| CommandError::MonitorStopped)?
    }

    // === Error state ===

    /// Message of the last failed command, until a command succeeds or the
    /// error is cleared.
    pub async fn last_error(&self) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.send(MonitorMessage::LastError { reply: reply_tx }).await.is_err() {
            return None;
        }
        reply_rx.await.ok().flatten()
    }

    pub async fn clear_error(&self) {
        let _ = self.send(MonitorMessage::ClearError).await;
    }

    /// Stop the actor. Pending requests resolve with `MonitorStopped`.
    pub async fn shutdown(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.send(MonitorMessage::Shutdown { reply: reply_tx }).await.is_ok() {
            let _ = reply_rx.await;
        }
    }
}
