//! One reconciliation pass: scan every active domain and query the service
//! manager, concurrently.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use launchwarden_core::{scan_directory, DomainRegistry, ServiceDescriptor, ServiceDomain};
use launchwarden_launchctl::ControlBridge;

use crate::merge::LiveView;

/// Everything a pass needs. Shared between the actor and its tasks.
#[derive(Debug, Clone)]
pub struct PassContext {
    pub registry: DomainRegistry,
    pub bridge: ControlBridge,
    pub include_system: bool,
}

impl PassContext {
    pub fn new(registry: DomainRegistry, bridge: ControlBridge, include_system: bool) -> Self {
        Self {
            registry,
            bridge,
            include_system,
        }
    }

    /// Domains scanned by a pass.
    pub fn active_domains(&self) -> &'static [ServiceDomain] {
        if self.include_system {
            &ServiceDomain::ALL
        } else {
            &ServiceDomain::DEFAULT_SCAN
        }
    }

    /// Distinct control targets of the active domains.
    pub fn active_targets(&self) -> BTreeSet<String> {
        self.active_domains()
            .iter()
            .map(|d| self.registry.control_target(*d).to_string())
            .collect()
    }
}

/// Raw inputs gathered by a pass, not yet merged.
#[derive(Debug, Default)]
pub struct PassData {
    pub descriptors: Vec<ServiceDescriptor>,
    pub live: LiveView,
}

/// Gather descriptors and live status.
pub async fn run_pass(ctx: Arc<PassContext>) -> PassData {
    let (descriptors, live) = tokio::join!(scan_domains(&ctx), query_live(&ctx));
    debug!(
        "Pass gathered {} descriptors, control utility {}",
        descriptors.len(),
        if live.is_available() { "available" } else { "unavailable" }
    );
    PassData { descriptors, live }
}

async fn scan_domains(ctx: &PassContext) -> Vec<ServiceDescriptor> {
    let scans = ctx.active_domains().iter().map(|&domain| {
        let directory = ctx.registry.directory(domain).to_path_buf();
        async move {
            match tokio::task::spawn_blocking(move || scan_directory(&directory, domain)).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("Scan of {} did not complete: {}", domain, e);
                    Vec::new()
                }
            }
        }
    });

    join_all(scans).await.into_iter().flatten().collect()
}

async fn query_live(ctx: &PassContext) -> LiveView {
    let user_target = ctx.registry.user_target();
    let targets = ctx.active_targets();

    let list = async {
        match ctx.bridge.list_status().await {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("Live status unavailable: {}", e);
                None
            }
        }
    };

    let detailed = join_all(
        targets
            .iter()
            .filter(|t| **t != user_target)
            .map(|target| async move { (target.clone(), ctx.bridge.query_detailed(target).await) }),
    );

    let disabled = join_all(
        targets
            .iter()
            .map(|target| async move { (target.clone(), ctx.bridge.query_disabled(target).await) }),
    );

    let (list, detailed, disabled) = tokio::join!(list, detailed, disabled);

    LiveView {
        list,
        detailed: detailed.into_iter().collect::<HashMap<_, _>>(),
        disabled: disabled.into_iter().collect::<HashMap<_, _>>(),
    }
}
