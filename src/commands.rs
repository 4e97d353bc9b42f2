//! Subcommand handlers for LaunchWarden.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use tracing::{info, warn};

use launchwarden_config::Config;
use launchwarden_core::{ServiceDomain, ServiceKey, ServiceRecord, ServiceState};
use launchwarden_monitor::{CommandOutcome, Monitor, MonitorHandle, ServiceAction, Snapshot};

use crate::cli::{Commands, ServiceArgs};

/// Handle one subcommand against a freshly started monitor.
pub(crate) async fn run(command: Commands, mut config: Config) -> anyhow::Result<()> {
    if command.targets_system() {
        config.monitor.show_system_services = true;
    }
    match &command {
        Commands::List { all: true, .. } | Commands::Watch { all: true } => {
            config.monitor.show_system_services = true;
        }
        _ => {}
    }
    config.monitor.watch = matches!(command, Commands::Watch { .. });

    let monitor = Monitor::from_config(&config).context("Failed to start directory watcher")?;
    let handle = monitor.handle();
    let snapshot = handle.refresh().await?;
    if !snapshot.control_available {
        warn!("launchctl is unavailable; states are unknown");
    }

    let result = match command {
        Commands::List {
            domain,
            search,
            json,
            ..
        } => list(&handle, domain, search.as_deref(), json),
        Commands::Show { service, json } => show(&snapshot, &service, json),
        Commands::Start { service } => control(&handle, &snapshot, &service, ServiceAction::Start).await,
        Commands::Stop { service } => control(&handle, &snapshot, &service, ServiceAction::Stop).await,
        Commands::Enable { service } => control(&handle, &snapshot, &service, ServiceAction::Enable).await,
        Commands::Disable { service } => control(&handle, &snapshot, &service, ServiceAction::Disable).await,
        Commands::Blame { service } => blame(&handle, &snapshot, &service).await,
        Commands::Watch { .. } => watch(&monitor, snapshot).await,
    };

    monitor.shutdown().await;
    result
}

/// Resolve a label (and optional domain) to exactly one record.
fn resolve<'a>(snapshot: &'a Snapshot, service: &ServiceArgs) -> anyhow::Result<&'a ServiceRecord> {
    if let Some(domain) = service.domain {
        return snapshot
            .find(&ServiceKey::new(service.label.clone(), domain))
            .ok_or_else(|| anyhow!("Service not found: {}/{}", domain, service.label));
    }

    let matches = snapshot.by_label(&service.label);
    match matches.as_slice() {
        [] => bail!("Service not found: {}", service.label),
        [record] => Ok(*record),
        several => {
            let domains: Vec<&str> = several.iter().map(|r| r.domain.as_str()).collect();
            bail!(
                "{} exists in several domains ({}); pass --domain",
                service.label,
                domains.join(", ")
            )
        }
    }
}

fn list(handle: &MonitorHandle, domain: Option<ServiceDomain>, search: Option<&str>, json: bool) -> anyhow::Result<()> {
    let records = handle.records(domain, search);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No services found.");
        return Ok(());
    }

    println!("{:<45} {:<15} {:<22} {}", "LABEL", "DOMAIN", "STATE", "PROGRAM");
    println!("{}", "-".repeat(100));
    for record in &records {
        println!(
            "{:<45} {:<15} {:<22} {}",
            record.label,
            record.domain.as_str(),
            record.state.display_text(),
            record.executable().unwrap_or("-")
        );
    }
    println!("\n{} services", records.len());

    Ok(())
}

fn show(snapshot: &Snapshot, service: &ServiceArgs, json: bool) -> anyhow::Result<()> {
    let record = resolve(snapshot, service)?;

    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!("Service: {}", record.display_name());
    println!("{}", "=".repeat(50));
    println!("Label:       {}", record.label);
    println!("Domain:      {} ({})", record.domain.display_name(), record.domain.description());
    println!("State:       {}", record.state.display_text());
    if let Some(vendor) = record.vendor() {
        println!("Vendor:      {}", vendor);
    }
    println!("Editable:    {}", record.is_editable());

    let Some(descriptor) = &record.descriptor else {
        println!("\nNo descriptor file; known only to launchd.");
        return Ok(());
    };

    println!("File:        {}", descriptor.source_path.display());
    if let Some(program) = descriptor.executable() {
        println!("Program:     {}", program);
    }
    if let Some(args) = &descriptor.program_arguments {
        println!("Arguments:   {}", args.join(" "));
    }
    println!("RunAtLoad:   {}", descriptor.run_at_load);
    println!("KeepAlive:   {}", descriptor.keep_alive);
    if let Some(interval) = descriptor.start_interval {
        println!("Interval:    {}s", interval);
    }
    if let Some(dir) = &descriptor.working_directory {
        println!("WorkingDir:  {}", dir);
    }
    if let Some(user) = &descriptor.user {
        println!("User:        {}", user);
    }
    if let Some(group) = &descriptor.group {
        println!("Group:       {}", group);
    }
    if let Some(path) = &descriptor.stdout_path {
        println!("Stdout:      {}", path);
    }
    if let Some(path) = &descriptor.stderr_path {
        println!("Stderr:      {}", path);
    }
    if descriptor.disabled {
        println!("Disabled:    true");
    }

    if !descriptor.environment_variables.is_empty() {
        println!("\nEnvironment:");
        for (key, value) in &descriptor.environment_variables {
            println!("  {}={}", key, value);
        }
    }

    Ok(())
}

async fn control(
    handle: &MonitorHandle,
    snapshot: &Snapshot,
    service: &ServiceArgs,
    action: ServiceAction,
) -> anyhow::Result<()> {
    let key = resolve(snapshot, service)?.key();

    match handle.execute(&key, action).await? {
        CommandOutcome::Completed => {
            let updated = handle.refresh_after_change().await?;
            let state = updated
                .find(&key)
                .map(|r| r.state)
                .unwrap_or(ServiceState::Unknown);
            println!("{} {}: {}", action, key, state.display_text());
        }
        CommandOutcome::Cancelled => {
            info!("{} {} cancelled", action, key);
            println!("Cancelled.");
        }
    }

    Ok(())
}

async fn blame(handle: &MonitorHandle, snapshot: &Snapshot, service: &ServiceArgs) -> anyhow::Result<()> {
    let key = resolve(snapshot, service)?.key();

    match handle.blame(&key).await? {
        Some(reason) => println!("{}", reason),
        None => println!("launchd reported no reason for {}", key),
    }
    Ok(())
}

/// Print every state change until interrupted.
async fn watch(monitor: &Monitor, initial: Arc<Snapshot>) -> anyhow::Result<()> {
    let handle = monitor.handle();
    let mut updates = handle.subscribe();
    updates.borrow_and_update();

    let mut previous = states(&initial);
    println!(
        "Watching {} services (generation {}). Press Ctrl-C to stop.",
        previous.len(),
        initial.generation
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let current = states(&snapshot);
                print_changes(&previous, &current);
                previous = current;
            }
        }
    }

    Ok(())
}

fn states(snapshot: &Snapshot) -> BTreeMap<ServiceKey, ServiceState> {
    snapshot.records.iter().map(|r| (r.key(), r.state)).collect()
}

fn print_changes(before: &BTreeMap<ServiceKey, ServiceState>, after: &BTreeMap<ServiceKey, ServiceState>) {
    let now = Local::now().format("%H:%M:%S");

    for (key, state) in after {
        match before.get(key) {
            None => println!("{}  + {}  {}", now, key, state.display_text()),
            Some(old) if old != state => {
                println!("{}  ~ {}  {} -> {}", now, key, old.display_text(), state.display_text())
            }
            Some(_) => {}
        }
    }
    for key in before.keys().filter(|k| !after.contains_key(*k)) {
        println!("{}  - {}", now, key);
    }
}
