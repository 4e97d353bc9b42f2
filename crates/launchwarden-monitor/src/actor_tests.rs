use std::path::{Path, PathBuf};

use plist::{Dictionary, Value};
use tempfile::TempDir;

use launchwarden_core::{DomainRegistry, ServiceDomain, ServiceState};
use launchwarden_launchctl::testing::{FakeElevator, FakeRunner};
use launchwarden_launchctl::{ControlBridge, ElevationError};

use super::*;

const LIST: &str = "PID\tStatus\tLabel\n42\t0\tcom.a.b\n";

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    runner: Arc<FakeRunner>,
    elevator: Arc<FakeElevator>,
    handle: MonitorHandle,
}

impl Fixture {
    fn new(include_system: bool, elevator: Arc<FakeElevator>) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        for domain in ServiceDomain::ALL {
            std::fs::create_dir_all(root.join(domain.as_str())).unwrap();
        }

        let registry = ServiceDomain::ALL
            .into_iter()
            .fold(DomainRegistry::new(501, Some(root.as_path())), |r, d| {
                r.with_directory(d, root.join(d.as_str()))
            });

        let runner = FakeRunner::new();
        runner.respond_ok("list", LIST);

        let ctx = PassContext::new(
            registry,
            ControlBridge::new(runner.clone(), "/bin/launchctl"),
            include_system,
        );
        let options = MonitorOptions {
            settle_delay: Duration::from_millis(10),
        };
        let handle = MonitorActor::spawn(ctx, elevator.clone(), options);

        Self {
            _temp: temp,
            root,
            runner,
            elevator,
            handle,
        }
    }

    fn add(&self, domain: ServiceDomain, label: &str) -> PathBuf {
        write_descriptor(&self.root.join(domain.as_str()), label)
    }
}

fn write_descriptor(dir: &Path, label: &str) -> PathBuf {
    let mut dict = Dictionary::new();
    dict.insert("Label".to_string(), Value::from(label));
    dict.insert("Program".to_string(), Value::from("/usr/bin/true"));
    let path = dir.join(format!("{}.plist", label));
    Value::Dictionary(dict).to_file_xml(&path).unwrap();
    path
}

fn key(label: &str, domain: ServiceDomain) -> ServiceKey {
    ServiceKey::new(label, domain)
}

#[tokio::test]
async fn test_refresh_publishes_snapshot() {
    let fx = Fixture::new(false, FakeElevator::succeeding());
    fx.add(ServiceDomain::UserAgents, "com.a.b");

    assert_eq!(fx.handle.stage().await.unwrap(), PassStage::Idle);
    let mut updates = fx.handle.subscribe();

    let snapshot = fx.handle.refresh().await.unwrap();
    assert_eq!(snapshot.generation, 1);
    assert!(snapshot.control_available);
    assert!(snapshot.refreshed_at.is_some());
    assert_eq!(snapshot.records[0].state, ServiceState::Running(42));

    assert_eq!(fx.handle.stage().await.unwrap(), PassStage::Published);
    assert_eq!(fx.handle.snapshot().generation, 1);
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow().generation, 1);
}

#[tokio::test]
async fn test_pass_moves_through_every_stage() {
    let temp = TempDir::new().unwrap();
    let registry = ServiceDomain::ALL
        .into_iter()
        .fold(DomainRegistry::new(501, Some(temp.path())), |r, d| {
            r.with_directory(d, temp.path().join(d.as_str()))
        });
    let runner = FakeRunner::new();
    runner.respond_ok("list", LIST);
    let ctx = PassContext::new(registry, ControlBridge::new(runner, "/bin/launchctl"), false);
    let (mut actor, _handle) = MonitorActor::new(ctx, FakeElevator::succeeding(), MonitorOptions::default());
    assert_eq!(actor.stage, PassStage::Idle);

    let (tx, rx) = oneshot::channel();
    actor.handle(MonitorMessage::Refresh {
        after_change: false,
        reply: Some(tx),
    });
    assert_eq!(actor.stage, PassStage::Scanning);

    let gathered = actor.rx.recv().await.unwrap();
    assert!(matches!(gathered, MonitorMessage::PassGathered));
    actor.handle(gathered);
    assert_eq!(actor.stage, PassStage::Merging);
    assert_eq!(actor.generation, 0);

    let finished = actor.rx.recv().await.unwrap();
    assert!(matches!(finished, MonitorMessage::PassFinished { .. }));
    actor.handle(finished);
    assert_eq!(actor.stage, PassStage::Published);
    assert_eq!(rx.await.unwrap().generation, 1);
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_pass() {
    let fx = Fixture::new(false, FakeElevator::succeeding());
    fx.runner.set_delay(Duration::from_millis(100));

    let (a, b, c) = tokio::join!(fx.handle.refresh(), fx.handle.refresh(), fx.handle.refresh());
    assert_eq!(a.unwrap().generation, 1);
    assert_eq!(b.unwrap().generation, 1);
    assert_eq!(c.unwrap().generation, 1);
    assert_eq!(fx.runner.count("list"), 1);
}

#[tokio::test]
async fn test_refresh_after_change_queues_one_follow_up() {
    let fx = Fixture::new(false, FakeElevator::succeeding());
    fx.runner.set_delay(Duration::from_millis(100));

    let first = {
        let handle = fx.handle.clone();
        tokio::spawn(async move { handle.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (x, y) = tokio::join!(fx.handle.refresh_after_change(), fx.handle.refresh_after_change());

    assert_eq!(first.await.unwrap().unwrap().generation, 1);
    assert_eq!(x.unwrap().generation, 2);
    assert_eq!(y.unwrap().generation, 2);
    assert_eq!(fx.runner.count("list"), 2);
}

#[tokio::test]
async fn test_start_user_agent_runs_unprivileged_plan() {
    let fx = Fixture::new(false, FakeElevator::succeeding());
    let path = fx.add(ServiceDomain::UserAgents, "com.c.d");
    fx.handle.refresh().await.unwrap();

    let outcome = fx.handle.start(&key("com.c.d", ServiceDomain::UserAgents)).await;
    assert_eq!(outcome, Ok(CommandOutcome::Completed));

    assert_eq!(fx.runner.count("enable gui/501/com.c.d"), 1);
    let bootstrap = format!("bootstrap gui/501 {}", path.display());
    assert_eq!(fx.runner.count(&bootstrap), 1);
    assert_eq!(fx.elevator.calls(), 0);

    // The command queued a fresh pass.
    let snapshot = fx.handle.refresh().await.unwrap();
    assert!(snapshot.generation >= 2);
}

#[tokio::test]
async fn test_stop_global_daemon_goes_through_elevator() {
    let fx = Fixture::new(false, FakeElevator::succeeding());
    fx.add(ServiceDomain::GlobalDaemons, "com.vendor.daemon");
    fx.handle.refresh().await.unwrap();

    let outcome = fx.handle.stop(&key("com.vendor.daemon", ServiceDomain::GlobalDaemons)).await;
    assert_eq!(outcome, Ok(CommandOutcome::Completed));

    let plans = fx.elevator.plans();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].target, "system");
    assert_eq!(plans[0].steps[0].args, vec!["bootout", "system/com.vendor.daemon"]);
    assert!(plans[0].steps[0].tolerant);
    assert_eq!(fx.runner.count("bootout"), 0);
}

#[tokio::test]
async fn test_cancelled_elevation_changes_nothing() {
    let fx = Fixture::new(false, FakeElevator::cancelling());
    fx.add(ServiceDomain::GlobalAgents, "com.vendor.agent");
    let before = fx.handle.refresh().await.unwrap();
    let list_calls = fx.runner.count("list");

    let outcome = fx.handle.disable(&key("com.vendor.agent", ServiceDomain::GlobalAgents)).await;
    assert_eq!(outcome, Ok(CommandOutcome::Cancelled));
    assert_eq!(fx.elevator.calls(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fx.handle.last_error().await, None);
    assert_eq!(fx.runner.count("list"), list_calls);

    let after = fx.handle.snapshot();
    assert_eq!(after.generation, before.generation);
    assert_eq!(after.records[0].state, before.records[0].state);
}

#[tokio::test]
async fn test_failed_command_sets_error_until_success() {
    let fx = Fixture::new(false, FakeElevator::failing("Bootstrap failed: 5: Input/output error"));
    fx.add(ServiceDomain::GlobalAgents, "com.vendor.agent");
    fx.handle.refresh().await.unwrap();
    let target = key("com.vendor.agent", ServiceDomain::GlobalAgents);

    let result = fx.handle.enable(&target).await;
    assert!(matches!(result, Err(CommandError::CommandFailed(ref m)) if m.contains("Input/output")));
    let error = fx.handle.last_error().await.unwrap();
    assert!(error.contains("Input/output"));

    fx.elevator.set_outcome(Ok(()));
    fx.handle.enable(&target).await.unwrap();
    assert_eq!(fx.handle.last_error().await, None);

    fx.elevator.set_outcome(Err(ElevationError::Failed("again".to_string())));
    let _ = fx.handle.enable(&target).await;
    assert!(fx.handle.last_error().await.is_some());
    fx.handle.clear_error().await;
    assert_eq!(fx.handle.last_error().await, None);
}

#[tokio::test]
async fn test_read_only_domain_rejected_without_subprocess() {
    let fx = Fixture::new(true, FakeElevator::succeeding());
    fx.add(ServiceDomain::SystemDaemons, "com.apple.sealed");
    fx.handle.refresh().await.unwrap();
    let calls = fx.runner.total_calls();

    for action in [ServiceAction::Start, ServiceAction::Stop, ServiceAction::Enable, ServiceAction::Disable] {
        let result = fx
            .handle
            .execute(&key("com.apple.sealed", ServiceDomain::SystemDaemons), action)
            .await;
        assert_eq!(result, Err(CommandError::ReadOnlyDomain(ServiceDomain::SystemDaemons)));
    }

    assert_eq!(fx.runner.total_calls(), calls);
    assert_eq!(fx.elevator.calls(), 0);
    assert_eq!(fx.handle.last_error().await, None);
}

#[tokio::test]
async fn test_overlapping_command_is_busy() {
    let fx = Fixture::new(false, FakeElevator::succeeding());
    fx.add(ServiceDomain::UserAgents, "com.slow");
    fx.handle.refresh().await.unwrap();
    fx.runner.set_delay(Duration::from_millis(200));

    let target = key("com.slow", ServiceDomain::UserAgents);
    let first = {
        let handle = fx.handle.clone();
        let target = target.clone();
        tokio::spawn(async move { handle.stop(&target).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(fx.handle.start(&target).await, Err(CommandError::Busy(target.clone())));
    assert_eq!(first.await.unwrap(), Ok(CommandOutcome::Completed));

    // The guard is released once the command finishes.
    fx.runner.set_delay(Duration::from_millis(0));
    assert_eq!(fx.handle.stop(&target).await, Ok(CommandOutcome::Completed));
}

#[tokio::test]
async fn test_unknown_and_descriptor_less_services() {
    let fx = Fixture::new(true, FakeElevator::succeeding());
    fx.runner
        .respond_ok("list", "PID\tStatus\tLabel\n-\t0\tcom.vendor.orphan\n");
    fx.handle.refresh().await.unwrap();

    let missing = key("com.nope", ServiceDomain::UserAgents);
    assert_eq!(fx.handle.stop(&missing).await, Err(CommandError::ServiceNotFound(missing.clone())));
    assert_eq!(fx.handle.blame(&missing).await, Err(CommandError::ServiceNotFound(missing)));

    let orphan = key("com.vendor.orphan", ServiceDomain::UserAgents);
    assert_eq!(fx.handle.record(&orphan).map(|r| r.state), Some(ServiceState::Loaded));
    assert_eq!(fx.handle.start(&orphan).await, Err(CommandError::MissingDescriptor(orphan.clone())));
    assert_eq!(fx.handle.stop(&orphan).await, Ok(CommandOutcome::Completed));
}

#[tokio::test]
async fn test_blame_uses_control_target() {
    let fx = Fixture::new(false, FakeElevator::succeeding());
    fx.add(ServiceDomain::GlobalDaemons, "com.vendor.daemon");
    fx.runner.respond_ok("blame system/com.vendor.daemon", "speculative\n");
    fx.handle.refresh().await.unwrap();

    let reason = fx.handle.blame(&key("com.vendor.daemon", ServiceDomain::GlobalDaemons)).await;
    assert_eq!(reason, Ok(Some("speculative".to_string())));
}

#[tokio::test]
async fn test_shutdown_stops_handle() {
    let fx = Fixture::new(false, FakeElevator::succeeding());
    fx.handle.shutdown().await;

    assert_eq!(fx.handle.refresh().await.map(|s| s.generation), Err(CommandError::MonitorStopped));
    assert_eq!(fx.handle.last_error().await, None);
}
