use std::path::Path;

use super::*;
use crate::testing::FakeRunner;
use launchwarden_core::LiveStatus;

fn bridge(runner: &Arc<FakeRunner>) -> ControlBridge {
    ControlBridge::new(runner.clone(), DEFAULT_LAUNCHCTL)
}

#[tokio::test]
async fn test_list_status_parses_sample() {
    let runner = FakeRunner::new();
    runner.respond_ok("list", "PID\tStatus\tLabel\n42\t0\tcom.a.b\n-\t78\tcom.c.d\n");

    let entries = bridge(&runner).list_status().await.unwrap();
    assert_eq!(entries["com.a.b"], ListEntry::new(Some(42), Some(0)));
    assert_eq!(entries["com.c.d"], ListEntry::new(None, Some(78)));
    assert_eq!(runner.invocations(), vec![vec!["list".to_string()]]);
}

#[tokio::test]
async fn test_list_status_unavailable() {
    let runner = FakeRunner::new();
    runner.respond("list", CommandOutput::unavailable());

    let result = bridge(&runner).list_status().await;
    assert!(matches!(result, Err(ControlError::Unavailable(_))));
}

#[tokio::test]
async fn test_query_detailed_and_disabled() {
    let runner = FakeRunner::new();
    runner
        .respond_ok("print system", "system = {\n\tservices = {\n\t\t  77  -  com.x.y\n\t}\n}\n")
        .respond_ok("print-disabled system", "\t\"com.x.z\" => disabled\n");

    let bridge = bridge(&runner);
    let services = bridge.query_detailed("system").await;
    assert_eq!(services.live_status("com.x.y"), Some(LiveStatus::Running { pid: 77 }));

    let disabled = bridge.query_disabled("system").await;
    assert!(disabled.contains("com.x.z"));
}

#[tokio::test]
async fn test_queries_degrade_to_empty() {
    let runner = FakeRunner::new();
    runner
        .respond("print system", CommandOutput::unavailable())
        .respond("print-disabled system", CommandOutput::unavailable());

    let bridge = bridge(&runner);
    assert!(bridge.query_detailed("system").await.is_empty());
    assert!(bridge.query_disabled("system").await.is_empty());
}

#[tokio::test]
async fn test_bootstrap_already_loaded_is_success() {
    let runner = FakeRunner::new();
    runner.respond(
        "bootstrap",
        CommandOutput::new(37, "Bootstrap failed: 37: Operation already in progress\nerror: service already loaded"),
    );

    let result = bridge(&runner)
        .bootstrap("gui/501", Path::new("/tmp/com.a.b.plist"))
        .await;
    assert!(result.is_ok());
    assert_eq!(runner.invocations()[0], vec!["bootstrap", "gui/501", "/tmp/com.a.b.plist"]);
}

#[tokio::test]
async fn test_bootstrap_error_is_failure() {
    let runner = FakeRunner::new();
    runner.respond("bootstrap", CommandOutput::new(5, "Bootstrap failed: 5: Input/output error"));

    let result = bridge(&runner)
        .bootstrap("gui/501", Path::new("/tmp/com.a.b.plist"))
        .await;
    match result {
        Err(ControlError::CommandFailed(msg)) => assert!(msg.contains("Input/output error")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_run_plan_tolerates_bootout_failure() {
    let runner = FakeRunner::new();
    runner.respond("bootout", CommandOutput::new(5, "Boot-out failed: 5: Input/output error"));

    let plan = CommandPlan::deactivate("gui/501", "com.a.b").unwrap();
    bridge(&runner).run_plan(&plan).await.unwrap();

    assert_eq!(runner.count("bootout gui/501/com.a.b"), 1);
    assert_eq!(runner.count("disable gui/501/com.a.b"), 1);
}

#[tokio::test]
async fn test_run_plan_stops_on_failure() {
    let runner = FakeRunner::new();
    runner.respond("enable", CommandOutput::new(1, "error: permission denied"));

    let plan = CommandPlan::activate("gui/501", "com.a.b", Path::new("/tmp/com.a.b.plist")).unwrap();
    let result = bridge(&runner).run_plan(&plan).await;
    assert!(matches!(result, Err(ControlError::CommandFailed(_))));
    assert_eq!(runner.count("bootstrap"), 0);
}

#[tokio::test]
async fn test_invalid_label_never_spawns() {
    let runner = FakeRunner::new();
    let bridge = bridge(&runner);

    let result = bridge.enable("gui/501", "com.a;touch /tmp/pwned").await;
    assert!(matches!(result, Err(ControlError::InvalidLabel(_))));
    let result = bridge.blame("gui/501", "$(id)").await;
    assert!(matches!(result, Err(ControlError::InvalidLabel(_))));
    assert_eq!(runner.total_calls(), 0);
}

#[tokio::test]
async fn test_blame() {
    let runner = FakeRunner::new();
    runner.respond_ok("blame gui/501/com.a.b", "  speculative launch\n");
    runner.respond_ok("blame gui/501/com.c.d", "\n");

    let bridge = bridge(&runner);
    assert_eq!(
        bridge.blame("gui/501", "com.a.b").await.unwrap().as_deref(),
        Some("speculative launch")
    );
    assert_eq!(bridge.blame("gui/501", "com.c.d").await.unwrap(), None);
}
