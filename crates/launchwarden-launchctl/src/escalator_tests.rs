use std::path::Path;

use super::*;
use crate::runner::CommandOutput;
use crate::testing::FakeRunner;

fn elevator(runner: &Arc<FakeRunner>) -> OsascriptElevator {
    OsascriptElevator::new(runner.clone())
}

#[test]
fn test_system_target_script() {
    let plan = CommandPlan::deactivate("system", "com.vendor.daemon").unwrap();
    let script = build_shell_script(&plan, "/bin/launchctl").unwrap();
    assert_eq!(
        script,
        "{ '/bin/launchctl' 'bootout' 'system/com.vendor.daemon' 2>/dev/null || true; } && \
         '/bin/launchctl' 'disable' 'system/com.vendor.daemon'"
    );
}

#[test]
fn test_gui_target_script_uses_asuser() {
    let plan = CommandPlan::activate("gui/501", "com.vendor.agent", Path::new("/Library/LaunchAgents/com.vendor.agent.plist"))
        .unwrap();
    let script = build_shell_script(&plan, "/bin/launchctl").unwrap();
    assert_eq!(
        script,
        "'/bin/launchctl' asuser 501 '/bin/launchctl' 'enable' 'gui/501/com.vendor.agent' && \
         '/bin/launchctl' asuser 501 '/bin/launchctl' 'bootstrap' 'gui/501' '/Library/LaunchAgents/com.vendor.agent.plist'"
    );
}

#[test]
fn test_failing_enable_stops_bootstrap() {
    let plan = CommandPlan::activate("system", "com.a", Path::new("/Library/LaunchDaemons/com.a.plist")).unwrap();
    let script = build_shell_script(&plan, "/bin/launchctl").unwrap();
    let (enable, bootstrap) = script.split_once(" && ").unwrap();
    assert_eq!(enable, "'/bin/launchctl' 'enable' 'system/com.a'");
    assert!(bootstrap.starts_with("'/bin/launchctl' 'bootstrap' 'system'"));
    assert!(!script.contains(';'));
}

#[test]
fn test_path_metacharacters_are_quoted() {
    let plan = CommandPlan::activate("system", "com.a", Path::new("/tmp/it's $(id) `x`.plist")).unwrap();
    let script = build_shell_script(&plan, "/bin/launchctl").unwrap();
    assert!(script.contains("'/tmp/it'\\''s $(id) `x`.plist'"));
}

#[test]
fn test_empty_plan_rejected() {
    let plan = CommandPlan {
        target: "system".to_string(),
        label: "com.a".to_string(),
        steps: Vec::new(),
    };
    assert!(matches!(
        build_shell_script(&plan, "/bin/launchctl"),
        Err(ElevationError::InvalidCommand(_))
    ));
}

#[test]
fn test_applescript_wrapping() {
    let script = build_applescript("'/bin/launchctl' 'disable' \"x\"");
    assert_eq!(
        script,
        "do shell script \"'/bin/launchctl' 'disable' \\\"x\\\"\" with administrator privileges"
    );
}

#[tokio::test]
async fn test_run_elevated_passes_argument_vector() {
    let runner = FakeRunner::new();
    let plan = CommandPlan::deactivate("system", "com.vendor.daemon").unwrap();

    elevator(&runner).run_elevated(&plan).await.unwrap();

    let calls = runner.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0], "-e");
    assert!(calls[0][1].starts_with("do shell script \""));
    assert!(calls[0][1].ends_with("with administrator privileges"));
}

#[tokio::test]
async fn test_run_elevated_cancelled() {
    let runner = FakeRunner::new();
    runner.respond("-e", CommandOutput::new(1, "0:66: execution error: User canceled. (-128)"));
    let plan = CommandPlan::deactivate("system", "com.vendor.daemon").unwrap();

    let result = elevator(&runner).run_elevated(&plan).await;
    assert_eq!(result, Err(ElevationError::Cancelled));
}

#[tokio::test]
async fn test_run_elevated_failed() {
    let runner = FakeRunner::new();
    runner.respond("-e", CommandOutput::new(1, "execution error: Bootstrap failed: 5: Input/output error (5)"));
    let plan = CommandPlan::deactivate("system", "com.vendor.daemon").unwrap();

    match elevator(&runner).run_elevated(&plan).await {
        Err(ElevationError::Failed(msg)) => assert!(msg.contains("Input/output error")),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_run_elevated_unavailable() {
    let runner = FakeRunner::new();
    runner.respond("-e", CommandOutput::unavailable());
    let plan = CommandPlan::deactivate("system", "com.vendor.daemon").unwrap();

    let result = elevator(&runner).run_elevated(&plan).await;
    assert!(matches!(result, Err(ElevationError::Failed(_))));
}

#[tokio::test]
async fn test_run_elevated_already_loaded_is_success() {
    let runner = FakeRunner::new();
    runner.respond(
        "-e",
        CommandOutput::new(
            1,
            "0:120: execution error: Bootstrap failed: 5: Input/output error\nservice already loaded (5)",
        ),
    );
    let plan = CommandPlan::activate("system", "com.vendor.daemon", Path::new("/Library/LaunchDaemons/com.vendor.daemon.plist"))
        .unwrap();

    assert_eq!(elevator(&runner).run_elevated(&plan).await, Ok(()));
}

#[tokio::test]
async fn test_run_elevated_already_deregistered_is_success() {
    let runner = FakeRunner::new();
    runner.respond("-e", CommandOutput::new(1, "execution error: Could not find service (113)"));
    let plan = CommandPlan::deactivate("system", "com.vendor.daemon").unwrap();

    assert_eq!(elevator(&runner).run_elevated(&plan).await, Ok(()));
}

#[tokio::test]
async fn test_registration_marker_does_not_excuse_deactivate() {
    let runner = FakeRunner::new();
    runner.respond("-e", CommandOutput::new(1, "execution error: already loaded but Operation not permitted"));
    let plan = CommandPlan::deactivate("system", "com.vendor.daemon").unwrap();

    assert!(matches!(
        elevator(&runner).run_elevated(&plan).await,
        Err(ElevationError::Failed(_))
    ));
}

#[tokio::test]
async fn test_run_elevated_cancel_wins_over_failure_output() {
    let runner = FakeRunner::new();
    runner.respond(
        "-e",
        CommandOutput::new(1, "execution error: Bootstrap failed: 5: Input/output error\nUser canceled. (-128)"),
    );
    let plan = CommandPlan::activate("gui/501", "com.vendor.agent", Path::new("/Library/LaunchAgents/com.vendor.agent.plist"))
        .unwrap();

    assert_eq!(elevator(&runner).run_elevated(&plan).await, Err(ElevationError::Cancelled));
}
