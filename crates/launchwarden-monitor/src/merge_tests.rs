use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use launchwarden_launchctl::parse::parse_list;

use super::*;

fn registry() -> DomainRegistry {
    DomainRegistry::new(501, Some(Path::new("/Users/tester")))
}

fn descriptor(label: &str, domain: ServiceDomain) -> ServiceDescriptor {
    ServiceDescriptor {
        label: label.to_string(),
        domain,
        source_path: PathBuf::from(format!("/tmp/{}/{}.plist", domain, label)),
        program: None,
        program_arguments: Some(vec!["/usr/bin/true".to_string()]),
        run_at_load: false,
        keep_alive: false,
        start_interval: None,
        environment_variables: BTreeMap::new(),
        working_directory: None,
        stdout_path: None,
        stderr_path: None,
        user: None,
        group: None,
        disabled: false,
    }
}

fn live_with_list(rows: &[(&str, Option<u32>, Option<i32>)]) -> LiveView {
    LiveView {
        list: Some(
            rows.iter()
                .map(|(label, pid, code)| (label.to_string(), ListEntry::new(*pid, *code)))
                .collect(),
        ),
        ..Default::default()
    }
}

#[test]
fn test_state_from_list_entry() {
    let live = live_with_list(&[
        ("com.run", Some(42), Some(0)),
        ("com.fail", None, Some(78)),
        ("com.idle", None, Some(0)),
        ("com.load", None, None),
    ]);
    let cases = [
        ("com.run", ServiceState::Running(42)),
        ("com.fail", ServiceState::Failed(78)),
        ("com.idle", ServiceState::Loaded),
        ("com.load", ServiceState::Loaded),
        ("com.absent", ServiceState::Unloaded),
    ];
    for (label, expected) in cases {
        let desc = descriptor(label, ServiceDomain::UserAgents);
        assert_eq!(project_state(&desc, "gui/501", &live), expected, "label {}", label);
    }
}

#[test]
fn test_idle_loaded_agent_is_not_reported_stopped() {
    let live = LiveView {
        list: Some(parse_list("PID\tStatus\tLabel\n-\t0\tcom.idle\n-\t-\tcom.fresh\n")),
        ..Default::default()
    };
    for label in ["com.idle", "com.fresh"] {
        let desc = descriptor(label, ServiceDomain::GlobalAgents);
        assert_eq!(project_state(&desc, "gui/501", &live), ServiceState::Loaded, "label {}", label);
    }
}

#[test]
fn test_unavailable_list_is_unknown() {
    let live = LiveView::default();
    let desc = descriptor("com.a.b", ServiceDomain::UserAgents);
    assert_eq!(project_state(&desc, "gui/501", &live), ServiceState::Unknown);
}

#[test]
fn test_detailed_view_used_without_list_entry() {
    let mut live = live_with_list(&[]);
    let mut services = DomainServices::default();
    services.insert("com.daemon.run", Some(900));
    services.insert("com.daemon.idle", None);
    live.detailed.insert("system".to_string(), services);

    let run = descriptor("com.daemon.run", ServiceDomain::GlobalDaemons);
    let idle = descriptor("com.daemon.idle", ServiceDomain::GlobalDaemons);
    assert_eq!(project_state(&run, "system", &live), ServiceState::Running(900));
    assert_eq!(project_state(&idle, "system", &live), ServiceState::Loaded);
}

#[test]
fn test_disabled_sources() {
    let mut live = live_with_list(&[]);
    live.disabled
        .insert("system".to_string(), ["com.off.override".to_string()].into_iter().collect());

    let overridden = descriptor("com.off.override", ServiceDomain::GlobalDaemons);
    assert_eq!(project_state(&overridden, "system", &live), ServiceState::Disabled);
    // The override table is per target.
    assert_eq!(project_state(&overridden, "gui/501", &live), ServiceState::Unloaded);

    let mut in_file = descriptor("com.off.file", ServiceDomain::UserAgents);
    in_file.disabled = true;
    assert_eq!(project_state(&in_file, "gui/501", &live), ServiceState::Disabled);
}

#[test]
fn test_reconcile_end_to_end_states() {
    let live = live_with_list(&[("com.a.b", Some(42), Some(0))]);
    let records = reconcile(
        vec![
            descriptor("com.c.d", ServiceDomain::UserAgents),
            descriptor("com.a.b", ServiceDomain::UserAgents),
        ],
        &live,
        &registry(),
        false,
    );

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].label, "com.a.b");
    assert_eq!(records[0].state, ServiceState::Running(42));
    assert_eq!(records[1].label, "com.c.d");
    assert_eq!(records[1].state, ServiceState::Unloaded);
}

#[test]
fn test_reconcile_sorted_by_label_then_domain() {
    let live = live_with_list(&[]);
    let records = reconcile(
        vec![
            descriptor("com.z", ServiceDomain::UserAgents),
            descriptor("com.a", ServiceDomain::GlobalDaemons),
            descriptor("com.a", ServiceDomain::UserAgents),
        ],
        &live,
        &registry(),
        false,
    );
    let keys: Vec<_> = records.iter().map(|r| (r.label.as_str(), r.domain)).collect();
    assert_eq!(
        keys,
        vec![
            ("com.a", ServiceDomain::UserAgents),
            ("com.a", ServiceDomain::GlobalDaemons),
            ("com.z", ServiceDomain::UserAgents),
        ]
    );
}

#[test]
fn test_reconcile_deduplicates_keys() {
    let live = live_with_list(&[]);
    let mut second = descriptor("com.dup", ServiceDomain::UserAgents);
    second.source_path = PathBuf::from("/tmp/zzz.plist");
    let first = descriptor("com.dup", ServiceDomain::UserAgents);

    let records = reconcile(vec![second, first.clone()], &live, &registry(), false);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_path(), Some(first.source_path.as_path()));
}

#[test]
fn test_orphans_only_with_system_services() {
    let mut live = live_with_list(&[
        ("com.apple.Finder", Some(10), Some(0)),
        ("com.vendor.helper", None, Some(0)),
        ("com.known", Some(5), Some(0)),
    ]);
    let mut services = DomainServices::default();
    services.insert("com.apple.logd", Some(381));
    services.insert("com.vendor.daemon", None);
    services.insert("com.vendor.helper", None);
    live.detailed.insert("system".to_string(), services);

    let descriptors = vec![descriptor("com.known", ServiceDomain::UserAgents)];

    let hidden = reconcile(descriptors.clone(), &live, &registry(), false);
    assert_eq!(hidden.len(), 1);

    let shown = reconcile(descriptors, &live, &registry(), true);
    let find = |label: &str| shown.iter().find(|r| r.label == label).cloned();

    let finder = find("com.apple.Finder").unwrap();
    assert_eq!(finder.domain, ServiceDomain::SystemAgents);
    assert_eq!(finder.state, ServiceState::Running(10));
    assert!(finder.descriptor.is_none());

    let helper = find("com.vendor.helper").unwrap();
    assert_eq!(helper.domain, ServiceDomain::UserAgents);
    assert_eq!(helper.state, ServiceState::Loaded);

    let logd = find("com.apple.logd").unwrap();
    assert_eq!(logd.domain, ServiceDomain::SystemDaemons);
    assert_eq!(logd.state, ServiceState::Running(381));

    let daemon = find("com.vendor.daemon").unwrap();
    assert_eq!(daemon.domain, ServiceDomain::GlobalDaemons);
    assert_eq!(daemon.state, ServiceState::Loaded);

    assert_eq!(shown.iter().filter(|r| r.label == "com.vendor.helper").count(), 1);
    assert_eq!(shown.iter().filter(|r| r.label == "com.known").count(), 1);
}

#[test]
fn test_unavailable_degrades_every_record() {
    let records = reconcile(
        vec![
            descriptor("com.a", ServiceDomain::UserAgents),
            descriptor("com.b", ServiceDomain::GlobalDaemons),
        ],
        &LiveView::default(),
        &registry(),
        true,
    );
    assert!(records.iter().all(|r| r.state == ServiceState::Unknown));
}
