#[path = "common/mod.rs"]
mod common;

use clusterctl::maintenance::Maintainer;
use clusterctl::selection::SelectionInput;
use clusterctl::test_utils::RecordingControlPlane;
use common::HarnessBuilder;
use tempfile::tempdir;

#[test]
fn stop_issues_control_calls_in_reverse_inventory_order() {
    let dir = tempdir().unwrap();
    let harness = HarnessBuilder::new(dir.path()).finish();

    harness.maintainer.stop().unwrap();

    assert_eq!(
        harness.control.calls(),
        vec!["stop:[indexd, gatewayd, stored, journald, metad]"]
    );
    // No cleanup items were selected, so no handler ran.
    assert!(harness.targets.calls().is_empty());
}

#[test]
fn start_issues_control_calls_in_forward_inventory_order() {
    let dir = tempdir().unwrap();
    let harness = HarnessBuilder::new(dir.path()).finish();

    harness.maintainer.start().unwrap();

    assert_eq!(
        harness.control.calls(),
        vec!["start:[metad, journald, stored, gatewayd, indexd]"]
    );
}

#[test]
fn subset_selection_keeps_inventory_order_both_ways() {
    let dir = tempdir().unwrap();
    let input = SelectionInput {
        services: vec!["gatewayd".into(), "metad".into(), "stored".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path()).input(input).finish();

    harness.maintainer.stop().unwrap();
    harness.maintainer.start().unwrap();

    assert_eq!(
        harness.control.calls(),
        vec![
            "stop:[gatewayd, stored, metad]",
            "start:[metad, stored, gatewayd]"
        ]
    );
}

#[test]
fn stop_runs_cleanup_after_the_control_plane_stop() {
    let dir = tempdir().unwrap();
    let input = SelectionInput {
        clean: vec!["log".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path()).input(input).finish();

    harness.maintainer.stop().unwrap();

    assert_eq!(harness.control.calls().len(), 1);
    assert_eq!(harness.targets.calls(), vec!["clean_log"]);
}

#[test]
fn restart_aborts_after_a_stop_failure() {
    let dir = tempdir().unwrap();
    let harness = HarnessBuilder::new(dir.path())
        .control(RecordingControlPlane::failing_on("stop"))
        .finish();

    assert!(harness.maintainer.restart().is_err());

    let calls = harness.control.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].starts_with("stop:"));
    // A failed stop must not be masked by a start attempt.
    assert!(!calls.iter().any(|c| c.starts_with("start:")));
}

#[test]
fn restart_sequences_stop_cleanup_start() {
    let dir = tempdir().unwrap();
    let input = SelectionInput {
        clean: vec!["cache".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path()).input(input).finish();

    harness.maintainer.restart().unwrap();

    let calls = harness.control.calls();
    assert!(calls[0].starts_with("stop:"));
    assert!(calls[1].starts_with("start:"));
    assert_eq!(harness.targets.calls(), vec!["clean_cache"]);
}

#[test]
fn full_maintenance_scenario_with_clean_all() {
    let dir = tempdir().unwrap();
    let input = SelectionInput {
        clean: vec!["all".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path()).input(input).finish();

    harness.maintainer.stop().unwrap();
    harness.maintainer.start().unwrap();

    assert_eq!(
        harness.control.calls(),
        vec![
            "stop:[indexd, gatewayd, stored, journald, metad]",
            "start:[metad, journald, stored, gatewayd, indexd]"
        ]
    );

    let cleanup_calls = harness.targets.calls();
    // Every catalog item ran, and reconciliation ran exactly once, last.
    assert_eq!(
        cleanup_calls.last().map(String::as_str),
        Some("update_secondary_tables")
    );
    assert_eq!(
        cleanup_calls
            .iter()
            .filter(|c| c.as_str() == "update_secondary_tables")
            .count(),
        1
    );
    for handler in [
        "clean_log",
        "clean_journal",
        "clean_cache",
        "update_primary_tables",
        "clean_secondary_tables",
        "clean_coordination_store",
        "clean_cdc_garbage",
    ] {
        assert!(
            cleanup_calls.iter().any(|c| c == handler),
            "missing {handler} in {cleanup_calls:?}"
        );
    }
}
