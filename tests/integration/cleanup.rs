#[path = "common/mod.rs"]
mod common;

use clusterctl::maintenance::Maintainer;
use clusterctl::selection::SelectionInput;
use common::HarnessBuilder;
use tempfile::tempdir;

#[test]
fn empty_cleanup_selection_does_nothing() {
    let dir = tempdir().unwrap();
    let harness = HarnessBuilder::new(dir.path()).finish();

    harness.maintainer.cleanup().unwrap();

    assert!(harness.targets.calls().is_empty());
}

#[test]
fn coordination_and_primary_items_share_one_reconciliation() {
    let dir = tempdir().unwrap();
    let input = SelectionInput {
        clean: vec!["coordination".into(), "primary_tables".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path()).input(input).finish();

    harness.maintainer.cleanup().unwrap();

    assert_eq!(
        harness.targets.calls(),
        vec![
            "update_primary_tables",
            "clean_coordination_store",
            "update_secondary_tables"
        ]
    );
}

#[test]
fn leaf_items_never_reconcile() {
    let dir = tempdir().unwrap();
    let input = SelectionInput {
        clean: vec!["log".into(), "cache".into(), "cdc_gc".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path()).input(input).finish();

    harness.maintainer.cleanup().unwrap();

    let calls = harness.targets.calls();
    assert!(!calls.iter().any(|c| c == "update_secondary_tables"));
    assert_eq!(calls, vec!["clean_log", "clean_cache", "clean_cdc_garbage"]);
}

#[test]
fn cleanup_runs_items_in_catalog_order_not_input_order() {
    let dir = tempdir().unwrap();
    let input = SelectionInput {
        clean: vec!["cdc_gc".into(), "log".into(), "journal".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path()).input(input).finish();

    harness.maintainer.cleanup().unwrap();

    assert_eq!(
        harness.targets.calls(),
        vec![
            "clean_log",
            "clean_coordination_store",
            "clean_journal",
            "clean_cdc_garbage"
        ]
    );
}
