#[path = "common/mod.rs"]
mod common;

use std::fs;

use clusterctl::error::{BuildError, GateError, MaintenanceError};
use clusterctl::maintenance::Maintainer;
use clusterctl::selection::SelectionInput;
use clusterctl::test_utils::FAKE_ARTIFACT;
use common::{HarnessBuilder, build_config};
use tempfile::tempdir;

#[test]
fn make_image_without_pull_or_tag_mutates_nothing_and_gates() {
    let dir = tempdir().unwrap();
    let mut harness = HarnessBuilder::new(dir.path()).finish();

    harness.maintainer.make_image().unwrap();

    let image = harness.maintainer.image().unwrap().to_string();
    assert!(image.starts_with("registry.local/cluster/core:"));
    assert!(image.ends_with("-main-notest"), "{image}");

    // Only the branch lookup touched the VCS.
    assert_eq!(harness.vcs.calls(), vec!["current_branch"]);

    // The gate was probed with the tag component after the last colon.
    let tag = image.rsplit_once(':').unwrap().1.to_string();
    assert_eq!(harness.gate.probes(), vec![tag]);
}

#[test]
fn make_image_polls_the_gate_until_green() {
    let dir = tempdir().unwrap();
    let mut harness = HarnessBuilder::new(dir.path()).gate_failures(2).finish();

    harness.maintainer.make_image().unwrap();

    assert_eq!(harness.gate.probes().len(), 3);
}

#[test]
fn make_image_with_tag_pushes_the_stamped_tag() {
    let dir = tempdir().unwrap();
    let mut build = build_config(dir.path());
    build.tag = true;
    let mut harness = HarnessBuilder::new(dir.path()).build(build).finish();

    harness.maintainer.make_image().unwrap();

    let image = harness.maintainer.image().unwrap().to_string();
    let tag = image.rsplit_once(':').unwrap().1;
    assert!(
        harness
            .vcs
            .calls()
            .contains(&format!("tag_and_push:{tag}"))
    );
}

#[test]
fn make_binary_stages_artifacts_and_change_log() {
    let dir = tempdir().unwrap();
    let mut build = build_config(dir.path());
    build.pull = true;
    build.make = true;
    let input = SelectionInput {
        binaries: vec!["metad".into(), "clustersh".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path())
        .input(input)
        .build(build)
        .finish();

    harness.maintainer.make_binary().unwrap();

    // One per-tag directory was created under the local bin path.
    let tag_dir = fs::read_dir(dir.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    let tag = tag_dir.file_name().unwrap().to_string_lossy().into_owned();
    assert!(tag.ends_with("-main-private"), "{tag}");

    let change_log = fs::read_to_string(tag_dir.join("change.log")).unwrap();
    assert!(change_log.contains(&format!("Version:{tag}")));
    assert!(change_log.contains("Change logs:"));

    for binary in ["metad", "clustersh"] {
        assert_eq!(fs::read(tag_dir.join(binary)).unwrap(), FAKE_ARTIFACT);
    }
}

#[test]
fn transfer_failure_names_the_binary() {
    let dir = tempdir().unwrap();
    let mut build = build_config(dir.path());
    build.make = true;
    let input = SelectionInput {
        binaries: vec!["journald".into()],
        ..Default::default()
    };
    let harness = HarnessBuilder::new(dir.path())
        .input(input)
        .build(build)
        .failing_fetch()
        .finish();

    let err = harness.maintainer.make_binary().unwrap_err();
    match err {
        MaintenanceError::Build(BuildError::TransferFailed { binary, .. }) => {
            assert_eq!(binary, "journald")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn apply_image_gates_stops_applies_and_restarts() {
    let dir = tempdir().unwrap();
    let image = "registry.local/cluster/core:sometag";
    let harness = HarnessBuilder::new(dir.path()).image(image).finish();

    harness.maintainer.apply_image().unwrap();

    assert_eq!(harness.gate.probes(), vec!["sometag"]);
    assert_eq!(
        harness.control.calls(),
        vec![
            "stop:[indexd, gatewayd, stored, journald, metad]".to_string(),
            format!("apply_image:{image}:[metad, journald, stored, gatewayd, indexd]"),
            format!("apply_shell_image:{image}"),
            "start:[metad, journald, stored, gatewayd, indexd]".to_string(),
        ]
    );
}

#[test]
fn apply_image_without_an_image_reference_fails_fast() {
    let dir = tempdir().unwrap();
    let harness = HarnessBuilder::new(dir.path()).finish();

    let err = harness.maintainer.apply_image().unwrap_err();
    assert!(matches!(
        err,
        MaintenanceError::Gate(GateError::ImageUnset)
    ));
    assert!(harness.control.calls().is_empty());
}

#[test]
fn upgrade_core_stops_twice_and_applies_the_new_image() {
    let dir = tempdir().unwrap();
    let mut harness = HarnessBuilder::new(dir.path()).finish();

    harness.maintainer.upgrade_core().unwrap();

    let image = harness.maintainer.image().unwrap().to_string();
    assert!(image.ends_with("-main-notest"), "{image}");

    let calls = harness.control.calls();
    // make_image gates, upgrade stops, apply_image re-gates then stops again;
    // the second stop is a no-op at the control plane.
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("stop:")).count(),
        2
    );
    assert!(calls.iter().any(|c| c.starts_with("apply_image:")));
    assert!(calls.iter().any(|c| c.starts_with("apply_shell_image:")));
    assert!(calls.last().unwrap().starts_with("start:"));
}
