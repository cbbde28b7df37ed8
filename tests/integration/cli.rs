use assert_cmd::Command;
use predicates::str::contains;

fn clusterctl() -> Command {
    Command::cargo_bin("clusterctl").expect("binary builds")
}

#[test]
fn help_lists_the_maintenance_commands() {
    clusterctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("stop"))
        .stdout(contains("start"))
        .stdout(contains("restart"))
        .stdout(contains("cleanup"))
        .stdout(contains("make-binary"))
        .stdout(contains("make-image"))
        .stdout(contains("apply-image"))
        .stdout(contains("upgrade"));
}

#[test]
fn missing_config_file_is_reported() {
    clusterctl()
        .args(["stop", "--config", "/nonexistent/clusterctl.yaml"])
        .assert()
        .failure()
        .stderr(contains("Failed to read config file"));
}

#[test]
fn unknown_subcommand_is_rejected() {
    clusterctl().arg("frobnicate").assert().failure();
}

#[test]
fn cleanup_requires_at_least_one_item() {
    clusterctl()
        .arg("cleanup")
        .assert()
        .failure()
        .stderr(contains("--clean"));
}

#[test]
fn apply_image_requires_an_image_reference() {
    clusterctl()
        .arg("apply-image")
        .assert()
        .failure()
        .stderr(contains("--image"));
}
