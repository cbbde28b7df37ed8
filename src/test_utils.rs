//! Shared fakes and helpers for unit and integration tests.
//!
//! Every fake is `Clone` with `Arc`-shared interior state, so a test can keep
//! one clone for assertions while boxing another into the orchestrator.
use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, OnceLock},
};

use sha2::{Digest, Sha256};

use crate::ci::PipelineGate;
use crate::cleanup::CleanupTargets;
use crate::control::ControlPlane;
use crate::error::{BuildError, ControlPlaneError, GateError, MaintenanceError};
use crate::inventory::Service;
use crate::vcs::BuildServer;

/// Global lock for environment variable modifications in tests.
/// All tests that modify environment variables should acquire this lock
/// to prevent race conditions between parallel test executions.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record(calls: &Mutex<Vec<String>>, entry: String) {
    calls
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(entry);
}

fn snapshot(calls: &Mutex<Vec<String>>) -> Vec<String> {
    calls
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Control plane fake that records every call with its service order.
#[derive(Debug, Default, Clone)]
pub struct RecordingControlPlane {
    calls: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
}

impl RecordingControlPlane {
    /// Fake whose named operation fails on every invocation.
    pub fn failing_on(operation: &'static str) -> Self {
        Self {
            calls: Arc::default(),
            fail_on: Some(operation),
        }
    }

    /// Recorded calls, e.g. `"stop:[indexd, gatewayd]"`.
    pub fn calls(&self) -> Vec<String> {
        snapshot(&self.calls)
    }

    fn call(
        &self,
        operation: &'static str,
        services: &[Service],
    ) -> Result<(), ControlPlaneError> {
        let names: Vec<&str> = services.iter().map(|s| s.name).collect();
        record(&self.calls, format!("{operation}:[{}]", names.join(", ")));
        if self.fail_on == Some(operation) {
            Err(ControlPlaneError::Rejected {
                operation,
                target: names.first().unwrap_or(&"none").to_string(),
                status: 500,
            })
        } else {
            Ok(())
        }
    }
}

impl ControlPlane for RecordingControlPlane {
    fn stop(&self, services: &[Service]) -> Result<(), ControlPlaneError> {
        self.call("stop", services)
    }

    fn start(&self, services: &[Service]) -> Result<(), ControlPlaneError> {
        self.call("start", services)
    }

    fn apply_image(&self, services: &[Service], image: &str) -> Result<(), ControlPlaneError> {
        let names: Vec<&str> = services.iter().map(|s| s.name).collect();
        record(
            &self.calls,
            format!("apply_image:{image}:[{}]", names.join(", ")),
        );
        Ok(())
    }

    fn apply_shell_image(&self, image: &str) -> Result<(), ControlPlaneError> {
        record(&self.calls, format!("apply_shell_image:{image}"));
        Ok(())
    }
}

/// Cleanup targets fake that records handler names in call order.
#[derive(Debug, Default, Clone)]
pub struct RecordingTargets {
    calls: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
}

impl RecordingTargets {
    /// Fake whose named handler fails on every invocation.
    pub fn failing_on(handler: &'static str) -> Self {
        Self {
            calls: Arc::default(),
            fail_on: Some(handler),
        }
    }

    /// Recorded handler names.
    pub fn calls(&self) -> Vec<String> {
        snapshot(&self.calls)
    }

    fn call(&self, handler: &'static str) -> Result<(), MaintenanceError> {
        record(&self.calls, handler.to_string());
        if self.fail_on == Some(handler) {
            Err(ControlPlaneError::Rejected {
                operation: "maintenance",
                target: handler.to_string(),
                status: 500,
            }
            .into())
        } else {
            Ok(())
        }
    }
}

impl CleanupTargets for RecordingTargets {
    fn clean_log(&self, _services: &[Service]) -> Result<(), MaintenanceError> {
        self.call("clean_log")
    }

    fn clean_cache(&self, _target: Option<&str>, _force: bool) -> Result<(), MaintenanceError> {
        self.call("clean_cache")
    }

    fn clean_journal(&self) -> Result<(), MaintenanceError> {
        self.call("clean_journal")
    }

    fn clean_coordination_store(&self, _targets: &[String]) -> Result<(), MaintenanceError> {
        self.call("clean_coordination_store")
    }

    fn update_primary_tables(&self) -> Result<(), MaintenanceError> {
        self.call("update_primary_tables")
    }

    fn clean_secondary_tables(&self, _targets: &[String]) -> Result<(), MaintenanceError> {
        self.call("clean_secondary_tables")
    }

    fn update_secondary_tables(&self) -> Result<(), MaintenanceError> {
        self.call("update_secondary_tables")
    }

    fn clean_cdc_garbage(&self) -> Result<(), MaintenanceError> {
        self.call("clean_cdc_garbage")
    }
}

/// Bytes every fake artifact is written with.
pub const FAKE_ARTIFACT: &[u8] = b"binary-bytes";

/// Build server fake: fixed branch, canned change log, artifacts written
/// locally so transfers and checksums really happen.
#[derive(Debug, Clone)]
pub struct FakeBuildServer {
    branch: String,
    fail_fetch: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeBuildServer {
    /// Fake whose checkout sits on `branch`.
    pub fn new(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            fail_fetch: false,
            calls: Arc::default(),
        }
    }

    /// Fake whose artifact transfers always fail.
    pub fn with_failing_fetch(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            fail_fetch: true,
            calls: Arc::default(),
        }
    }

    /// Recorded calls.
    pub fn calls(&self) -> Vec<String> {
        snapshot(&self.calls)
    }
}

impl BuildServer for FakeBuildServer {
    fn current_branch(&self, _path: &str) -> Result<String, BuildError> {
        record(&self.calls, "current_branch".into());
        Ok(self.branch.clone())
    }

    fn pull(&self, _path: &str) -> Result<(), BuildError> {
        record(&self.calls, "pull".into());
        Ok(())
    }

    fn change_log(&self, _path: &str) -> Result<(String, String), BuildError> {
        record(&self.calls, "change_log".into());
        Ok((
            "2026-08-26 10:00:00 +0000".to_string(),
            "abc1234 fix journal replay\ndef5678 bump codec".to_string(),
        ))
    }

    fn tag_and_push(&self, _path: &str, tag: &str) -> Result<(), BuildError> {
        record(&self.calls, format!("tag_and_push:{tag}"));
        Ok(())
    }

    fn build_binary(&self, _path: &str, name: &str) -> Result<Option<String>, BuildError> {
        record(&self.calls, format!("build_binary:{name}"));
        let digest = Sha256::digest(FAKE_ARTIFACT);
        Ok(Some(digest.iter().map(|b| format!("{b:02x}")).collect()))
    }

    fn fetch(&self, remote: &str, local: &Path) -> Result<(), BuildError> {
        record(&self.calls, format!("fetch:{remote}"));
        if self.fail_fetch {
            return Err(BuildError::CommandFailed {
                program: "scp".into(),
                status: Some(1),
                stderr: "connection reset".into(),
            });
        }
        fs::write(local, FAKE_ARTIFACT)?;
        Ok(())
    }
}

/// Pipeline gate fake that fails a fixed number of probes before reporting
/// green, recording the tags it was asked about.
#[derive(Debug, Default, Clone)]
pub struct ScriptedGate {
    remaining_failures: Arc<Mutex<u32>>,
    probes: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGate {
    /// Gate that reports "running" for the first `failures` probes.
    pub fn failing_first(failures: u32) -> Self {
        Self {
            remaining_failures: Arc::new(Mutex::new(failures)),
            probes: Arc::default(),
        }
    }

    /// Tags the gate was probed with.
    pub fn probes(&self) -> Vec<String> {
        snapshot(&self.probes)
    }
}

impl PipelineGate for ScriptedGate {
    fn pipeline_succeeded(&self, _project_id: u64, tag: &str) -> Result<(), GateError> {
        record(&self.probes, tag.to_string());
        let mut remaining = self
            .remaining_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *remaining > 0 {
            *remaining -= 1;
            Err(GateError::PipelineNotGreen {
                tag: tag.to_string(),
                status: "running".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
