//! Harness wiring the orchestrator to recording fakes.
use std::{path::Path, time::Duration};

use clusterctl::{
    connector::RetryPolicy,
    maintenance::{Maintenance, MaintenanceRequest},
    release::BuildConfig,
    selection::{Selection, SelectionInput},
    test_utils::{FakeBuildServer, RecordingControlPlane, RecordingTargets, ScriptedGate},
};

/// A maintainer bound to fakes, plus handles to inspect them afterwards.
pub struct Harness {
    pub maintainer: Maintenance,
    pub control: RecordingControlPlane,
    pub targets: RecordingTargets,
    pub vcs: FakeBuildServer,
    pub gate: ScriptedGate,
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        interval: Duration::from_millis(5),
        deadline: Duration::from_millis(500),
    }
}

pub fn build_config(bin_dir: &Path) -> BuildConfig {
    BuildConfig {
        server: "build01.example".into(),
        user: "ops".into(),
        key_file: None,
        project_path: "/srv/cluster".into(),
        build_num: None,
        pull: false,
        tag: false,
        make: false,
        local_bin_path: bin_dir.to_string_lossy().into_owned(),
    }
}

pub struct HarnessBuilder {
    input: SelectionInput,
    image: Option<String>,
    build: BuildConfig,
    gate_failures: u32,
    failing_fetch: bool,
    control: Option<RecordingControlPlane>,
}

impl HarnessBuilder {
    pub fn new(bin_dir: &Path) -> Self {
        Self {
            input: SelectionInput::default(),
            image: None,
            build: build_config(bin_dir),
            gate_failures: 0,
            failing_fetch: false,
            control: None,
        }
    }

    pub fn input(mut self, input: SelectionInput) -> Self {
        self.input = input;
        self
    }

    pub fn image(mut self, image: &str) -> Self {
        self.image = Some(image.to_string());
        self
    }

    pub fn build(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    pub fn gate_failures(mut self, failures: u32) -> Self {
        self.gate_failures = failures;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.failing_fetch = true;
        self
    }

    pub fn control(mut self, control: RecordingControlPlane) -> Self {
        self.control = Some(control);
        self
    }

    pub fn finish(self) -> Harness {
        let selection = Selection::resolve(&self.input).expect("selection resolves");
        let control = self.control.unwrap_or_default();
        let targets = RecordingTargets::default();
        let vcs = if self.failing_fetch {
            FakeBuildServer::with_failing_fetch("main")
        } else {
            FakeBuildServer::new("main")
        };
        let gate = ScriptedGate::failing_first(self.gate_failures);

        let request = MaintenanceRequest {
            selection,
            image: self.image,
            build: self.build,
            registry: "registry.local/cluster/core".into(),
            ci_project: 25,
            retry: fast_retry(),
        };

        let maintainer = Maintenance::new(
            request,
            Box::new(control.clone()),
            Box::new(targets.clone()),
            Box::new(vcs.clone()),
            Box::new(gate.clone()),
        );

        Harness {
            maintainer,
            control,
            targets,
            vcs,
            gate,
        }
    }
}
