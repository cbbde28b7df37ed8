//! Maintenance orchestration engine.
//!
//! A [`Maintenance`] instance is bound to one resolved selection and drives
//! the service control plane, the cleanup targets, the build server, and the
//! CI gate through multi-phase operations. Every operation is strictly
//! sequential and fail-fast; there is no rollback. A failure mid-sequence
//! leaves the cluster in whatever partial state the failed step produced, and
//! the operator converges by re-running the idempotent phases.
use std::{fs, path::Path};

use tracing::{info, warn};

use crate::ci::PipelineGate;
use crate::cleanup::{CleanupTargets, run_cleanup};
use crate::connector::{self, RetryPolicy};
use crate::control::ControlPlane;
use crate::error::{BuildError, GateError, MaintenanceError};
use crate::inventory::Service;
use crate::release::{
    BuildArtifact, BuildConfig, ChangeLogLabel, ReleaseState, TagSuffix, log_transition,
    pull_and_log, stamp, verify_checksum,
};
use crate::selection::Selection;
use crate::vcs::BuildServer;

/// One invocation's unit of work: the resolved selection plus release
/// settings. Built once; only the image reference mutates (set by
/// `make_image`).
#[derive(Debug, Clone)]
pub struct MaintenanceRequest {
    /// Resolved service/binary/cleanup selection.
    pub selection: Selection,
    /// Target image reference of form `registry:tag`, when already known.
    pub image: Option<String>,
    /// Build-and-release settings.
    pub build: BuildConfig,
    /// Image registry that tags are promoted into.
    pub registry: String,
    /// CI project whose pipelines gate images.
    pub ci_project: u64,
    /// Retry discipline for external waits.
    pub retry: RetryPolicy,
}

/// The full maintenance capability set.
pub trait Maintainer {
    /// Runs the selected cleanup items.
    fn cleanup(&self) -> Result<(), MaintenanceError>;
    /// Stops the selected services (reverse order), then cleans up.
    fn stop(&self) -> Result<(), MaintenanceError>;
    /// Starts the selected services (forward order).
    fn start(&self) -> Result<(), MaintenanceError>;
    /// Stop then start; aborts after a stop failure.
    fn restart(&self) -> Result<(), MaintenanceError>;
    /// Builds the selected binaries and stages them locally.
    fn make_binary(&self) -> Result<(), MaintenanceError>;
    /// Tags a release, derives the image reference, and waits on the gate.
    fn make_image(&mut self) -> Result<(), MaintenanceError>;
    /// Applies the gated image to the selected services.
    fn apply_image(&self) -> Result<(), MaintenanceError>;
    /// `make_image` then stop then `apply_image`.
    fn upgrade_core(&mut self) -> Result<(), MaintenanceError>;
}

/// Concrete orchestrator over injected collaborators.
pub struct Maintenance {
    request: MaintenanceRequest,
    control: Box<dyn ControlPlane>,
    targets: Box<dyn CleanupTargets>,
    vcs: Box<dyn BuildServer>,
    gate: Box<dyn PipelineGate>,
}

impl Maintenance {
    /// Binds a request to its collaborators.
    pub fn new(
        request: MaintenanceRequest,
        control: Box<dyn ControlPlane>,
        targets: Box<dyn CleanupTargets>,
        vcs: Box<dyn BuildServer>,
        gate: Box<dyn PipelineGate>,
    ) -> Self {
        Self {
            request,
            control,
            targets,
            vcs,
            gate,
        }
    }

    /// The image reference the request currently points at.
    pub fn image(&self) -> Option<&str> {
        self.request.image.as_deref()
    }

    fn services(&self) -> &[Service] {
        &self.request.selection.services
    }

    /// Builds the selected binaries and returns the staged artifact.
    ///
    /// Failure to create the local artifact directory or the change log is
    /// fatal for this invocation.
    pub fn build_binaries(&self) -> Result<BuildArtifact, MaintenanceError> {
        let stamp = stamp(self.vcs.as_ref(), &self.request.build, TagSuffix::Private)?;
        let local_dir = Path::new(&self.request.build.local_bin_path).join(&stamp.tag);
        fs::create_dir_all(&local_dir)?;

        let change_log = if self.request.build.pull {
            Some(pull_and_log(
                self.vcs.as_ref(),
                &self.request.build,
                &local_dir,
                &stamp.tag,
                ChangeLogLabel::Version,
            )?)
        } else {
            None
        };

        if self.request.build.make {
            for binary in &self.request.selection.binaries {
                let remote_dir =
                    format!("{}/{}", self.request.build.project_path, binary.git_path);
                let checksum = self
                    .vcs
                    .build_binary(&remote_dir, binary.name)?
                    .ok_or_else(|| BuildError::MakeFailed {
                        binary: binary.name.to_string(),
                    })?;

                let local_path = local_dir.join(binary.name);
                let remote_path = format!("{remote_dir}/{}", binary.name);
                self.vcs
                    .fetch(&remote_path, &local_path)
                    .map_err(|err| BuildError::TransferFailed {
                        binary: binary.name.to_string(),
                        detail: err.to_string(),
                    })?;
                verify_checksum(binary.name, &local_path, &checksum)?;
            }
        }

        log_transition(ReleaseState::Built, &format!("local binary path: {}", local_dir.display()));
        Ok(BuildArtifact {
            stamp,
            local_dir,
            change_log,
        })
    }

    /// Waits for the CI gate to report the image's pipeline green.
    ///
    /// Requires a non-empty image reference; the tag is everything after the
    /// last colon. Safe to call repeatedly: a green pipeline stays green.
    fn image_ready(&self) -> Result<(), MaintenanceError> {
        let image = match self.request.image.as_deref() {
            Some(image) if !image.is_empty() => image,
            _ => return Err(GateError::ImageUnset.into()),
        };
        let (_, tag) = image
            .rsplit_once(':')
            .ok_or_else(|| GateError::MalformedImageRef(image.to_string()))?;

        log_transition(ReleaseState::Gated, &format!("waiting for image: {image}"));
        connector::acquire("ci pipeline", self.request.retry, || {
            self.gate.pipeline_succeeded(self.request.ci_project, tag)
        })?;
        info!(image, "image available");
        Ok(())
    }
}

impl Maintainer for Maintenance {
    fn cleanup(&self) -> Result<(), MaintenanceError> {
        run_cleanup(
            self.targets.as_ref(),
            self.services(),
            &self.request.selection.clean_items,
        )
    }

    fn stop(&self) -> Result<(), MaintenanceError> {
        // Dependents go down before their dependencies.
        let stop_order: Vec<Service> = self.services().iter().rev().cloned().collect();
        self.control.stop(&stop_order)?;

        // Shared state is only safe to clean once nothing holds it open.
        self.cleanup()
    }

    fn start(&self) -> Result<(), MaintenanceError> {
        self.control.start(self.services())?;
        Ok(())
    }

    fn restart(&self) -> Result<(), MaintenanceError> {
        // An inconsistent stop must not be masked by a start attempt.
        self.stop()?;
        self.start()
    }

    fn make_binary(&self) -> Result<(), MaintenanceError> {
        self.build_binaries().map(|_| ())
    }

    fn make_image(&mut self) -> Result<(), MaintenanceError> {
        let stamp = stamp(self.vcs.as_ref(), &self.request.build, TagSuffix::NoTest)?;

        if self.request.build.pull {
            let local_dir = Path::new(&self.request.build.local_bin_path).join(&stamp.tag);
            fs::create_dir_all(&local_dir)?;
            pull_and_log(
                self.vcs.as_ref(),
                &self.request.build,
                &local_dir,
                &stamp.tag,
                ChangeLogLabel::VersionTag,
            )?;
        }

        if self.request.build.tag {
            self.vcs
                .tag_and_push(&self.request.build.project_path, &stamp.tag)?;
            log_transition(ReleaseState::Tagged, &format!("pushed tag {}", stamp.tag));
        }

        self.request.image = Some(format!("{}:{}", self.request.registry, stamp.tag));
        self.image_ready()
    }

    fn apply_image(&self) -> Result<(), MaintenanceError> {
        // Idempotent re-check; make_image may have gated long ago.
        self.image_ready()?;

        self.stop()?;

        // Partial-failure window: the cluster may be left stopped with the
        // image half applied. Apply and stop are idempotent, so the operator
        // re-runs to converge.
        let image = self
            .request
            .image
            .as_deref()
            .ok_or(GateError::ImageUnset)?;
        self.control.apply_image(self.services(), image)?;
        self.control.apply_shell_image(image)?;

        self.start()?;
        log_transition(ReleaseState::Applied, &format!("image applied: {image}"));
        Ok(())
    }

    fn upgrade_core(&mut self) -> Result<(), MaintenanceError> {
        self.make_image()?;

        // apply_image stops again; stopping an already-stopped service is a
        // no-op at the control plane.
        self.stop()?;

        if let Err(err) = self.apply_image() {
            warn!("upgrade aborted mid-sequence; cluster state may be partial");
            return Err(err);
        }
        Ok(())
    }
}
