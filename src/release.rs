//! Release pipeline building blocks.
//!
//! The pipeline walks `Idle -> Built -> Tagged -> Gated -> Applied`; each
//! state is reachable only from its predecessor and transitions are logged so
//! a retried invocation can see where the previous one stopped. The version
//! stamp and change-log steps are shared between the binary build and the
//! image build, which differ only in the tag suffix used when no build number
//! is supplied and in whether a remote make step follows.
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use strum_macros::AsRefStr;
use tracing::info;

use crate::error::{BuildError, MaintenanceError};
use crate::vcs::BuildServer;

/// Build-and-release settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Build server host.
    pub server: String,
    /// Build server user.
    pub user: String,
    /// Identity file for the build server, if password-less auth is not set up.
    #[serde(default)]
    pub key_file: Option<String>,
    /// Project checkout path on the build server.
    pub project_path: String,
    /// CI build number used in the version tag. When absent, the tag gets a
    /// `-private` (binary) or `-notest` (image) suffix instead.
    #[serde(default)]
    pub build_num: Option<String>,
    /// Pull latest sources and write a change log before building.
    #[serde(default)]
    pub pull: bool,
    /// Tag the revision and push the tag.
    #[serde(default)]
    pub tag: bool,
    /// Run the remote make step and fetch the produced binaries.
    #[serde(default)]
    pub make: bool,
    /// Local directory under which per-tag artifact directories are created.
    pub local_bin_path: String,
}

/// Named pipeline states, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReleaseState {
    /// Nothing has happened yet.
    Idle,
    /// Version stamped and binaries (if requested) built.
    Built,
    /// Revision tagged and pushed.
    Tagged,
    /// Waiting on, or passed, the CI gate.
    Gated,
    /// Image applied to the running cluster.
    Applied,
}

/// Logs a pipeline state transition.
pub fn log_transition(state: ReleaseState, detail: &str) {
    info!(state = state.as_ref(), "{detail}");
}

/// Suffix policy for version tags derived without a build number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSuffix {
    /// Binary builds made outside CI.
    Private,
    /// Image builds made outside CI.
    NoTest,
}

impl TagSuffix {
    fn as_str(&self) -> &'static str {
        match self {
            TagSuffix::Private => "-private",
            TagSuffix::NoTest => "-notest",
        }
    }
}

/// A stamped build: version tag plus the branch it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    /// Version tag: `<UTC timestamp>-<branch>` plus build number or suffix.
    pub tag: String,
    /// Branch the tag was derived from.
    pub branch: String,
}

/// A completed build phase: the stamp, where its artifacts live locally, and
/// the change log captured alongside them.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    /// The version stamp.
    pub stamp: Stamp,
    /// Local per-tag artifact directory.
    pub local_dir: PathBuf,
    /// Change-log text written with the artifacts, when sources were pulled.
    pub change_log: Option<String>,
}

/// Derives the version tag from the current UTC time and the branch checked
/// out on the build server.
pub fn stamp(
    vcs: &dyn BuildServer,
    build: &BuildConfig,
    suffix: TagSuffix,
) -> Result<Stamp, MaintenanceError> {
    let timestamp = Utc::now().format("%Y-%m-%d-%H-%M-%S");
    let branch = vcs.current_branch(&build.project_path)?;
    let tag = match &build.build_num {
        Some(num) => format!("{timestamp}-{branch}-{num}"),
        None => format!("{timestamp}-{branch}{}", suffix.as_str()),
    };
    Ok(Stamp { tag, branch })
}

/// Label used on the version line of the change-log file.
#[derive(Debug, Clone, Copy)]
pub enum ChangeLogLabel {
    /// Binary builds write `Version:<tag>`.
    Version,
    /// Image builds write `Version/Tag:<tag>`.
    VersionTag,
}

impl ChangeLogLabel {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeLogLabel::Version => "Version",
            ChangeLogLabel::VersionTag => "Version/Tag",
        }
    }
}

/// Pulls latest sources and writes `change.log` into `local_dir`.
///
/// File format: first line the commit date, then the labelled tag line, then
/// the log text under a `Change logs:` header.
pub fn pull_and_log(
    vcs: &dyn BuildServer,
    build: &BuildConfig,
    local_dir: &Path,
    tag: &str,
    label: ChangeLogLabel,
) -> Result<String, MaintenanceError> {
    vcs.pull(&build.project_path)?;
    let (date, text) = vcs.change_log(&build.project_path)?;

    let path = local_dir.join("change.log");
    info!(path = %path.display(), "writing change log");
    let mut file = File::create(&path)?;
    writeln!(file, "{date}")?;
    writeln!(file, "{}:{tag}", label.as_str())?;
    write!(file, "Change logs:\n{text}")?;
    Ok(text)
}

/// Verifies that the fetched artifact matches the checksum the remote build
/// reported.
pub fn verify_checksum(binary: &str, local: &Path, expected: &str) -> Result<(), BuildError> {
    let bytes = fs::read(local)?;
    let digest = Sha256::digest(&bytes);
    let actual: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    if actual == expected {
        Ok(())
    } else {
        Err(BuildError::ChecksumMismatch {
            binary: binary.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}
