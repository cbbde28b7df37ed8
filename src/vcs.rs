//! Remote build server collaborator.
//!
//! Binaries are built on a dedicated build host that carries the project
//! checkout. All interaction goes through `ssh`/`scp` child processes; this
//! module does not reimplement the transport.
use std::{
    path::Path,
    process::{Command, Output},
};

use tracing::{debug, info};

use crate::error::BuildError;

/// Operations the release pipeline needs from the build server.
pub trait BuildServer {
    /// Name of the branch currently checked out at `path`.
    fn current_branch(&self, path: &str) -> Result<String, BuildError>;
    /// Fast-forwards the checkout at `path`.
    fn pull(&self, path: &str) -> Result<(), BuildError>;
    /// Returns `(date, text)` of the recent change log at `path`.
    fn change_log(&self, path: &str) -> Result<(String, String), BuildError>;
    /// Creates tag `tag` at `path` and pushes it to the origin.
    fn tag_and_push(&self, path: &str, tag: &str) -> Result<(), BuildError>;
    /// Runs the make step for `name` under `path`. Returns the artifact's
    /// checksum, or `None` when make produced nothing.
    fn build_binary(&self, path: &str, name: &str) -> Result<Option<String>, BuildError>;
    /// Copies `remote` from the build server to `local`.
    fn fetch(&self, remote: &str, local: &Path) -> Result<(), BuildError>;
}

/// Build server reachable over ssh.
#[derive(Debug, Clone)]
pub struct SshBuildServer {
    host: String,
    user: String,
    key_file: Option<String>,
}

impl SshBuildServer {
    /// Creates a client for `user@host`, optionally with an identity file.
    pub fn new(host: &str, user: &str, key_file: Option<&str>) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key_file: key_file.map(str::to_string),
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn run_remote(&self, command: &str) -> Result<String, BuildError> {
        debug!(host = %self.host, command, "running remote command");
        let mut ssh = Command::new("ssh");
        if let Some(key) = &self.key_file {
            ssh.args(["-i", key]);
        }
        let output = ssh
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(self.destination())
            .arg(command)
            .output()
            .map_err(|source| BuildError::Spawn {
                program: "ssh".into(),
                source,
            })?;
        Self::expect_success("ssh", &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn expect_success(program: &str, output: &Output) -> Result<(), BuildError> {
        if output.status.success() {
            Ok(())
        } else {
            Err(BuildError::CommandFailed {
                program: program.into(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

impl BuildServer for SshBuildServer {
    fn current_branch(&self, path: &str) -> Result<String, BuildError> {
        self.run_remote(&format!("git -C {path} rev-parse --abbrev-ref HEAD"))
    }

    fn pull(&self, path: &str) -> Result<(), BuildError> {
        info!(path, "pulling latest sources");
        self.run_remote(&format!("git -C {path} pull --ff-only"))?;
        Ok(())
    }

    fn change_log(&self, path: &str) -> Result<(String, String), BuildError> {
        let date = self.run_remote(&format!("git -C {path} log -1 --format=%cd --date=iso"))?;
        let text = self.run_remote(&format!("git -C {path} log -20 --format='%h %s'"))?;
        Ok((date, text))
    }

    fn tag_and_push(&self, path: &str, tag: &str) -> Result<(), BuildError> {
        info!(tag, "tagging and pushing");
        self.run_remote(&format!("git -C {path} tag {tag}"))?;
        self.run_remote(&format!("git -C {path} push origin {tag}"))?;
        Ok(())
    }

    fn build_binary(&self, path: &str, name: &str) -> Result<Option<String>, BuildError> {
        info!(binary = name, path, "building binary remotely");
        if self.run_remote(&format!("make -C {path} {name}")).is_err() {
            return Ok(None);
        }
        // sha256sum prints "<digest>  <file>".
        let line = self.run_remote(&format!("sha256sum {path}/{name}"))?;
        Ok(line.split_whitespace().next().map(str::to_string))
    }

    fn fetch(&self, remote: &str, local: &Path) -> Result<(), BuildError> {
        debug!(remote, local = %local.display(), "fetching artifact");
        let mut scp = Command::new("scp");
        if let Some(key) = &self.key_file {
            scp.args(["-i", key]);
        }
        let output = scp
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(format!("{}:{remote}", self.destination()))
            .arg(local)
            .output()
            .map_err(|source| BuildError::Spawn {
                program: "scp".into(),
                source,
            })?;
        Self::expect_success("scp", &output)
    }
}
