//! Error handling for clusterctl.
use std::time::Duration;
use thiserror::Error;

/// Defines all possible errors that can occur in the maintenance orchestrator.
#[derive(Debug, Error)]
pub enum MaintenanceError {
    /// Error reading or accessing a configuration file.
    #[error("Failed to read config file: {0}")]
    ConfigRead(std::io::Error),

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Error touching the local filesystem (artifact directory, change log).
    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the cluster manager control plane.
    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),

    /// Error from the remote build server.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Error from the CI image gate.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// A bounded-retry wait gave up before the resource became ready.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Error from the metadata database.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Error from strict-mode selection resolution.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Error for poisoned mutex.
    #[error("Mutex is poisoned: {0}")]
    MutexPoison(String),
}

/// Implement the `From` trait to convert a `std::sync::PoisonError` into a `MaintenanceError`.
impl<T> From<std::sync::PoisonError<T>> for MaintenanceError {
    /// Converts a `std::sync::PoisonError` into a `MaintenanceError`.
    fn from(err: std::sync::PoisonError<T>) -> Self {
        MaintenanceError::MutexPoison(err.to_string())
    }
}

/// Error type for strict-mode selection resolution.
///
/// The default resolver is total and never reports unknown names; strict mode
/// turns those silently dropped names into this error instead.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// One or more requested names do not exist in the inventory.
    #[error("Unknown {kind} name(s): {names:?}")]
    UnknownNames {
        /// Which inventory was being resolved (service, binary, clean item).
        kind: &'static str,
        /// The names that matched nothing.
        names: Vec<String>,
    },
}

/// Error type for the bounded-retry connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The deadline elapsed before the resource became available.
    #[error(
        "Gave up waiting for {resource} after {attempts} attempt(s) over {elapsed:?}: {last_error}"
    )]
    DeadlineExceeded {
        /// Human-readable name of the awaited resource.
        resource: String,
        /// Number of acquisition attempts made.
        attempts: u32,
        /// Wall-clock time spent before giving up.
        elapsed: Duration,
        /// The last underlying failure, stringified.
        last_error: String,
    },
}

/// Error type for control plane operations.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// Transport-level failure talking to the cluster manager.
    #[error("Cluster manager request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The cluster manager answered with a non-success status.
    #[error("Cluster manager rejected {operation} for '{target}': HTTP {status}")]
    Rejected {
        /// The operation that was rejected (stop, start, apply_image, ...).
        operation: &'static str,
        /// The service or component the operation targeted.
        target: String,
        /// HTTP status code returned by the manager.
        status: u16,
    },
}

/// Error type for remote build server operations.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to spawn a local helper process (ssh, scp).
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        /// The program that could not be started.
        program: String,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },

    /// A remote command exited with a non-zero status.
    #[error("'{program}' exited with status {status:?}: {stderr}")]
    CommandFailed {
        /// The program that failed.
        program: String,
        /// Exit status code, if the process terminated normally.
        status: Option<i32>,
        /// Captured stderr output.
        stderr: String,
    },

    /// The remote make step produced no artifact for a binary.
    #[error("{binary} make failed")]
    MakeFailed {
        /// The binary that failed to build.
        binary: String,
    },

    /// Retrieving a built binary from the build server failed.
    #[error("Failed to transfer '{binary}': {detail}")]
    TransferFailed {
        /// The binary whose transfer failed.
        binary: String,
        /// Transfer failure detail.
        detail: String,
    },

    /// The fetched artifact does not match the checksum reported by the build.
    #[error("Checksum mismatch for '{binary}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The binary whose checksum did not match.
        binary: String,
        /// Checksum reported by the remote build.
        expected: String,
        /// Checksum of the fetched local file.
        actual: String,
    },

    /// Local I/O failure while staging artifacts.
    #[error("Artifact staging failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for the CI image gate.
#[derive(Debug, Error)]
pub enum GateError {
    /// No image reference has been set on the request.
    #[error("Image name is empty")]
    ImageUnset,

    /// The image reference carries no `:tag` component.
    #[error("Image reference '{0}' has no tag component")]
    MalformedImageRef(String),

    /// Transport-level failure talking to the CI platform.
    #[error("CI request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The CI platform knows no pipeline for the tag yet.
    #[error("No pipeline found for tag '{0}'")]
    PipelineMissing(String),

    /// A pipeline exists but has not (or will never) come up green.
    #[error("Pipeline for tag '{tag}' is {status}")]
    PipelineNotGreen {
        /// The tag whose pipeline was inspected.
        tag: String,
        /// Status the CI platform reported.
        status: String,
    },
}

/// Error type for metadata database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to spawn the CQL shell.
    #[error("Failed to run cql shell: {0}")]
    Spawn(#[from] std::io::Error),

    /// A CQL statement was rejected or the shell exited abnormally.
    #[error("CQL statement failed with status {status:?}: {stderr}")]
    StatementFailed {
        /// Exit status code, if the shell terminated normally.
        status: Option<i32>,
        /// Captured stderr output.
        stderr: String,
    },
}
