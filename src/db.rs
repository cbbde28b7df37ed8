//! Metadata database access.
//!
//! The orchestrator never speaks the database wire protocol itself; it drives
//! a local CQL shell for the handful of truncation statements cleanup needs.
//! Session establishment goes through the bounded-retry connector and the
//! resulting handle is cached for the life of the process.
use std::{process::Command, sync::Arc};

use serde::Deserialize;
use tracing::{debug, info};

use crate::connector::{CachedHandle, RetryPolicy};
use crate::error::{ConnectorError, DbError};

/// Connection settings for the metadata database.
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    /// Contact host for the cluster.
    pub host: String,
    /// CQL native transport port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Keyspace holding the metadata tables.
    pub keyspace: String,
    /// Authentication user.
    pub username: String,
    /// Authentication password.
    pub password: String,
}

fn default_port() -> u16 {
    9042
}

/// A live handle to the metadata database.
///
/// Statements are executed through an external `cqlsh` invocation; the handle
/// itself only carries validated connection settings.
#[derive(Debug)]
pub struct DbSession {
    config: DbConfig,
}

impl DbSession {
    fn new(config: DbConfig) -> Self {
        Self { config }
    }

    /// Executes a single CQL statement.
    pub fn execute(&self, statement: &str) -> Result<(), DbError> {
        debug!(statement, "executing CQL");
        let output = Command::new("cqlsh")
            .arg(&self.config.host)
            .arg(self.config.port.to_string())
            .args(["-u", &self.config.username])
            .args(["-p", &self.config.password])
            .args(["-k", &self.config.keyspace])
            .args(["-e", statement])
            .output()?;

        if output.status.success() {
            Ok(())
        } else {
            Err(DbError::StatementFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    /// Truncates a single table.
    pub fn truncate(&self, table: &str) -> Result<(), DbError> {
        self.execute(&format!("TRUNCATE {table}"))
    }
}

/// Opens database sessions. Swapped out for a fake in tests.
pub trait SessionOpener: Send + Sync {
    /// Attempts to open one session. Called repeatedly by the connector until
    /// it succeeds or the deadline elapses.
    fn open(&self, config: &DbConfig) -> Result<DbSession, DbError>;
}

/// Opener that validates connectivity with a probe query before handing the
/// session out.
#[derive(Debug, Default)]
pub struct CqlShellOpener;

impl SessionOpener for CqlShellOpener {
    fn open(&self, config: &DbConfig) -> Result<DbSession, DbError> {
        let session = DbSession::new(config.clone());
        session.execute("SELECT now() FROM system.local")?;
        info!(host = %config.host, keyspace = %config.keyspace, "database session established");
        Ok(session)
    }
}

/// Injectable provider of the process-wide cached database session.
///
/// Deliberate global-ish state: the session is created lazily on first use,
/// shared by every caller, and never torn down. Creation is serialized so
/// concurrent first callers wait on one acquisition instead of each opening
/// their own.
pub struct SessionProvider {
    config: DbConfig,
    opener: Box<dyn SessionOpener>,
    cache: CachedHandle<DbSession>,
}

impl SessionProvider {
    /// Creates a provider; no connection is attempted until [`session`] is
    /// first called.
    ///
    /// [`session`]: SessionProvider::session
    pub fn new(config: DbConfig, policy: RetryPolicy, opener: Box<dyn SessionOpener>) -> Self {
        Self {
            config,
            opener,
            cache: CachedHandle::new("database session", policy),
        }
    }

    /// Returns the cached session, establishing it under the retry policy on
    /// first use.
    pub fn session(&self) -> Result<Arc<DbSession>, ConnectorError> {
        self.cache
            .get_or_acquire(|| self.opener.open(&self.config))
    }
}
