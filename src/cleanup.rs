//! Cleanup policy engine.
//!
//! Executes a resolved list of cleanup items in catalog order, fail-fast.
//! Items whose handlers change table/schema format mark the pass; once the
//! whole loop completes, a single reconciliation step runs if any such item
//! executed. Selecting several format-affecting items together still costs
//! exactly one reconciliation.
use std::{sync::Arc, time::Duration};

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::db::SessionProvider;
use crate::error::{ControlPlaneError, MaintenanceError};
use crate::inventory::{CleanItem, CleanKind, Service};

/// Per-item cleanup handlers plus the deferred reconciliation pass.
///
/// Handlers that take targets treat an empty list as "default/all targets".
pub trait CleanupTargets {
    /// Truncates log files for the given services.
    fn clean_log(&self, services: &[Service]) -> Result<(), MaintenanceError>;
    /// Drops the storage-node read cache. `None` target means every node.
    fn clean_cache(&self, target: Option<&str>, force: bool) -> Result<(), MaintenanceError>;
    /// Drops journal segments.
    fn clean_journal(&self) -> Result<(), MaintenanceError>;
    /// Clears coordination-store subtrees.
    fn clean_coordination_store(&self, targets: &[String]) -> Result<(), MaintenanceError>;
    /// Rebuilds the primary metadata tables.
    fn update_primary_tables(&self) -> Result<(), MaintenanceError>;
    /// Truncates the named secondary metadata tables (all when empty).
    fn clean_secondary_tables(&self, targets: &[String]) -> Result<(), MaintenanceError>;
    /// Reconciliation pass run once after format-affecting items.
    fn update_secondary_tables(&self) -> Result<(), MaintenanceError>;
    /// Collects change-capture garbage.
    fn clean_cdc_garbage(&self) -> Result<(), MaintenanceError>;
}

/// Runs the selected cleanup items against `targets`.
///
/// The first handler error aborts the loop and skips reconciliation.
pub fn run_cleanup(
    targets: &dyn CleanupTargets,
    services: &[Service],
    items: &[CleanItem],
) -> Result<(), MaintenanceError> {
    let mut format_affecting = false;

    for item in items {
        info!(item = item.name(), "running cleanup item");
        if item.kind.is_format_affecting() {
            format_affecting = true;
        }
        match item.kind {
            CleanKind::Log => targets.clean_log(services)?,
            CleanKind::Journal => {
                // Journal segments carry coordination-store markers; both go.
                targets.clean_coordination_store(&item.args)?;
                targets.clean_journal()?;
            }
            CleanKind::Cache => {
                targets.clean_cache(item.args.first().map(String::as_str), false)?
            }
            CleanKind::PrimaryTables => targets.update_primary_tables()?,
            CleanKind::SecondaryTables => targets.clean_secondary_tables(&item.args)?,
            CleanKind::Coordination => targets.clean_coordination_store(&item.args)?,
            CleanKind::CdcGc => targets.clean_cdc_garbage()?,
        }
    }

    if format_affecting {
        info!("reconciling secondary metadata tables");
        targets.update_secondary_tables()?;
    }
    Ok(())
}

/// Table lists used by the metadata-table handlers.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Primary (format-defining) metadata tables.
    #[serde(default = "default_primary_tables")]
    pub primary_tables: Vec<String>,
    /// Secondary (derived) metadata tables.
    #[serde(default = "default_secondary_tables")]
    pub secondary_tables: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            primary_tables: default_primary_tables(),
            secondary_tables: default_secondary_tables(),
        }
    }
}

fn default_primary_tables() -> Vec<String> {
    vec!["volume_map".into(), "extent_map".into(), "placement".into()]
}

fn default_secondary_tables() -> Vec<String> {
    vec!["usage_stats".into(), "gc_progress".into(), "index_state".into()]
}

/// Concrete [`CleanupTargets`] for a running cluster: maintenance endpoints
/// on the cluster manager for node-local state, the cached database session
/// for table truncation.
pub struct ClusterTargets {
    endpoint: String,
    client: Client,
    sessions: Arc<SessionProvider>,
    tables: CleanupConfig,
}

impl ClusterTargets {
    /// Builds the cleanup collaborator.
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        sessions: Arc<SessionProvider>,
        tables: CleanupConfig,
    ) -> Result<Self, MaintenanceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ControlPlaneError::Transport)?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            sessions,
            tables,
        })
    }

    fn post(&self, path: &str, body: serde_json::Value) -> Result<(), MaintenanceError> {
        let response = self
            .client
            .post(format!("{}/maintenance/{path}", self.endpoint))
            .json(&body)
            .send()
            .map_err(ControlPlaneError::Transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ControlPlaneError::Rejected {
                operation: "maintenance",
                target: path.to_string(),
                status: response.status().as_u16(),
            }
            .into())
        }
    }
}

impl CleanupTargets for ClusterTargets {
    fn clean_log(&self, services: &[Service]) -> Result<(), MaintenanceError> {
        let names: Vec<&str> = services.iter().map(|s| s.name).collect();
        self.post("logs", json!({ "services": names }))
    }

    fn clean_cache(&self, target: Option<&str>, force: bool) -> Result<(), MaintenanceError> {
        self.post("cache", json!({ "target": target, "force": force }))
    }

    fn clean_journal(&self) -> Result<(), MaintenanceError> {
        self.post("journal", json!({}))
    }

    fn clean_coordination_store(&self, targets: &[String]) -> Result<(), MaintenanceError> {
        self.post("coordination", json!({ "subtrees": targets }))
    }

    fn update_primary_tables(&self) -> Result<(), MaintenanceError> {
        let session = self.sessions.session()?;
        for table in &self.tables.primary_tables {
            session.truncate(table)?;
        }
        Ok(())
    }

    fn clean_secondary_tables(&self, targets: &[String]) -> Result<(), MaintenanceError> {
        let session = self.sessions.session()?;
        let selected: Vec<&String> = if targets.is_empty() {
            self.tables.secondary_tables.iter().collect()
        } else {
            self.tables
                .secondary_tables
                .iter()
                .filter(|t| targets.contains(t))
                .collect()
        };
        for table in selected {
            session.truncate(table)?;
        }
        Ok(())
    }

    fn update_secondary_tables(&self) -> Result<(), MaintenanceError> {
        // Schema reconciliation is the manager's job; it owns the DDL.
        self.post("tables/reconcile", json!({}))
    }

    fn clean_cdc_garbage(&self) -> Result<(), MaintenanceError> {
        self.post("cdc-gc", json!({}))
    }
}
