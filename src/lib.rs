//! Clusterctl is an operations tool for maintaining a deployed distributed
//! storage cluster. It stops, starts, and restarts the cluster's services,
//! runs selective cleanup of stateful subsystems (logs, journals, caches,
//! metadata tables, the coordination store), and drives a build-and-release
//! pipeline that produces versioned binaries and images and promotes them
//! into the running cluster.

/// CI platform collaborator (image gate).
pub mod ci;

/// Cleanup policy engine.
pub mod cleanup;

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Bounded-retry acquisition of external resources.
pub mod connector;

/// Service control plane collaborator.
pub mod control;

/// Metadata database access.
pub mod db;

/// Error handling.
pub mod error;

/// Canonical service, binary, and cleanup catalogs.
pub mod inventory;

/// Maintenance orchestration engine.
pub mod maintenance;

/// Release pipeline building blocks.
pub mod release;

/// Selection resolution over the catalogs.
pub mod selection;

/// Shared fakes for tests.
pub mod test_utils;

/// Remote build server collaborator.
pub mod vcs;
