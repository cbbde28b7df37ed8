//! Canonical catalogs of cluster services, deployable binaries, and cleanup items.
//!
//! Catalog order is significant: services are started in the order they appear
//! here and stopped in the reverse order. The catalogs are read-only after
//! process start.
use strum_macros::{AsRefStr, EnumString};

/// A named deployable component of the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Service identity. Unique within a catalog.
    pub name: &'static str,
    /// Path of the service's sources relative to the project root on the
    /// build server.
    pub git_path: &'static str,
}

/// Core cluster services in start order (dependencies first).
pub const CORE_SERVICES: &[Service] = &[
    Service {
        name: "metad",
        git_path: "servers/metad",
    },
    Service {
        name: "journald",
        git_path: "servers/journald",
    },
    Service {
        name: "stored",
        git_path: "servers/stored",
    },
    Service {
        name: "gatewayd",
        git_path: "servers/gatewayd",
    },
    Service {
        name: "indexd",
        git_path: "servers/indexd",
    },
];

/// Deployable binaries produced by the build server.
pub const BINARIES: &[Service] = &[
    Service {
        name: "metad",
        git_path: "servers/metad",
    },
    Service {
        name: "journald",
        git_path: "servers/journald",
    },
    Service {
        name: "stored",
        git_path: "servers/stored",
    },
    Service {
        name: "gatewayd",
        git_path: "servers/gatewayd",
    },
    Service {
        name: "indexd",
        git_path: "servers/indexd",
    },
    Service {
        name: "clustersh",
        git_path: "tools/clustersh",
    },
];

/// Kinds of cleanup items, keyed by their snake_case names on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CleanKind {
    /// Truncate service log files.
    Log,
    /// Drop journal segments (also clears their coordination-store markers).
    Journal,
    /// Drop the storage-node read cache.
    Cache,
    /// Rebuild the primary metadata tables.
    PrimaryTables,
    /// Truncate secondary metadata tables.
    SecondaryTables,
    /// Clear coordination-store subtrees.
    Coordination,
    /// Collect change-capture garbage.
    CdcGc,
}

impl CleanKind {
    /// Whether executing this item changes the on-disk/table format and
    /// therefore requires the one-shot reconciliation pass afterwards.
    ///
    /// `Journal` touches the coordination store too, but only to drop
    /// per-segment markers; it does not count as format-affecting.
    pub fn is_format_affecting(&self) -> bool {
        matches!(
            self,
            CleanKind::PrimaryTables | CleanKind::SecondaryTables | CleanKind::Coordination
        )
    }
}

/// A named maintenance action targeting a stateful subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanItem {
    /// What to clean.
    pub kind: CleanKind,
    /// Handler arguments, passed through verbatim. Empty means "default/all
    /// targets" for handlers that accept targets.
    pub args: Vec<String>,
}

impl CleanItem {
    /// Item with no arguments.
    pub fn new(kind: CleanKind) -> Self {
        Self {
            kind,
            args: Vec::new(),
        }
    }

    /// The item's catalog name.
    pub fn name(&self) -> &'static str {
        match self.kind {
            CleanKind::Log => "log",
            CleanKind::Journal => "journal",
            CleanKind::Cache => "cache",
            CleanKind::PrimaryTables => "primary_tables",
            CleanKind::SecondaryTables => "secondary_tables",
            CleanKind::Coordination => "coordination",
            CleanKind::CdcGc => "cdc_gc",
        }
    }
}

/// The full cleanup catalog, in execution order.
pub fn default_clean_items() -> Vec<CleanItem> {
    vec![
        CleanItem::new(CleanKind::Log),
        CleanItem::new(CleanKind::Journal),
        CleanItem::new(CleanKind::Cache),
        CleanItem::new(CleanKind::PrimaryTables),
        CleanItem::new(CleanKind::SecondaryTables),
        CleanItem::new(CleanKind::Coordination),
        CleanItem::new(CleanKind::CdcGc),
    ]
}

/// Anything with a catalog name, so the selection resolver can stay generic.
pub trait Named {
    /// The catalog name of this item.
    fn name(&self) -> &str;
}

impl Named for Service {
    fn name(&self) -> &str {
        self.name
    }
}

impl Named for CleanItem {
    fn name(&self) -> &str {
        CleanItem::name(self)
    }
}
