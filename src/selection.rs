//! Resolves user-supplied name lists into concrete ordered subsets of the
//! inventory.
//!
//! Resolution is deliberately total: unknown names are dropped without error
//! and duplicates collapse, so the resolver can never fail a run on a typo.
//! Output always preserves inventory order, never input order, which keeps
//! stop/start sequencing deterministic regardless of how the user typed the
//! list. `--strict` turns the dropped-name behavior into a reported error.
use tracing::debug;

use crate::error::SelectionError;
use crate::inventory::{
    BINARIES, CORE_SERVICES, CleanItem, Named, Service, default_clean_items,
};

/// Keyword that selects the entire cleanup catalog.
pub const ALL: &str = "all";

/// Raw, unresolved name lists as they arrive from the CLI.
#[derive(Debug, Default, Clone)]
pub struct SelectionInput {
    /// Service names to include. Empty means every core service.
    pub services: Vec<String>,
    /// Service names to exclude from the resolved service list.
    pub exclude_services: Vec<String>,
    /// Binary names to include. Empty means every deployable binary.
    pub binaries: Vec<String>,
    /// Cleanup item names to include. Empty means no cleanup; `all` means the
    /// full catalog.
    pub clean: Vec<String>,
    /// Report unknown names instead of silently dropping them.
    pub strict: bool,
}

/// Resolved, ordered subsets of the inventory. Built once per invocation and
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Selected services in inventory (start) order.
    pub services: Vec<Service>,
    /// Selected binaries in inventory order.
    pub binaries: Vec<Service>,
    /// Selected cleanup items in catalog order.
    pub clean_items: Vec<CleanItem>,
}

impl Selection {
    /// Resolves raw name lists against the canonical catalogs.
    ///
    /// Infallible unless `input.strict` is set, in which case any name that
    /// matches nothing in its inventory is reported.
    pub fn resolve(input: &SelectionInput) -> Result<Self, SelectionError> {
        if input.strict {
            verify_known("service", &input.services, CORE_SERVICES, false)?;
            verify_known("service", &input.exclude_services, CORE_SERVICES, false)?;
            verify_known("binary", &input.binaries, BINARIES, false)?;
            verify_known("clean item", &input.clean, &default_clean_items(), true)?;
        }

        let mut services = if input.services.is_empty() {
            CORE_SERVICES.to_vec()
        } else {
            filter_by_name(CORE_SERVICES, &input.services)
        };
        if !input.exclude_services.is_empty() {
            services.retain(|s| !input.exclude_services.iter().any(|n| n == s.name));
        }

        let binaries = if input.binaries.is_empty() {
            BINARIES.to_vec()
        } else {
            filter_by_name(BINARIES, &input.binaries)
        };

        // Cleanup defaults to "do nothing", not "do everything".
        let catalog = default_clean_items();
        let clean_items = if input.clean.is_empty() {
            Vec::new()
        } else if input.clean.iter().any(|n| n == ALL) {
            catalog
        } else {
            filter_by_name(&catalog, &input.clean)
        };

        debug!(
            services = services.len(),
            binaries = binaries.len(),
            clean_items = clean_items.len(),
            "resolved selection"
        );

        Ok(Self {
            services,
            binaries,
            clean_items,
        })
    }
}

/// Keeps the inventory items whose name appears in `names`, in inventory
/// order. Duplicate and unknown names have no effect.
fn filter_by_name<T: Named + Clone>(inventory: &[T], names: &[String]) -> Vec<T> {
    inventory
        .iter()
        .filter(|item| names.iter().any(|n| n == item.name()))
        .cloned()
        .collect()
}

/// Strict-mode check: every raw name must exist in the inventory.
fn verify_known<T: Named>(
    kind: &'static str,
    names: &[String],
    inventory: &[T],
    allow_all: bool,
) -> Result<(), SelectionError> {
    let mut unknown: Vec<String> = Vec::new();
    for name in names {
        let known = (allow_all && name.as_str() == ALL)
            || inventory.iter().any(|item| item.name() == name.as_str());
        if !known && !unknown.contains(name) {
            unknown.push(name.clone());
        }
    }

    if unknown.is_empty() {
        Ok(())
    } else {
        Err(SelectionError::UnknownNames {
            kind,
            names: unknown,
        })
    }
}
