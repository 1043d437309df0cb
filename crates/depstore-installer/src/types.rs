use depstore_core::{PkgId, SaveType};
use std::path::PathBuf;
use std::time::Duration;

use crate::lock::DEFAULT_LOCK_STALE_AFTER;
use crate::StoreLayout;

/// A path that could not be removed. The sibling deletions still ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// A removed package whose own manifest could not be read, so its
/// executables were not looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReadFailure {
    pub pkg_id: PkgId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallOptions {
    pub project_dir: PathBuf,
    pub store: StoreLayout,
    pub lock_stale_after: Duration,
    pub save_type: Option<SaveType>,
}

impl UninstallOptions {
    pub fn new(project_dir: impl Into<PathBuf>, store: StoreLayout) -> Self {
        Self {
            project_dir: project_dir.into(),
            store,
            lock_stale_after: DEFAULT_LOCK_STALE_AFTER,
            save_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    /// Requested names, deduplicated, in request order.
    pub requested: Vec<String>,
    /// Requested names that were not direct dependencies of the project.
    pub skipped: Vec<String>,
    /// Package ids the requested names resolved to.
    pub resolved: Vec<PkgId>,
    /// Every package id dropped from the graph, in removal order.
    pub removed: Vec<PkgId>,
    pub deletion_failures: Vec<DeletionFailure>,
    pub manifest_read_failures: Vec<ManifestReadFailure>,
    pub manifest_updated: bool,
    /// Lockfile entries dropped because the manifest no longer declares them.
    pub lockfile_pruned: Vec<String>,
}

impl UninstallReport {
    pub fn is_clean(&self) -> bool {
        self.deletion_failures.is_empty() && self.manifest_read_failures.is_empty()
    }
}
