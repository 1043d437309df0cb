use depstore_core::PkgId;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::bins::resolve_executables;
use crate::fs_utils::remove_path_if_exists;
use crate::project::read_package_manifest;
use crate::{DeletionFailure, ManifestReadFailure, ProjectLayout, StoreLayout};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinPruneOutcome {
    pub removed_stubs: Vec<PathBuf>,
    pub deletion_failures: Vec<DeletionFailure>,
    pub manifest_read_failures: Vec<ManifestReadFailure>,
}

/// Removes the `.bin` stubs every package in `pkg_ids` contributed to the
/// project. Packages are handled in parallel; a failure on one never stops
/// the others.
pub fn remove_package_bins(
    project: &ProjectLayout,
    store: &StoreLayout,
    pkg_ids: &[PkgId],
) -> BinPruneOutcome {
    let per_package = pkg_ids
        .par_iter()
        .map(|pkg_id| remove_bins_for_package(project, store, pkg_id))
        .collect::<Vec<_>>();

    let mut outcome = BinPruneOutcome::default();
    for package in per_package {
        outcome.removed_stubs.extend(package.removed_stubs);
        outcome.deletion_failures.extend(package.deletion_failures);
        outcome
            .manifest_read_failures
            .extend(package.manifest_read_failures);
    }
    outcome
}

fn remove_bins_for_package(
    project: &ProjectLayout,
    store: &StoreLayout,
    pkg_id: &str,
) -> BinPruneOutcome {
    let mut outcome = BinPruneOutcome::default();
    let install_path = store.package_dir(pkg_id);

    let bins = match read_package_manifest(&store.package_manifest_path(pkg_id))
        .and_then(|manifest| resolve_executables(&manifest, &install_path))
    {
        Ok(bins) => bins,
        Err(err) => {
            let reason = format!("{err:#}");
            tracing::warn!(
                pkg_id = %pkg_id,
                error = %reason,
                "could not read package manifest; executables left in place"
            );
            outcome.manifest_read_failures.push(ManifestReadFailure {
                pkg_id: pkg_id.to_string(),
                reason,
            });
            return outcome;
        }
    };

    for bin in bins {
        for stub in project.bin_stub_paths(&bin.name) {
            if stub.symlink_metadata().is_err() {
                continue;
            }
            match remove_deletion_target(&stub) {
                Ok(()) => outcome.removed_stubs.push(stub),
                Err(failure) => outcome.deletion_failures.push(failure),
            }
        }
    }
    outcome
}

/// Deletes the project's top-level copies of `names`.
pub fn remove_project_copies(project: &ProjectLayout, names: &[String]) -> Vec<DeletionFailure> {
    remove_all_paths(
        names
            .iter()
            .map(|name| project.installed_package_dir(name))
            .collect(),
    )
}

/// Deletes the store payload of every package in `pkg_ids`.
pub fn remove_store_payloads(store: &StoreLayout, pkg_ids: &[PkgId]) -> Vec<DeletionFailure> {
    remove_all_paths(
        pkg_ids
            .iter()
            .map(|pkg_id| store.package_dir(pkg_id))
            .collect(),
    )
}

/// Removes every path in parallel and reports the ones that failed.
pub fn remove_all_paths(paths: Vec<PathBuf>) -> Vec<DeletionFailure> {
    paths
        .par_iter()
        .filter_map(|path| remove_deletion_target(path).err())
        .collect()
}

fn remove_deletion_target(path: &Path) -> Result<(), DeletionFailure> {
    remove_path_if_exists(path).map_err(|err| {
        tracing::warn!(path = %path.display(), error = %err, "failed to delete");
        DeletionFailure {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    })
}
