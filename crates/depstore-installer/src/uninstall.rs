use anyhow::{anyhow, Context, Result};
use depstore_core::{cascade, SaveType, ROOT_ID};
use std::collections::HashSet;

use crate::layout::validate_package_name;

use crate::graph_store::{load_graph, save_graph};
use crate::lock::with_store_lock;
use crate::project::{
    read_lockfile, read_project_manifest, remove_manifest_dependencies, save_lockfile,
};
use crate::prune::{remove_package_bins, remove_project_copies, remove_store_payloads};
use crate::{ProjectLayout, StoreLayout, UninstallOptions, UninstallReport};

/// Removes `names` from the project's direct dependencies together with
/// every package in the store that nothing else needs anymore.
///
/// Fails before taking the store lock when a name is not a valid package
/// name or the project has no manifest.
pub fn uninstall(names: &[String], options: &UninstallOptions) -> Result<UninstallReport> {
    requested_names(names)?;
    let project = ProjectLayout::new(&options.project_dir);
    if read_project_manifest(&project)?.is_none() {
        return Err(anyhow!(
            "no package.json found in {} - cannot uninstall",
            project.root().display()
        ));
    }

    with_store_lock(&options.store, options.lock_stale_after, || {
        uninstall_in_context(names, &project, &options.store, options.save_type)
    })
}

/// The locked section of [`uninstall`]. The caller holds the store lock.
pub fn uninstall_in_context(
    names: &[String],
    project: &ProjectLayout,
    store: &StoreLayout,
    save_type: Option<SaveType>,
) -> Result<UninstallReport> {
    let requested = requested_names(names)?;
    let mut graph = load_graph(project)?;
    let mut report = UninstallReport {
        requested,
        ..UninstallReport::default()
    };

    let root_dependencies = graph
        .root()
        .map(|root| root.dependencies.clone())
        .unwrap_or_default();
    let mut seen_ids = HashSet::new();
    for name in &report.requested {
        match root_dependencies.get(name) {
            Some(pkg_id) => {
                if seen_ids.insert(pkg_id.clone()) {
                    report.resolved.push(pkg_id.clone());
                }
            }
            None => report.skipped.push(name.clone()),
        }
    }
    tracing::debug!(
        resolved = ?report.resolved,
        skipped = ?report.skipped,
        "resolved requested dependencies"
    );

    // An id the root still reaches under a name outside the request stays.
    let retained = root_dependencies
        .iter()
        .filter(|(name, _)| !report.requested.contains(*name))
        .map(|(_, pkg_id)| pkg_id)
        .collect::<HashSet<_>>();
    let candidates = report
        .resolved
        .iter()
        .filter(|pkg_id| !retained.contains(pkg_id))
        .cloned()
        .collect::<Vec<_>>();

    report.removed = cascade(&mut graph, &candidates, ROOT_ID)
        .context("dependency graph is inconsistent; store state needs repair")?;

    let bins = remove_package_bins(project, store, &report.removed);
    report.deletion_failures.extend(bins.deletion_failures);
    report.manifest_read_failures = bins.manifest_read_failures;

    graph.remove_root_dependencies(&report.requested);
    save_graph(project, &graph)?;
    tracing::info!(
        removed = report.removed.len(),
        path = %project.graph_path().display(),
        "committed dependency graph"
    );

    report
        .deletion_failures
        .extend(remove_project_copies(project, &report.requested));
    report
        .deletion_failures
        .extend(remove_store_payloads(store, &report.removed));

    if let Some(save_type) = save_type {
        let manifest = remove_manifest_dependencies(
            &project.manifest_path(),
            &report.requested,
            save_type,
        )?;
        report.manifest_updated = true;

        let mut lockfile = read_lockfile(project)?;
        report.lockfile_pruned = lockfile.prune_undeclared(&manifest);
        save_lockfile(project, &lockfile)?;
    }

    Ok(report)
}

/// Deduplicates `names` in request order and rejects any name that would not
/// resolve to a directory directly under `node_modules`.
fn requested_names(names: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(names.len());
    for name in names {
        validate_package_name(name)?;
        if seen.insert(name) {
            unique.push(name.clone());
        }
    }
    Ok(unique)
}

