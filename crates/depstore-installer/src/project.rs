use anyhow::{Context, Result};
use depstore_core::{remove_dependency_names, Lockfile, ProjectManifest, SaveType};
use std::fs;
use std::io;
use std::path::Path;

use crate::fs_utils::write_atomically;
use crate::ProjectLayout;

/// Reads the project's own manifest, `None` when the project has none.
pub fn read_project_manifest(layout: &ProjectLayout) -> Result<Option<ProjectManifest>> {
    let path = layout.manifest_path();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read package manifest: {}", path.display()));
        }
    };
    ProjectManifest::from_json_str(&raw)
        .with_context(|| format!("failed to parse package manifest: {}", path.display()))
        .map(Some)
}

pub fn read_package_manifest(path: &Path) -> Result<ProjectManifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read package manifest: {}", path.display()))?;
    ProjectManifest::from_json_str(&raw)
        .with_context(|| format!("failed to parse package manifest: {}", path.display()))
}

/// Removes `names` from the `save_type` field of the manifest at
/// `manifest_path`, rewrites it and returns the updated manifest.
pub fn remove_manifest_dependencies(
    manifest_path: &Path,
    names: &[String],
    save_type: SaveType,
) -> Result<ProjectManifest> {
    let raw = fs::read_to_string(manifest_path).with_context(|| {
        format!(
            "failed to read package manifest: {}",
            manifest_path.display()
        )
    })?;
    let mut document: serde_json::Value = serde_json::from_str(&raw).with_context(|| {
        format!(
            "failed to parse package manifest: {}",
            manifest_path.display()
        )
    })?;

    let removed = remove_dependency_names(&mut document, names, save_type)?;
    tracing::debug!(
        field = save_type.field_name(),
        removed = ?removed,
        "removed dependency declarations from manifest"
    );

    let mut rendered = serde_json::to_string_pretty(&document)?;
    rendered.push('\n');
    write_atomically(manifest_path, rendered.as_bytes()).with_context(|| {
        format!(
            "failed to write package manifest: {}",
            manifest_path.display()
        )
    })?;

    ProjectManifest::from_value(document)
}

/// Reads the project lockfile; a missing lockfile reads as an empty one.
pub fn read_lockfile(layout: &ProjectLayout) -> Result<Lockfile> {
    let path = layout.lockfile_path();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Lockfile::default()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read lockfile: {}", path.display()));
        }
    };
    Lockfile::from_json_str(&raw)
        .with_context(|| format!("failed to parse lockfile: {}", path.display()))
}

pub fn save_lockfile(layout: &ProjectLayout, lockfile: &Lockfile) -> Result<()> {
    let path = layout.lockfile_path();
    let payload = lockfile.to_json_string()?;
    write_atomically(&path, payload.as_bytes())
        .with_context(|| format!("failed to write lockfile: {}", path.display()))
}
