use anyhow::{anyhow, Context, Result};
use depstore_core::{BinField, ProjectManifest};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// One executable a package contributes to the project's `.bin` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageBin {
    pub name: String,
    pub path: PathBuf,
}

/// Lists the executables `manifest` declares for a package installed at
/// `install_path`.
///
/// Names that would escape the `.bin` directory are skipped.
pub fn resolve_executables(
    manifest: &ProjectManifest,
    install_path: &Path,
) -> Result<Vec<PackageBin>> {
    let declared = match &manifest.bin {
        Some(BinField::Single(rel_path)) => {
            let package_name = manifest
                .name
                .as_deref()
                .ok_or_else(|| anyhow!("package declares a single bin but has no name"))?;
            vec![(unscoped_name(package_name).to_string(), rel_path.clone())]
        }
        Some(BinField::Named(entries)) => entries
            .iter()
            .map(|(name, rel_path)| (name.clone(), rel_path.clone()))
            .collect(),
        None => match manifest
            .directories
            .as_ref()
            .and_then(|directories| directories.bin.as_deref())
        {
            Some(bin_dir) => bin_dir_entries(install_path, bin_dir)?,
            None => Vec::new(),
        },
    };

    let mut bins = Vec::with_capacity(declared.len());
    for (name, rel_path) in declared {
        if let Err(err) = validate_bin_name(&name) {
            tracing::warn!(
                package = manifest.name.as_deref().unwrap_or("<unnamed>"),
                bin = %name,
                error = %err,
                "skipping executable with unsafe name"
            );
            continue;
        }
        bins.push(PackageBin {
            name,
            path: install_path.join(rel_path),
        });
    }
    Ok(bins)
}

fn unscoped_name(package_name: &str) -> &str {
    match package_name.strip_prefix('@') {
        Some(scoped) => scoped
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(package_name),
        None => package_name,
    }
}

fn bin_dir_entries(install_path: &Path, bin_dir: &str) -> Result<Vec<(String, String)>> {
    let dir = install_path.join(validated_relative_bin_dir(bin_dir)?);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read bin directory: {}", dir.display()));
        }
    };

    let mut declared = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read bin directory: {}", dir.display()))?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        let rel_path = Path::new(bin_dir).join(&name).display().to_string();
        declared.push((name, rel_path));
    }
    declared.sort();
    Ok(declared)
}

fn validated_relative_bin_dir(path: &str) -> Result<&Path> {
    let candidate = Path::new(path);
    if candidate.is_absolute()
        || candidate
            .components()
            .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(anyhow!("bin directory must stay inside the package: {path}"));
    }
    Ok(candidate)
}

pub(crate) fn validate_bin_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("bin name must not be empty"));
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(anyhow!("bin name must be a single path segment: {name}"));
    }
    Ok(())
}
