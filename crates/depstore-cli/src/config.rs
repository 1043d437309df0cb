use anyhow::{Context, Result};
use depstore_core::SaveType;
use depstore_installer::{
    absolute_project_dir, default_store_dir, ProjectLayout, StoreLayout, UninstallOptions,
    DEFAULT_LOCK_STALE_AFTER,
};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project-level settings read from `.depstore.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DepstoreConfig {
    pub store_dir: Option<PathBuf>,
    pub lock_stale_secs: Option<u64>,
    pub save: Option<SaveType>,
}

impl DepstoreConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("failed to parse depstore config")
    }

    /// Reads the project's config file; a missing file reads as the defaults.
    pub fn load(project: &ProjectLayout) -> Result<Self> {
        let path = project.config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config: {}", path.display()));
            }
        };
        Self::from_toml_str(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub store_dir: Option<PathBuf>,
    pub lock_stale_secs: Option<u64>,
    pub save_type: Option<SaveType>,
}

/// Absolute project root; defaults to the current directory.
pub fn resolve_project_dir(project_dir: Option<PathBuf>) -> Result<PathBuf> {
    absolute_project_dir(&project_dir.unwrap_or_else(|| PathBuf::from(".")))
}

/// Store root in precedence order: flag, config, platform default. A relative
/// config path is taken relative to the project.
pub fn resolve_store(
    project: &ProjectLayout,
    config: &DepstoreConfig,
    store_dir: Option<PathBuf>,
) -> Result<StoreLayout> {
    let root = match (store_dir, &config.store_dir) {
        (Some(dir), _) => dir,
        (None, Some(dir)) => absolutize(project.root(), dir),
        (None, None) => default_store_dir()?,
    };
    Ok(StoreLayout::new(root))
}

pub fn resolve_uninstall_options(
    project: &ProjectLayout,
    config: &DepstoreConfig,
    overrides: CliOverrides,
) -> Result<UninstallOptions> {
    let store = resolve_store(project, config, overrides.store_dir)?;
    let mut options = UninstallOptions::new(project.root(), store);
    options.lock_stale_after = overrides
        .lock_stale_secs
        .or(config.lock_stale_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_LOCK_STALE_AFTER);
    options.save_type = overrides.save_type.or(config.save);
    Ok(options)
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
