use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Path conventions of the shared package store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_dir(&self, pkg_id: &str) -> PathBuf {
        self.root.join(pkg_id)
    }

    pub fn package_manifest_path(&self, pkg_id: &str) -> PathBuf {
        self.package_dir(pkg_id).join("package.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))
    }
}

/// Path conventions of one project that installs from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("package.json")
    }

    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join("depstore-lock.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(".depstore.toml")
    }

    pub fn node_modules_dir(&self) -> PathBuf {
        self.root.join("node_modules")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.node_modules_dir().join(".bin")
    }

    pub fn graph_path(&self) -> PathBuf {
        self.node_modules_dir().join(".graph.json")
    }

    /// Top-level installed copy of `name`; scoped names nest one level.
    pub fn installed_package_dir(&self, name: &str) -> PathBuf {
        name.split('/')
            .fold(self.node_modules_dir(), |path, segment| path.join(segment))
    }

    /// Every file an executable stub named `bin_name` may occupy.
    pub fn bin_stub_paths(&self, bin_name: &str) -> Vec<PathBuf> {
        let stub = self.bin_dir().join(bin_name);
        if cfg!(windows) {
            vec![stub.clone(), stub.with_file_name(format!("{bin_name}.cmd"))]
        } else {
            vec![stub]
        }
    }
}

/// Resolves a relative project directory against the current directory and
/// folds `.` and `..` lexically.
pub fn absolute_project_dir(dir: &Path) -> Result<PathBuf> {
    let joined = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(dir)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    Ok(resolved)
}

/// Accepts `name` or `@scope/name`, where every segment is a plain directory
/// name.
pub fn validate_package_name(name: &str) -> Result<()> {
    let unscoped = match name.strip_prefix('@') {
        Some(scoped) => {
            let Some((scope, rest)) = scoped.split_once('/') else {
                return Err(anyhow!("scoped package name must be '@scope/name': {name}"));
            };
            validate_name_segment(name, scope)?;
            rest
        }
        None => name,
    };
    validate_name_segment(name, unscoped)
}

fn validate_name_segment(name: &str, segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', ':'])
    {
        return Err(anyhow!("invalid package name: {name:?}"));
    }
    Ok(())
}

pub fn default_store_dir() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows store directory")?;
        return Ok(PathBuf::from(app_data).join("Depstore").join("store"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve store directory")?;
    Ok(PathBuf::from(home).join(".depstore").join("store"))
}
