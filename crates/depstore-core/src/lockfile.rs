use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::manifest::ProjectManifest;

pub const LOCKFILE_VERSION: u32 = 1;

/// Resolved dependency record of one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lockfile {
    #[serde(default = "lockfile_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            version: lockfile_version(),
            dependencies: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl Lockfile {
    pub fn from_json_str(input: &str) -> anyhow::Result<Self> {
        let lockfile: Self = serde_json::from_str(input).context("failed to parse lockfile")?;
        if lockfile.version != LOCKFILE_VERSION {
            bail!(
                "unsupported lockfile version {} (expected {})",
                lockfile.version,
                LOCKFILE_VERSION
            );
        }
        Ok(lockfile)
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }

    /// Drops entries the manifest no longer declares directly and returns
    /// their names.
    ///
    /// This is a shallow check: an entry still required transitively by a
    /// surviving dependency is dropped all the same.
    pub fn prune_undeclared(&mut self, manifest: &ProjectManifest) -> Vec<String> {
        let mut dropped = Vec::new();
        self.dependencies.retain(|name, _| {
            let keep = manifest.is_dependent_on(name);
            if !keep {
                dropped.push(name.clone());
            }
            keep
        });
        dropped
    }
}

fn lockfile_version() -> u32 {
    LOCKFILE_VERSION
}
