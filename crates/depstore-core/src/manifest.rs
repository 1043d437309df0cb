use std::collections::BTreeMap;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dependency field of a project manifest that a save operation edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveType {
    Prod,
    Dev,
    Optional,
}

impl SaveType {
    /// Dev wins over optional, optional wins over prod.
    pub fn from_flags(save: bool, save_dev: bool, save_optional: bool) -> Option<Self> {
        if save_dev {
            Some(Self::Dev)
        } else if save_optional {
            Some(Self::Optional)
        } else if save {
            Some(Self::Prod)
        } else {
            None
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            Self::Prod => "dependencies",
            Self::Dev => "devDependencies",
            Self::Optional => "optionalDependencies",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Dev => "dev",
            Self::Optional => "optional",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BinField {
    Single(String),
    Named(BTreeMap<String, String>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestDirectories {
    pub bin: Option<String>,
}

/// A `package.json`, either the project's own or one inside the store.
///
/// Only the fields the uninstall path reads are typed; everything else is
/// kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<BinField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directories: Option<ManifestDirectories>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_dependencies: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectManifest {
    pub fn from_json_str(input: &str) -> anyhow::Result<Self> {
        serde_json::from_str(input).context("failed to parse package manifest")
    }

    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        serde_json::from_value(value).context("failed to parse package manifest")
    }

    /// True when `name` is declared in any of the direct, dev or optional
    /// dependency fields. Transitive reachability is not considered.
    pub fn is_dependent_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
            || self.dev_dependencies.contains_key(name)
            || self.optional_dependencies.contains_key(name)
    }
}

/// Removes `names` from the `save_type` field of a raw manifest document,
/// dropping the field once it is empty. Other keys keep their order.
pub fn remove_dependency_names<S: AsRef<str>>(
    manifest: &mut Value,
    names: &[S],
    save_type: SaveType,
) -> anyhow::Result<Vec<String>> {
    let document = manifest
        .as_object_mut()
        .ok_or_else(|| anyhow!("package manifest must be a JSON object"))?;
    let field = save_type.field_name();

    let Some(entries) = document.get_mut(field) else {
        return Ok(Vec::new());
    };
    let entries = entries
        .as_object_mut()
        .ok_or_else(|| anyhow!("manifest field '{field}' must be a JSON object"))?;

    let mut removed = Vec::new();
    for name in names {
        let name: &str = name.as_ref();
        if entries.shift_remove(name).is_some() {
            removed.push(name.to_string());
        }
    }
    if entries.is_empty() {
        document.shift_remove(field);
    }
    Ok(removed)
}
