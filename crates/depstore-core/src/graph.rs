use std::collections::{btree_map, BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier of one resolved package instance in the store.
pub type PkgId = String;

/// Graph key of the project itself.
pub const ROOT_ID: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("graph node '{id}' is referenced but missing from the graph")]
    MissingNode { id: PkgId },
    #[error("graph node '{target}' does not list '{referrer}' as a dependent")]
    MissingBackEdge { referrer: PkgId, target: PkgId },
    #[error("graph node '{target}' lists '{dependent}' as a dependent without an edge back")]
    StaleDependent { dependent: PkgId, target: PkgId },
    #[error("root graph entry must not have dependents")]
    RootHasDependents,
}

/// One resolved package in the graph.
///
/// Empty collections are the in-memory form of an absent field and are never
/// serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, PkgId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependents: BTreeSet<PkgId>,
}

impl Node {
    pub fn with_dependencies<I, K, V>(dependencies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PkgId>,
    {
        Self {
            dependencies: dependencies
                .into_iter()
                .map(|(name, id)| (name.into(), id.into()))
                .collect(),
            dependents: BTreeSet::new(),
        }
    }

    /// Distinct package ids this node depends on, in dependency-name order.
    pub fn dependency_ids(&self) -> Vec<PkgId> {
        let mut seen = BTreeSet::new();
        let mut ids = Vec::new();
        for id in self.dependencies.values() {
            if seen.insert(id) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graph {
    nodes: BTreeMap<PkgId, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(input: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json_string(&self) -> anyhow::Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn insert(&mut self, id: impl Into<PkgId>, node: Node) -> Option<Node> {
        self.nodes.insert(id.into(), node)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PkgId, Node> {
        self.nodes.iter()
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(ROOT_ID)
    }

    /// Removes `referrer` from `target`'s dependents.
    pub fn detach_edge(&mut self, referrer: &str, target: &str) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(target)
            .ok_or_else(|| GraphError::MissingNode {
                id: target.to_string(),
            })?;
        node.dependents.remove(referrer);
        Ok(())
    }

    /// Deletes a node outright and hands back its last state.
    pub fn remove_node(&mut self, id: &str) -> Result<Node, GraphError> {
        self.nodes
            .remove(id)
            .ok_or_else(|| GraphError::MissingNode { id: id.to_string() })
    }

    /// True when nothing but `referrer` (or nothing at all) depends on `id`.
    pub fn is_free(&self, id: &str, referrer: &str) -> Result<bool, GraphError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::MissingNode { id: id.to_string() })?;
        Ok(match node.dependents.len() {
            0 => true,
            1 => node.dependents.contains(referrer),
            _ => false,
        })
    }

    /// Drops `names` from the root dependency mapping and returns the names
    /// that were actually present.
    ///
    /// A target that is still in the graph loses its root back edge unless
    /// another remaining root name maps to it.
    pub fn remove_root_dependencies<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let Some(root) = self.nodes.get_mut(ROOT_ID) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        let mut targets = Vec::new();
        for name in names {
            let name: &str = name.as_ref();
            if let Some(target) = root.dependencies.remove(name) {
                removed.push(name.to_string());
                targets.push(target);
            }
        }

        let still_mapped = root.dependencies.values().cloned().collect::<BTreeSet<_>>();
        for target in targets {
            if still_mapped.contains(&target) {
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&target) {
                node.dependents.remove(ROOT_ID);
            }
        }
        removed
    }

    /// Moves an entry keyed by `legacy_key` onto [`ROOT_ID`] and rewrites
    /// every dependents set that names it. Returns whether anything changed.
    ///
    /// Dependency names present in both entries resolve to the legacy entry's
    /// package id.
    pub fn normalize_root_key(&mut self, legacy_key: &str) -> bool {
        if legacy_key == ROOT_ID {
            return false;
        }
        let Some(legacy) = self.nodes.remove(legacy_key) else {
            return false;
        };

        let root = self.nodes.entry(ROOT_ID.to_string()).or_default();
        root.dependencies.extend(legacy.dependencies);
        for node in self.nodes.values_mut() {
            if node.dependents.remove(legacy_key) {
                node.dependents.insert(ROOT_ID.to_string());
            }
        }
        true
    }

    /// Checks that dependency edges and dependents sets mirror each other and
    /// that the root is never a dependency target.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self
            .root()
            .is_some_and(|root| !root.dependents.is_empty())
        {
            return Err(GraphError::RootHasDependents);
        }
        for (referrer, node) in &self.nodes {
            for target in node.dependencies.values() {
                let target_node = self
                    .nodes
                    .get(target)
                    .ok_or_else(|| GraphError::MissingNode { id: target.clone() })?;
                if !target_node.dependents.contains(referrer) {
                    return Err(GraphError::MissingBackEdge {
                        referrer: referrer.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        for (target, node) in &self.nodes {
            for dependent in &node.dependents {
                let has_edge = self.nodes.get(dependent).is_some_and(|referrer| {
                    referrer.dependencies.values().any(|id| id == target)
                });
                if !has_edge {
                    return Err(GraphError::StaleDependent {
                        dependent: dependent.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Non-root ids that nothing depends on.
    pub fn unreferenced_ids(&self) -> Vec<PkgId> {
        self.nodes
            .iter()
            .filter(|(id, node)| id.as_str() != ROOT_ID && node.dependents.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }
}
