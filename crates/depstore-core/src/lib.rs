mod cascade;
mod graph;
mod lockfile;
mod manifest;

pub use cascade::{cascade, cascade_with_stats, CascadeOutcome};
pub use graph::{Graph, GraphError, Node, PkgId, ROOT_ID};
pub use lockfile::{Lockfile, LOCKFILE_VERSION};
pub use manifest::{
    remove_dependency_names, BinField, ManifestDirectories, ProjectManifest, SaveType,
};

#[cfg(test)]
mod tests;
