mod bins;
mod fs_utils;
mod graph_store;
mod layout;
mod lock;
mod project;
mod prune;
mod types;
mod uninstall;

pub use bins::{resolve_executables, PackageBin};
pub use fs_utils::{remove_file_if_exists, remove_path_if_exists};
pub use graph_store::{load_graph, save_graph};
pub use layout::{
    absolute_project_dir, default_store_dir, validate_package_name, ProjectLayout, StoreLayout,
};
pub use lock::{
    acquire_store_lock, current_unix_timestamp, with_store_lock, StoreLock,
    DEFAULT_LOCK_STALE_AFTER,
};
pub use project::{
    read_lockfile, read_package_manifest, read_project_manifest, remove_manifest_dependencies,
    save_lockfile,
};
pub use prune::{
    remove_all_paths, remove_package_bins, remove_project_copies, remove_store_payloads,
    BinPruneOutcome,
};
pub use types::{DeletionFailure, ManifestReadFailure, UninstallOptions, UninstallReport};
pub use uninstall::{uninstall, uninstall_in_context};
