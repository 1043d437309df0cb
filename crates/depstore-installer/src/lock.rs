use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::fs_utils::remove_file_if_exists;
use crate::StoreLayout;

pub const DEFAULT_LOCK_STALE_AFTER: Duration = Duration::from_secs(300);

/// Advisory store-wide lock marker. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = remove_file_if_exists(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to release store lock"
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LockMarker {
    pub(crate) pid: Option<u32>,
    pub(crate) acquired_at_unix: Option<u64>,
}

/// Runs `operation` while holding the store lock.
pub fn with_store_lock<T, F>(store: &StoreLayout, stale_after: Duration, operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let _lock = acquire_store_lock(store, stale_after)?;
    operation()
}

/// Claims the store lock, reclaiming a marker left behind longer than
/// `stale_after` ago.
pub fn acquire_store_lock(store: &StoreLayout, stale_after: Duration) -> Result<StoreLock> {
    store.ensure_base_dirs()?;
    let path = store.lock_path();

    if let Some(lock) = claim_lock_marker(&path)? {
        return Ok(lock);
    }

    let marker = read_lock_marker(&path);
    if !lock_marker_is_stale(&path, marker.as_ref(), stale_after)? {
        let detail = marker
            .and_then(|marker| marker.pid)
            .map(|pid| format!(" (pid={pid})"))
            .unwrap_or_default();
        return Err(anyhow!(
            "store is locked by another operation{detail}: {}",
            path.display()
        ));
    }
    tracing::warn!(path = %path.display(), "reclaiming stale store lock");
    remove_file_if_exists(&path)
        .with_context(|| format!("failed to remove stale store lock: {}", path.display()))?;

    claim_lock_marker(&path)?.ok_or_else(|| {
        anyhow!(
            "store lock was claimed by another operation while reclaiming it: {}",
            path.display()
        )
    })
}

fn claim_lock_marker(path: &Path) -> Result<Option<StoreLock>> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to claim store lock: {}", path.display()));
        }
    };
    let lock = StoreLock {
        path: path.to_path_buf(),
    };

    let payload = format!(
        "pid={}\nacquired_at_unix={}\n",
        std::process::id(),
        current_unix_timestamp()?
    );
    file.write_all(payload.as_bytes())
        .with_context(|| format!("failed to write store lock: {}", path.display()))?;
    file.flush()
        .with_context(|| format!("failed to flush store lock: {}", path.display()))?;

    Ok(Some(lock))
}

fn read_lock_marker(path: &Path) -> Option<LockMarker> {
    let raw = fs::read_to_string(path).ok()?;
    parse_lock_marker(&raw)
}

pub(crate) fn parse_lock_marker(raw: &str) -> Option<LockMarker> {
    let mut pid = None;
    let mut acquired_at_unix = None;
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        match k {
            "pid" => pid = v.parse().ok(),
            "acquired_at_unix" => acquired_at_unix = v.parse().ok(),
            _ => {}
        }
    }

    if pid.is_none() && acquired_at_unix.is_none() {
        return None;
    }
    Some(LockMarker {
        pid,
        acquired_at_unix,
    })
}

fn lock_marker_is_stale(
    path: &Path,
    marker: Option<&LockMarker>,
    stale_after: Duration,
) -> Result<bool> {
    let now = current_unix_timestamp()?;
    let acquired_at = match marker.and_then(|marker| marker.acquired_at_unix) {
        Some(acquired_at) => acquired_at,
        // A marker caught mid-write has no timestamp yet; fall back to mtime.
        None => match fs::metadata(path).and_then(|metadata| metadata.modified()) {
            Ok(modified) => modified
                .duration_since(UNIX_EPOCH)
                .map(|value| value.as_secs())
                .unwrap_or(0),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to inspect store lock: {}", path.display()));
            }
        },
    };

    Ok(now.saturating_sub(acquired_at) >= stale_after.as_secs())
}

pub fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}
