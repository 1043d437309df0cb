use std::fs;
use std::io;
use std::path::Path;

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Removes a file, symlink or directory tree. A missing path is not an error.
///
/// Symlinks are unlinked, never followed.
pub fn remove_path_if_exists(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    if metadata.is_dir() {
        match fs::remove_dir_all(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    } else {
        remove_file_if_exists(path)
    }
}

/// Writes `<path>.part` and renames it over `path`.
pub fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("state");
    let part_path = path.with_file_name(format!("{file_name}.part"));

    if let Err(err) = fs::write(&part_path, contents) {
        let _ = fs::remove_file(&part_path);
        return Err(err);
    }
    if let Err(err) = fs::rename(&part_path, path) {
        let _ = fs::remove_file(&part_path);
        return Err(err);
    }
    Ok(())
}
