//! Small filesystem helpers shared by the stores.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write `contents` to `path` so that readers see either the old or the new
/// file, never a torn one. The data is fsynced before the rename and the
/// parent directory after it.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    sync_dir(parent)
}

/// Fsync a directory so a rename inside it is durable.
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

/// Remove a file, treating "already gone" as success.
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Remove a directory tree without following symlinks inside it.
pub fn remove_dir_all_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// True if `path` exists as a symlink, whatever it points to.
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// True if `path` is a directory with no entries. Missing counts as empty.
pub fn dir_is_empty(path: &Path) -> io::Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        // No temp files left behind.
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_remove_if_exists_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        fs::write(&file, "x").unwrap();
        remove_file_if_exists(&file).unwrap();
        remove_file_if_exists(&file).unwrap();

        let tree = dir.path().join("t");
        fs::create_dir_all(tree.join("a")).unwrap();
        remove_dir_all_if_exists(&tree).unwrap();
        remove_dir_all_if_exists(&tree).unwrap();
        assert!(!tree.exists());
    }

    #[test]
    fn test_remove_dir_all_does_not_follow_links() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("keep"), "x").unwrap();

        let tree = dir.path().join("tree");
        fs::create_dir(&tree).unwrap();
        symlink(&outside, tree.join("link")).unwrap();

        remove_dir_all_if_exists(&tree).unwrap();
        assert!(outside.join("keep").exists());
    }

    #[test]
    fn test_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(dir_is_empty(dir.path()).unwrap());
        assert!(dir_is_empty(&dir.path().join("missing")).unwrap());
        fs::write(dir.path().join("f"), "x").unwrap();
        assert!(!dir_is_empty(dir.path()).unwrap());
        assert!(!is_symlink(dir.path()));
    }
}
