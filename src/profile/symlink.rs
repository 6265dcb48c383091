//! Atomic symlink replacement.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs_util;

/// Point `link` at `target`, replacing any existing symlink atomically.
///
/// The new link is created under a temporary sibling name and renamed over
/// `link`, so readers see either the old or the new target. A real file or
/// directory at `link` is never replaced.
pub fn replace_symlink(link: &Path, target: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(link) {
        if !meta.file_type().is_symlink() {
            return Err(Error::symlink(link, "path exists and is not a symlink"));
        }
    }

    let tmp = temp_sibling(link)?;
    fs_util::remove_file_if_exists(&tmp).map_err(|e| Error::symlink(&tmp, e))?;
    symlink(target, &tmp).map_err(|e| Error::symlink(&tmp, e))?;

    if let Err(e) = fs::rename(&tmp, link) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            tracing::debug!(path = %tmp.display(), error = %cleanup, "cleanup: remove temp symlink");
        }
        return Err(Error::symlink(link, e));
    }

    tracing::debug!(link = %link.display(), target = %target.display(), "symlink updated");
    Ok(())
}

/// Target of `link`, if it is a symlink.
pub fn read_symlink(link: &Path) -> Option<PathBuf> {
    fs::read_link(link).ok()
}

fn temp_sibling(link: &Path) -> Result<PathBuf> {
    let name = link
        .file_name()
        .ok_or_else(|| Error::symlink(link, "link path has no file name"))?;
    Ok(link.with_file_name(format!(
        ".{}.tmp-{}",
        name.to_string_lossy(),
        std::process::id()
    )))
}
