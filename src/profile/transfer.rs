//! Copy, export and import: the operations that go through the archive
//! transport.
//!
//! All three use scoped temporaries under the cache directory. Archives and
//! staging directories are dropped on every exit path, and a partially
//! materialized target profile is removed before the error is returned.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use rootswitch_pack::PackEntry;
use tempfile::{NamedTempFile, TempDir};

use super::{validate_name, ProfileStore};
use crate::error::{Error, Result};
use crate::fs_util;
use crate::layout::DEFAULT_PROFILE;
use crate::settings::codec::{self, PREFERENCES_FILE};

/// Buffer size for copying an incoming archive stream to disk.
pub const STREAM_BUFFER_SIZE: usize = 8 * 1024;

const TEMP_PREFIX: &str = "rootswitch-";

impl ProfileStore {
    /// Duplicate `source` as `target`, preserving symlinks exactly.
    ///
    /// The source directory is packed into a temporary archive and unpacked
    /// into a staging directory, then moved into place with one rename.
    pub fn copy_profile(&self, source: &str, target: &str) -> Result<()> {
        validate_name(source)?;
        validate_name(target)?;

        let _lock = self.lock()?;
        let source_dir = self.source_dir(source)?;
        if self.profile_exists(target) {
            return Err(Error::AlreadyExists(target.to_string()));
        }
        let target_dir = self.layout.profile_dir(target);

        let cache = self.ensure_cache_dir()?;
        let archive = temp_archive(&cache, "copy")?;
        let staging = temp_dir(&cache, "copy")?;

        self.archive.pack(&source_dir, archive.path())?;
        self.archive.unpack(archive.path(), staging.path())?;

        let unpacked = staging.path().join(source);
        if !unpacked.is_dir() {
            return Err(Error::storage(
                "copy profile",
                format!("archive of '{}' did not contain its directory", source),
            ));
        }
        fs::rename(&unpacked, &target_dir).map_err(|e| {
            Error::storage(
                "copy profile",
                format!("{} -> {}: {}", unpacked.display(), target_dir.display(), e),
            )
        })?;

        if let Err(e) = self.settings.copy(source, target) {
            self.discard_profile(target);
            return Err(e);
        }

        tracing::info!(from = %source, to = %target, "profile copied");
        Ok(())
    }

    /// Write `name` to a single archive at `dest`: the rootfs tree at the
    /// archive root plus a `preference.xml` settings document.
    pub fn export_profile(&self, name: &str, dest: &Path) -> Result<()> {
        validate_name(name)?;

        let _lock = self.lock()?;
        self.source_dir(name)?;
        let dest = absolute(dest)?;

        let cache = self.ensure_cache_dir()?;
        let staging = temp_dir(&cache, "export")?;
        let settings = self.settings.load(name)?;
        fs::write(
            staging.path().join(PREFERENCES_FILE),
            codec::encode(&settings),
        )?;

        let rootfs = absolute(&self.layout.profile_rootfs_dir(name))?;
        let mut entries = Vec::with_capacity(2);
        if rootfs.is_dir() {
            entries.push(PackEntry::new(&rootfs, "."));
        } else {
            tracing::debug!(profile = %name, "no rootfs, exporting settings only");
        }
        entries.push(PackEntry::new(staging.path(), PREFERENCES_FILE));

        // Pack beside `dest`, then rename over it. A failed export leaves
        // `dest` as it was.
        let parent = dest.parent().ok_or_else(|| Error::InvalidPath {
            path: dest.display().to_string(),
            reason: "has no parent directory".into(),
        })?;
        let partial = tempfile::Builder::new()
            .prefix(&format!(".{}export-", TEMP_PREFIX))
            .suffix(".tar")
            .tempfile_in(parent)
            .map_err(|e| {
                Error::storage("export profile", format!("{}: {}", parent.display(), e))
            })?;
        self.archive.pack_entries(partial.path(), &entries)?;
        partial.persist(&dest).map_err(|e| {
            Error::storage("export profile", format!("{}: {}", dest.display(), e.error))
        })?;

        tracing::info!(profile = %name, path = %dest.display(), "profile exported");
        Ok(())
    }

    /// Create profile `name` from an archive produced by
    /// [`export_profile`](Self::export_profile).
    pub fn import_profile<R: Read>(&self, name: &str, mut reader: R) -> Result<()> {
        validate_name(name)?;

        let _lock = self.lock()?;
        if self.profile_exists(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        self.ensure_profiles_root()?;

        let cache = self.ensure_cache_dir()?;
        let mut archive = temp_archive(&cache, "import")?;
        let bytes = copy_stream(&mut reader, archive.as_file_mut())?;
        tracing::debug!(profile = %name, bytes, "buffered import archive");

        let dir = self.layout.profile_dir(name);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::AlreadyExists(name.to_string()));
            }
            Err(e) => {
                return Err(Error::storage(
                    "import profile",
                    format!("{}: {}", dir.display(), e),
                ))
            }
        }

        if let Err(e) = self.populate_import(name, archive.path()) {
            self.discard_profile(name);
            return Err(e);
        }

        tracing::info!(profile = %name, "profile imported");
        Ok(())
    }

    fn populate_import(&self, name: &str, archive: &Path) -> Result<()> {
        let rootfs = absolute(&self.layout.profile_rootfs_dir(name))?;
        fs::create_dir(&rootfs).map_err(|e| {
            Error::storage("import profile", format!("{}: {}", rootfs.display(), e))
        })?;

        self.archive.unpack(archive, &rootfs)?;

        let prefs = rootfs.join(PREFERENCES_FILE);
        let meta = match fs::symlink_metadata(&prefs) {
            Ok(meta) => Some(meta),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let settings = match meta {
            Some(meta) => {
                let settings = if meta.is_file() {
                    codec::decode(&fs::read_to_string(&prefs)?)
                } else {
                    tracing::warn!(path = %prefs.display(), "ignoring settings entry that is not a regular file");
                    Default::default()
                };
                let removed = if meta.is_dir() {
                    fs::remove_dir_all(&prefs)
                } else {
                    fs::remove_file(&prefs)
                };
                removed.map_err(|e| {
                    Error::storage("import profile", format!("{}: {}", prefs.display(), e))
                })?;
                settings
            }
            None => Default::default(),
        };

        self.settings.replace(name, &settings)
    }

    /// Directory of an existing source profile, materializing `default`.
    fn source_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.layout.profile_dir(name);
        if !dir.is_dir() {
            if name != DEFAULT_PROFILE {
                return Err(Error::NotFound(name.to_string()));
            }
            fs::create_dir_all(&dir).map_err(|e| {
                Error::storage("create default profile", format!("{}: {}", dir.display(), e))
            })?;
        }
        absolute(&dir)
    }

    fn ensure_cache_dir(&self) -> Result<PathBuf> {
        let cache = absolute(&self.layout.cache_dir())?;
        fs::create_dir_all(&cache).map_err(|e| {
            Error::storage("create cache dir", format!("{}: {}", cache.display(), e))
        })?;
        Ok(cache)
    }

    /// Roll back a partially created profile.
    fn discard_profile(&self, name: &str) {
        let dir = self.layout.profile_dir(name);
        if let Err(e) = fs_util::remove_dir_all_if_exists(&dir) {
            tracing::error!(profile = %name, path = %dir.display(), error = %e, "rollback: remove profile directory");
        }
        if let Err(e) = self.settings.clear(name) {
            tracing::error!(profile = %name, error = %e, "rollback: clear settings");
        }
    }
}

/// Copy `reader` to `file` through a fixed-size buffer and flush it to disk.
pub fn copy_stream<R: Read + ?Sized>(reader: &mut R, file: &mut fs::File) -> Result<u64> {
    let mut buf = vec![0_u8; STREAM_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        file.write_all(&buf[..n])?;
        total += n as u64;
    }
    file.sync_all()?;
    Ok(total)
}

fn temp_archive(cache: &Path, op: &str) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(&format!("{}{}-", TEMP_PREFIX, op))
        .suffix(".tar")
        .tempfile_in(cache)
        .map_err(|e| Error::storage("create temp archive", e.to_string()))
}

fn temp_dir(cache: &Path, op: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("{}{}-", TEMP_PREFIX, op))
        .tempdir_in(cache)
        .map_err(|e| Error::storage("create staging dir", e.to_string()))
}

/// The archive tool resolves each `-C` relative to the previous one, so
/// every path it sees must be absolute.
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        Error::storage("resolve path", format!("{}: {}", path.display(), e))
    })
}
