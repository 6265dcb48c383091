//! Profile management.
//!
//! A profile is a named directory under the profiles root holding one guest
//! rootfs. Exactly one profile is active; its rootfs is exposed at the
//! well-known `rootfs` symlink in the data root, which is the only path the
//! guest engine ever sees.
//!
//! Every mutating operation, and every read of the active record, runs under
//! [`ProfileLock`]: an in-process mutex plus an advisory `flock` on the data
//! root, so a boot and a user-triggered switch cannot interleave even across
//! processes.

mod name;
mod symlink;
mod transfer;

pub use name::{validate_name, MAX_NAME_LEN, RESERVED_CHARS};
pub use symlink::{read_symlink, replace_symlink};

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use parking_lot::{Mutex, MutexGuard};
use rootswitch_pack::{ArchiveTransport, TarTransport};

use crate::bootstrap::{BootReport, Bootstrap};
use crate::error::{Error, Result};
use crate::fs_util;
use crate::layout::{Layout, DEFAULT_PROFILE, ROOTFS_DIR};
use crate::rom::{self, RomInfo};
use crate::settings::SettingsStore;

/// Exclusive access to the profiles root. Released on drop.
pub struct ProfileLock<'a> {
    _guard: MutexGuard<'a, ()>,
    _file: File,
}

/// Listing entry describing one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    /// Profile name.
    pub name: String,
    /// Whether this is the active profile.
    pub active: bool,
    /// Whether the profile directory exists on disk.
    pub materialized: bool,
    /// Whether a ROM is installed in the profile's rootfs.
    pub rom_installed: bool,
    /// ROM metadata, if present.
    pub rom: Option<RomInfo>,
}

/// Owner of the profile set, the active record, and the active symlink.
pub struct ProfileStore {
    layout: Layout,
    settings: SettingsStore,
    archive: Box<dyn ArchiveTransport>,
    lock: Mutex<()>,
}

impl ProfileStore {
    /// Create a store using `archive` for copy, export and import.
    pub fn new(layout: Layout, archive: Box<dyn ArchiveTransport>) -> Self {
        Self {
            settings: SettingsStore::new(layout.clone()),
            layout,
            archive,
            lock: Mutex::new(()),
        }
    }

    /// Create a store backed by the external archiving tool `tool`.
    pub fn with_tool(layout: Layout, tool: &str) -> Self {
        Self::new(layout, Box::new(TarTransport::new(tool)))
    }

    /// Path layout of this store.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Settings namespaces of the managed profiles.
    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Take the profiles-root lock.
    pub fn lock(&self) -> Result<ProfileLock<'_>> {
        let guard = self.lock.lock();

        let data_root = self.layout.data_root();
        fs::create_dir_all(data_root).map_err(|e| {
            Error::storage(
                "create data root",
                format!("{}: {}", data_root.display(), e),
            )
        })?;

        let path = self.layout.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::storage("open lock file", format!("{}: {}", path.display(), e)))?;
        file.lock_exclusive()
            .map_err(|e| Error::storage("lock profiles", format!("{}: {}", path.display(), e)))?;

        Ok(ProfileLock {
            _guard: guard,
            _file: file,
        })
    }

    /// Names of all profiles: every directory under the profiles root, plus
    /// `default`. Sorted.
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        let root = self.ensure_profiles_root()?;

        let mut names: Vec<String> = fs::read_dir(&root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| validate_name(name).is_ok())
            .collect();

        if !names.iter().any(|n| n == DEFAULT_PROFILE) {
            names.push(DEFAULT_PROFILE.to_string());
        }
        names.sort();
        Ok(names)
    }

    /// Describe every profile, including ROM metadata.
    pub fn describe_profiles(&self) -> Result<Vec<ProfileSummary>> {
        let active = self.get_active_profile()?;
        Ok(self
            .list_profiles()?
            .into_iter()
            .map(|name| {
                let rootfs = self.layout.profile_rootfs_dir(&name);
                ProfileSummary {
                    active: name == active,
                    materialized: self.layout.profile_dir(&name).is_dir(),
                    rom_installed: rom::rom_exists(&rootfs),
                    rom: RomInfo::read(&rootfs),
                    name,
                }
            })
            .collect())
    }

    /// True if the profile directory exists, or `name` is `default`.
    pub fn profile_exists(&self, name: &str) -> bool {
        name == DEFAULT_PROFILE || self.layout.profile_dir(name).is_dir()
    }

    /// The active profile, persisting `default` if none is recorded.
    pub fn get_active_profile(&self) -> Result<String> {
        let _lock = self.lock()?;
        self.active_locked()
    }

    /// `name` if given, otherwise the active profile. A given name must be
    /// valid and must exist.
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<String> {
        match name {
            Some(name) => {
                validate_name(name)?;
                if !self.profile_exists(name) {
                    return Err(Error::NotFound(name.to_string()));
                }
                Ok(name.to_string())
            }
            None => self.get_active_profile(),
        }
    }

    /// Record `name` as active without touching the symlink.
    ///
    /// The symlink stays authoritative: if it points at a different existing
    /// profile, the next [`get_active_profile`](Self::get_active_profile)
    /// rewrites the record to match it. Use
    /// [`switch_profile`](Self::switch_profile) to change what the guest
    /// engine sees.
    pub fn set_active_profile(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let _lock = self.lock()?;
        self.write_active_record(name)
    }

    /// Create an empty profile directory. The rootfs is created lazily.
    pub fn create_profile(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let _lock = self.lock()?;
        self.ensure_profiles_root()?;

        let dir = self.layout.profile_dir(name);
        match fs::create_dir(&dir) {
            Ok(()) => {
                tracing::info!(profile = %name, path = %dir.display(), "profile created");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(Error::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(Error::storage(
                "create profile",
                format!("{}: {}", dir.display(), e),
            )),
        }
    }

    /// Rename a profile with a single directory rename, then move its
    /// settings. An active profile stays active under its new name.
    pub fn rename_profile(&self, old: &str, new: &str) -> Result<()> {
        if old == DEFAULT_PROFILE {
            return Err(Error::protected(old, "the default profile cannot be renamed"));
        }
        validate_name(new)?;
        validate_name(old)?;

        let _lock = self.lock()?;
        let old_dir = self.layout.profile_dir(old);
        let new_dir = self.layout.profile_dir(new);
        if !old_dir.is_dir() {
            return Err(Error::NotFound(old.to_string()));
        }
        if self.profile_exists(new) {
            return Err(Error::AlreadyExists(new.to_string()));
        }

        // Read before the rename: afterwards the record names a missing directory.
        let was_active = self.active_locked()? == old;

        fs::rename(&old_dir, &new_dir).map_err(|e| {
            Error::storage(
                "rename profile",
                format!("{} -> {}: {}", old_dir.display(), new_dir.display(), e),
            )
        })?;

        if let Err(e) = self.settings.rename(old, new) {
            // Settings are copied before the old namespace is cleared, so the
            // old one is still complete.
            self.undo_dir_rename(&new_dir, &old_dir);
            if let Err(cleanup) = self.settings.clear(new) {
                tracing::warn!(profile = %new, error = %cleanup, "cleanup: clear settings");
            }
            return Err(e);
        }

        if was_active {
            if let Err(e) = self.activate_locked(new) {
                self.undo_dir_rename(&new_dir, &old_dir);
                if let Err(undo) = self.settings.rename(new, old) {
                    tracing::error!(profile = %old, error = %undo, "rollback: restore settings");
                }
                if let Err(undo) = self.activate_locked(old) {
                    tracing::error!(profile = %old, error = %undo, "rollback: restore active profile");
                }
                return Err(e);
            }
        }

        tracing::info!(from = %old, to = %new, active = was_active, "profile renamed");
        Ok(())
    }

    /// Delete a profile's settings and directory tree. The default and the
    /// active profile are protected.
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        if name == DEFAULT_PROFILE {
            return Err(Error::protected(name, "the default profile cannot be deleted"));
        }
        validate_name(name)?;

        let _lock = self.lock()?;
        if self.active_locked()? == name {
            return Err(Error::protected(name, "the active profile cannot be deleted"));
        }

        let dir = self.layout.profile_dir(name);
        if !dir.is_dir() {
            return Err(Error::NotFound(name.to_string()));
        }

        self.settings.clear(name)?;
        fs_util::remove_dir_all_if_exists(&dir).map_err(|e| {
            Error::storage("delete profile", format!("{}: {}", dir.display(), e))
        })?;

        tracing::info!(profile = %name, "profile deleted");
        Ok(())
    }

    /// Make `name` the active profile: point the symlink at its rootfs,
    /// then record it. All-or-nothing.
    pub fn switch_profile(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let _lock = self.lock()?;
        if !self.profile_exists(name) {
            return Err(Error::NotFound(name.to_string()));
        }

        let previous = self.active_locked()?;
        self.commit_switch(name, &previous, |name| self.write_active_record(name))?;

        tracing::info!(from = %previous, to = %name, "switched profile");
        Ok(())
    }

    /// Point the active symlink at the active profile and run `bootstrap`
    /// on it, holding the lock throughout so no switch lands in between.
    /// Returns the active profile name with the report.
    pub fn prepare_boot(&self, bootstrap: &Bootstrap) -> Result<(String, BootReport)> {
        let _lock = self.lock()?;
        let active = self.active_locked()?;
        self.point_symlink_at(&active)?;
        let report = bootstrap.prepare(&active)?;
        Ok((active, report))
    }

    /// One-time setup and migration of a legacy single-rootfs layout.
    ///
    /// A real directory at the well-known rootfs path is moved to become the
    /// `default` profile's rootfs. If that destination already has content the
    /// legacy directory is left in place and `MigrationConflict` is returned
    /// after everything else has been set up.
    pub fn initialize_profiles(&self) -> Result<()> {
        let _lock = self.lock()?;
        self.ensure_profiles_root()?;

        let legacy = self.layout.active_symlink_path();
        let default_dir = self.layout.profile_dir(DEFAULT_PROFILE);
        fs::create_dir_all(&default_dir).map_err(|e| {
            Error::storage(
                "create default profile",
                format!("{}: {}", default_dir.display(), e),
            )
        })?;

        if let Ok(meta) = fs::symlink_metadata(&legacy) {
            if meta.is_dir() {
                if let Err(e) = self.migrate_legacy_rootfs(&legacy) {
                    // The legacy directory still occupies the symlink path.
                    self.active_locked()?;
                    return Err(e);
                }
            } else if !meta.file_type().is_symlink() {
                return Err(Error::symlink(
                    &legacy,
                    "path exists and is neither a directory nor a symlink",
                ));
            }
        }

        let active = self.active_locked()?;
        self.point_symlink_at(&active)?;
        tracing::debug!(profile = %active, "profiles initialized");
        Ok(())
    }

    fn migrate_legacy_rootfs(&self, legacy: &Path) -> Result<()> {
        let dest = self.layout.profile_rootfs_dir(DEFAULT_PROFILE);
        let conflict = || Error::MigrationConflict {
            legacy: legacy.display().to_string(),
            destination: dest.display().to_string(),
        };

        match fs_util::dir_is_empty(&dest) {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(
                    legacy = %legacy.display(),
                    destination = %dest.display(),
                    "legacy rootfs not migrated: destination has content"
                );
                return Err(conflict());
            }
            // Destination is a file or unreadable.
            Err(_) => return Err(conflict()),
        }

        // rename(2) replaces an empty directory but not a missing parent.
        fs::rename(legacy, &dest).map_err(|e| {
            Error::storage(
                "migrate legacy rootfs",
                format!("{} -> {}: {}", legacy.display(), dest.display(), e),
            )
        })?;

        tracing::info!(
            legacy = %legacy.display(),
            destination = %dest.display(),
            "migrated legacy rootfs into default profile"
        );
        Ok(())
    }

    /// Active profile under the lock, reconciling the record with the symlink.
    fn active_locked(&self) -> Result<String> {
        let recorded = self.read_active_record()?;

        if let Some(linked) = self.profile_from_symlink() {
            if recorded.as_deref() != Some(linked.as_str()) {
                tracing::warn!(
                    recorded = ?recorded,
                    linked = %linked,
                    "active record disagrees with symlink, trusting symlink"
                );
                self.write_active_record(&linked)?;
                return Ok(linked);
            }
        }

        match recorded {
            Some(name) if self.profile_exists(&name) => Ok(name),
            Some(name) => {
                tracing::warn!(profile = %name, "recorded active profile is gone, using default");
                self.write_active_record(DEFAULT_PROFILE)?;
                Ok(DEFAULT_PROFILE.to_string())
            }
            None => {
                self.write_active_record(DEFAULT_PROFILE)?;
                Ok(DEFAULT_PROFILE.to_string())
            }
        }
    }

    /// Name of the existing profile the active symlink points into, if any.
    fn profile_from_symlink(&self) -> Option<String> {
        let target = read_symlink(&self.layout.active_symlink_path())?;
        let rel = target.strip_prefix(self.layout.profiles_root()).ok()?;

        let mut components = rel.components();
        let name = components.next()?.as_os_str().to_str()?.to_string();
        if components.next()?.as_os_str() != ROOTFS_DIR || components.next().is_some() {
            return None;
        }
        if validate_name(&name).is_err() || !self.layout.profile_dir(&name).is_dir() {
            return None;
        }
        Some(name)
    }

    fn read_active_record(&self) -> Result<Option<String>> {
        let path = self.layout.active_profile_path();
        match fs::read_to_string(&path) {
            Ok(raw) => {
                let name = raw.trim_end_matches('\n');
                if validate_name(name).is_ok() {
                    Ok(Some(name.to_string()))
                } else {
                    tracing::warn!(path = %path.display(), "ignoring malformed active record");
                    Ok(None)
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(
                "read active profile",
                format!("{}: {}", path.display(), e),
            )),
        }
    }

    fn write_active_record(&self, name: &str) -> Result<()> {
        let path = self.layout.active_profile_path();
        fs_util::write_atomic(&path, format!("{}\n", name).as_bytes()).map_err(|e| {
            Error::storage("write active profile", format!("{}: {}", path.display(), e))
        })
    }

    /// Point the symlink at `name`, then persist the choice with `record`.
    /// On any failure the symlink is pointed back at `previous`.
    fn commit_switch<F>(&self, name: &str, previous: &str, record: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<()>,
    {
        let result = self.point_symlink_at(name).and_then(|_| record(name));
        if result.is_err() {
            if let Err(undo) = self.point_symlink_at(previous) {
                tracing::error!(profile = %previous, error = %undo, "rollback: restore active symlink");
            }
        }
        result
    }

    /// Symlink first, then the record. Restoring the symlink on a failed
    /// record write is the caller's job.
    fn activate_locked(&self, name: &str) -> Result<()> {
        self.point_symlink_at(name)?;
        self.write_active_record(name)
    }

    /// Create `name`'s rootfs if needed and point the active symlink at it.
    fn point_symlink_at(&self, name: &str) -> Result<PathBuf> {
        let rootfs = self.layout.profile_rootfs_dir(name);
        fs::create_dir_all(&rootfs).map_err(|e| {
            Error::storage("create profile rootfs", format!("{}: {}", rootfs.display(), e))
        })?;
        replace_symlink(&self.layout.active_symlink_path(), &rootfs)?;
        Ok(rootfs)
    }

    fn ensure_profiles_root(&self) -> Result<PathBuf> {
        let root = self.layout.profiles_root();
        fs::create_dir_all(&root).map_err(|e| {
            Error::storage(
                "create profiles root",
                format!("{}: {}", root.display(), e),
            )
        })?;
        Ok(root)
    }

    fn undo_dir_rename(&self, from: &Path, to: &Path) {
        if let Err(e) = fs::rename(from, to) {
            tracing::error!(
                from = %from.display(),
                to = %to.display(),
                error = %e,
                "rollback: restore profile directory"
            );
        }
    }
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
