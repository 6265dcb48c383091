//! Canonical on-disk layout.
//!
//! Every path rootswitch touches is computed here. These are pure functions
//! of the data root: nothing in this module performs I/O, and profile names
//! are not validated here (that is the profile store's job).
//!
//! ```text
//! <data-root>/
//! ├── profiles/
//! │   └── <name>/
//! │       ├── rootfs/          # guest filesystem tree
//! │       ├── log.txt          # per-profile kernel log of the current boot
//! │       └── last_kmsg.txt    # per-profile kernel log of the previous boot
//! ├── rootfs -> profiles/<active>/rootfs
//! ├── loader64 -> <absolute loader binary>
//! ├── settings/profile_settings_<name>.json
//! ├── active_profile
//! ├── profiles.lock
//! ├── cache/                   # temporary archives and staging trees
//! ├── socket/
//! ├── log.txt
//! └── last_kmsg.txt
//! ```

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Application directory name under the platform data directory.
pub const APP_DIR: &str = "rootswitch";

/// Name of the profile that always exists.
pub const DEFAULT_PROFILE: &str = "default";

/// Directory holding all profiles.
pub const PROFILES_DIR: &str = "profiles";

/// Rootfs subdirectory of a profile, also the name of the active symlink.
pub const ROOTFS_DIR: &str = "rootfs";

/// Loader alias symlink name.
pub const LOADER_SYMLINK: &str = "loader64";

/// Loader binary file name, shipped next to the executable.
pub const LOADER_FILE: &str = "libloader.so";

/// Settings namespace directory.
pub const SETTINGS_DIR: &str = "settings";

/// Prefix of a profile's settings namespace.
pub const SETTINGS_PREFIX: &str = "profile_settings_";

/// Persisted active-profile record.
pub const ACTIVE_PROFILE_FILE: &str = "active_profile";

/// Advisory lock file guarding the profiles root.
pub const LOCK_FILE: &str = "profiles.lock";

/// Scratch directory for archives and staging trees.
pub const CACHE_DIR: &str = "cache";

/// Process-local socket directory.
pub const SOCKET_DIR: &str = "socket";

/// Kernel-message log of the current boot.
pub const KMSG_FILE: &str = "log.txt";

/// Kernel-message log of the previous boot.
pub const LAST_KMSG_FILE: &str = "last_kmsg.txt";

/// Device-node directories the guest expects under `<rootfs>/dev`.
pub const DEV_SUBDIRS: &[&str] = &["input", "socket", "maps"];

/// Path layout rooted at the application's private data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    data_root: PathBuf,
}

impl Layout {
    /// Create a layout rooted at `data_root`.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// Default data root: `~/.local/share/rootswitch` on Linux.
    pub fn default_data_root() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .ok_or_else(|| Error::Config("could not determine data directory".into()))?;
        Ok(data_dir.join(APP_DIR))
    }

    /// The application's private data root.
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Directory containing one subdirectory per profile.
    pub fn profiles_root(&self) -> PathBuf {
        self.data_root.join(PROFILES_DIR)
    }

    /// Directory owned by profile `name`.
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_root().join(name)
    }

    /// Rootfs tree of profile `name`.
    pub fn profile_rootfs_dir(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(ROOTFS_DIR)
    }

    /// Well-known symlink the guest engine reads. Also the legacy
    /// single-rootfs location.
    pub fn active_symlink_path(&self) -> PathBuf {
        self.data_root.join(ROOTFS_DIR)
    }

    /// Loader alias symlink.
    pub fn loader_symlink_path(&self) -> PathBuf {
        self.data_root.join(LOADER_SYMLINK)
    }

    /// Persisted active-profile record.
    pub fn active_profile_path(&self) -> PathBuf {
        self.data_root.join(ACTIVE_PROFILE_FILE)
    }

    /// Advisory lock file for the profiles root.
    pub fn lock_path(&self) -> PathBuf {
        self.data_root.join(LOCK_FILE)
    }

    /// Directory of settings namespaces.
    pub fn settings_dir(&self) -> PathBuf {
        self.data_root.join(SETTINGS_DIR)
    }

    /// Settings namespace file for profile `name`.
    pub fn settings_path(&self, name: &str) -> PathBuf {
        self.settings_dir()
            .join(format!("{}{}.json", SETTINGS_PREFIX, name))
    }

    /// Scratch directory for temporary archives and staging trees.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_root.join(CACHE_DIR)
    }

    /// Process-local socket directory.
    pub fn socket_dir(&self) -> PathBuf {
        self.data_root.join(SOCKET_DIR)
    }

    /// Global kernel-message log.
    pub fn kmsg_path(&self) -> PathBuf {
        self.data_root.join(KMSG_FILE)
    }

    /// Global previous-boot kernel-message log.
    pub fn last_kmsg_path(&self) -> PathBuf {
        self.data_root.join(LAST_KMSG_FILE)
    }

    /// Per-profile kernel-message log.
    pub fn profile_kmsg_path(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(KMSG_FILE)
    }

    /// Per-profile previous-boot kernel-message log.
    pub fn profile_last_kmsg_path(&self, name: &str) -> PathBuf {
        self.profile_dir(name).join(LAST_KMSG_FILE)
    }

    /// Device-node directory of a rootfs.
    pub fn dev_dir(rootfs: &Path) -> PathBuf {
        rootfs.join("dev")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_paths() {
        let layout = Layout::new("/data/app");
        assert_eq!(layout.profiles_root(), PathBuf::from("/data/app/profiles"));
        assert_eq!(
            layout.profile_dir("work"),
            PathBuf::from("/data/app/profiles/work")
        );
        assert_eq!(
            layout.profile_rootfs_dir("work"),
            PathBuf::from("/data/app/profiles/work/rootfs")
        );
        assert_eq!(layout.active_symlink_path(), PathBuf::from("/data/app/rootfs"));
        assert_eq!(layout.loader_symlink_path(), PathBuf::from("/data/app/loader64"));
    }

    #[test]
    fn test_settings_and_log_paths() {
        let layout = Layout::new("/data/app");
        assert_eq!(
            layout.settings_path("work"),
            PathBuf::from("/data/app/settings/profile_settings_work.json")
        );
        assert_eq!(layout.kmsg_path(), PathBuf::from("/data/app/log.txt"));
        assert_eq!(
            layout.profile_last_kmsg_path("work"),
            PathBuf::from("/data/app/profiles/work/last_kmsg.txt")
        );
    }

    #[test]
    fn test_names_are_not_validated() {
        // Validation belongs to the profile store; layout is total.
        let layout = Layout::new("/data/app");
        assert_eq!(
            layout.profile_dir(""),
            PathBuf::from("/data/app/profiles/")
        );
    }
}
