//! Per-boot preparation of the active rootfs.
//!
//! Runs once before the guest engine starts. Everything here either must
//! succeed for the engine to start (directories, the loader symlink) or is
//! best-effort cleanup whose failure is logged and ignored (orphan killing,
//! log rotation).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::layout::{Layout, DEV_SUBDIRS, LOADER_FILE};
use crate::process;
use crate::profile::replace_symlink;

/// What a boot preparation handed off to the guest engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    /// Well-known rootfs path the engine should use.
    pub rootfs: PathBuf,
    /// Loader alias path the engine should use.
    pub loader: PathBuf,
    /// Orphans of a previous boot that were killed.
    pub killed: Vec<libc::pid_t>,
    /// Whether any kernel-message log was rotated.
    pub logs_rotated: bool,
}

/// Boot-time preparation of the active profile.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    layout: Layout,
    loader_path: PathBuf,
}

impl Bootstrap {
    /// Create a bootstrap that links the loader alias to `loader_path`.
    pub fn new(layout: Layout, loader_path: impl Into<PathBuf>) -> Self {
        Self {
            layout,
            loader_path: loader_path.into(),
        }
    }

    /// Create a bootstrap using the loader installed next to the current
    /// executable.
    pub fn from_install(layout: Layout) -> Result<Self> {
        Ok(Self::new(layout, loader_path_from_exe()?))
    }

    /// Absolute loader binary path.
    pub fn loader_path(&self) -> &Path {
        &self.loader_path
    }

    /// Prepare `active_profile`'s rootfs for boot.
    ///
    /// The caller is expected to have pointed the active symlink at
    /// `active_profile` and to hold off switches until this returns;
    /// [`ProfileStore::prepare_boot`](crate::ProfileStore::prepare_boot) does both.
    pub fn prepare(&self, active_profile: &str) -> Result<BootReport> {
        let rootfs = self.layout.profile_rootfs_dir(active_profile);
        tracing::info!(profile = %active_profile, rootfs = %rootfs.display(), "preparing boot");

        let dev = Layout::dev_dir(&rootfs);
        for sub in DEV_SUBDIRS {
            create_dir(&dev.join(sub))?;
        }
        create_dir(&self.layout.socket_dir())?;

        let loader = self.layout.loader_symlink_path();
        replace_symlink(&loader, &self.loader_path)?;

        let killed = process::kill_orphans(&rootfs);

        let global = rotate_log(&self.layout.kmsg_path(), &self.layout.last_kmsg_path());
        let per_profile = rotate_log(
            &self.layout.profile_kmsg_path(active_profile),
            &self.layout.profile_last_kmsg_path(active_profile),
        );

        let report = BootReport {
            rootfs: self.layout.active_symlink_path(),
            loader,
            killed,
            logs_rotated: global || per_profile,
        };
        tracing::debug!(report = ?report, "boot prepared");
        Ok(report)
    }
}

/// `<directory of the current executable>/libloader.so`.
pub fn loader_path_from_exe() -> Result<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| Error::Config(format!("cannot resolve current executable: {}", e)))?;
    let dir = exe
        .parent()
        .ok_or_else(|| Error::Config(format!("executable {} has no parent", exe.display())))?;
    Ok(dir.join(LOADER_FILE))
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| Error::storage("prepare rootfs", format!("{}: {}", path.display(), e)))
}

/// Move `current` over `last`. Returns whether a log was moved.
fn rotate_log(current: &Path, last: &Path) -> bool {
    match fs::rename(current, last) {
        Ok(()) => {
            tracing::debug!(from = %current.display(), to = %last.display(), "rotated log");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::debug!(path = %current.display(), error = %e, "log rotation failed");
            false
        }
    }
}
