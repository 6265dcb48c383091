//! Process utilities for boot-time cleanup.
//!
//! Guest processes outlive the engine that started them when the host app is
//! killed; they get reparented to init and keep files inside the rootfs busy.
//! Before a new boot these orphans are found through `/proc` and killed.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Process id of init, the parent of every orphan.
pub const INIT_PID: libc::pid_t = 1;

/// Send SIGKILL to a process.
///
/// Returns true if the signal was sent successfully.
pub fn kill(pid: libc::pid_t) -> bool {
    unsafe { libc::kill(pid, libc::SIGKILL) == 0 }
}

/// Snapshot of one `/proc` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcInfo {
    /// Process id.
    pub pid: libc::pid_t,
    /// Parent process id.
    pub ppid: libc::pid_t,
    /// Owner uid.
    pub uid: u32,
    /// Working directory, if readable.
    pub cwd: Option<PathBuf>,
}

/// Extract the parent pid from the contents of `/proc/<pid>/stat`.
///
/// The command name is parenthesised and may itself contain spaces or
/// parentheses, so fields are counted from the last `)`.
pub fn parse_stat_ppid(stat: &str) -> Option<libc::pid_t> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let _state = fields.next()?;
    fields.next()?.parse().ok()
}

/// Read `/proc/<pid>` under `proc_root`. `None` if the process vanished or is
/// unreadable.
pub fn read_proc(proc_root: &Path, pid: libc::pid_t) -> Option<ProcInfo> {
    let dir = proc_root.join(pid.to_string());
    let uid = fs::metadata(&dir).ok()?.uid();
    let stat = fs::read_to_string(dir.join("stat")).ok()?;
    let ppid = parse_stat_ppid(&stat)?;
    let cwd = fs::read_link(dir.join("cwd")).ok();
    Some(ProcInfo {
        pid,
        ppid,
        uid,
        cwd,
    })
}

/// List every process visible under `proc_root`.
pub fn list_processes(proc_root: &Path) -> Vec<ProcInfo> {
    let entries = match fs::read_dir(proc_root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(path = %proc_root.display(), error = %e, "cannot list processes");
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<libc::pid_t>().ok())
        .filter_map(|pid| read_proc(proc_root, pid))
        .collect()
}

/// Select orphans of a previous boot: reparented to init, owned by `uid`,
/// not `self_pid`, and running with a working directory inside `root`.
pub fn select_orphans(
    processes: &[ProcInfo],
    root: &Path,
    uid: u32,
    self_pid: libc::pid_t,
) -> Vec<libc::pid_t> {
    processes
        .iter()
        .filter(|p| p.ppid == INIT_PID && p.uid == uid && p.pid != self_pid)
        .filter(|p| p.cwd.as_deref().is_some_and(|cwd| cwd.starts_with(root)))
        .map(|p| p.pid)
        .collect()
}

/// Kill orphaned processes working inside `rootfs`. Best-effort: failures
/// are logged, never returned. Returns the pids that were signalled.
pub fn kill_orphans(rootfs: &Path) -> Vec<libc::pid_t> {
    // Orphans report their resolved cwd, so compare against the resolved root.
    let root = fs::canonicalize(rootfs).unwrap_or_else(|_| rootfs.to_path_buf());
    let uid = unsafe { libc::geteuid() };
    let self_pid = std::process::id() as libc::pid_t;

    let processes = list_processes(Path::new("/proc"));
    let mut killed = Vec::new();
    for pid in select_orphans(&processes, &root, uid, self_pid) {
        if kill(pid) {
            tracing::info!(pid, "killed orphaned guest process");
            killed.push(pid);
        } else {
            tracing::warn!(pid, error = %std::io::Error::last_os_error(), "failed to kill orphan");
        }
    }
    killed
}
