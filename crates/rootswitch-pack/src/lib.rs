//! Symlink-preserving archive transport for profile trees.
//!
//! Directory trees are duplicated, exported and imported by round-tripping
//! them through an external archiving tool. The tool is always invoked as an
//! argument vector, never through a shell, and every path argument is checked
//! against a deny-list before anything is spawned.
//!
//! # Invocation contract
//!
//! ```text
//! pack:   <tool> -c -f <archive> -C <parent> <entry> [-C <parent> <entry> ...]
//! unpack: <tool> -x -f <archive> -C <dest>
//! ```
//!
//! Neither direction passes `-h`/`--dereference`, so symbolic links are
//! stored and restored as links, including links pointing outside the tree.
//!
//! Every path argument must be absolute. `tar` treats an archive name of the
//! form `host:file` as a remote archive, and each `-C` resolves relative to the
//! previous one.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Default archiving tool binary.
pub const DEFAULT_TOOL: &str = "tar";

/// Characters that may never appear in an argument handed to the tool.
pub const DENIED_CHARS: &[char] = &[
    ';', '&', '|', '$', '`', '<', '>', '(', ')', '\n', '\r', '\0',
];

/// Errors from archive operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    /// An argument would have been unsafe to pass to the tool.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending argument, lossily rendered.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("archive tool exited with code {exit_code}: {stderr}")]
    Tool {
        /// Exit code, or -1 if the tool was killed by a signal.
        exit_code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The tool could not be spawned at all.
    #[error("archive tool '{tool}' unavailable: {source}")]
    Unavailable {
        /// Tool binary that failed to start.
        tool: String,
        /// Spawn error.
        #[source]
        source: io::Error,
    },
}

impl PackError {
    fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, PackError>;

/// One `-C <parent> <entry>` pair of a pack invocation.
#[derive(Debug, Clone, Copy)]
pub struct PackEntry<'a> {
    /// Directory the tool changes into before adding `entry`.
    pub parent: &'a Path,
    /// Entry name relative to `parent` (`.` for the directory contents).
    pub entry: &'a str,
}

impl<'a> PackEntry<'a> {
    /// Create a new pack entry.
    pub fn new(parent: &'a Path, entry: &'a str) -> Self {
        Self { parent, entry }
    }
}

/// Packs directory trees into single-file archives and back.
///
/// Implementations must preserve symbolic links verbatim and must not retry;
/// callers decide whether to surface a failure or roll back.
pub trait ArchiveTransport: Send + Sync {
    /// Pack every entry, in order, into `archive`.
    fn pack_entries(&self, archive: &Path, entries: &[PackEntry<'_>]) -> Result<()>;

    /// Unpack `archive` into the existing directory `dest_dir`.
    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<()>;

    /// Pack `source_dir` (as a single top-level entry named after it) into `archive`.
    fn pack(&self, source_dir: &Path, archive: &Path) -> Result<()> {
        let parent = source_dir.parent().ok_or_else(|| {
            PackError::invalid_path(source_dir.display().to_string(), "has no parent directory")
        })?;
        let entry = source_dir
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                PackError::invalid_path(
                    source_dir.display().to_string(),
                    "has no UTF-8 final component",
                )
            })?;
        self.pack_entries(archive, &[PackEntry::new(parent, entry)])
    }
}

/// Check a single argument against the deny-list.
///
/// Arguments must be UTF-8, non-empty, free of [`DENIED_CHARS`], and must not
/// start with `-` (which the tool would parse as an option).
pub fn validate_arg(arg: &str) -> Result<()> {
    if arg.is_empty() {
        return Err(PackError::invalid_path(arg, "empty argument"));
    }
    if arg.starts_with('-') {
        return Err(PackError::invalid_path(arg, "argument starts with '-'"));
    }
    if let Some(c) = arg.chars().find(|c| DENIED_CHARS.contains(c)) {
        return Err(PackError::invalid_path(
            arg,
            format!("contains disallowed character {:?}", c),
        ));
    }
    Ok(())
}

/// Render an absolute path as a tool argument.
fn path_arg(path: &Path) -> Result<&str> {
    let s = path.to_str().ok_or_else(|| {
        PackError::invalid_path(path.display().to_string(), "path is not valid UTF-8")
    })?;
    validate_arg(s)?;
    if !path.is_absolute() {
        return Err(PackError::invalid_path(s, "path must be absolute"));
    }
    Ok(s)
}

/// [`ArchiveTransport`] backed by an external `tar`-compatible binary.
#[derive(Debug, Clone)]
pub struct TarTransport {
    tool: String,
}

impl Default for TarTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL)
    }
}

impl TarTransport {
    /// Create a transport that invokes `tool`.
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    /// The tool binary this transport invokes.
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Spawn the tool and block until it exits.
    fn run(&self, args: &[&str]) -> Result<()> {
        tracing::debug!(tool = %self.tool, args = ?args, "invoking archive tool");

        let output = Command::new(&self.tool)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| PackError::Unavailable {
                tool: self.tool.clone(),
                source,
            })?;

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(tool = %self.tool, exit_code, stderr = %stderr, "archive tool failed");
            return Err(PackError::Tool { exit_code, stderr });
        }

        Ok(())
    }
}

impl ArchiveTransport for TarTransport {
    fn pack_entries(&self, archive: &Path, entries: &[PackEntry<'_>]) -> Result<()> {
        if entries.is_empty() {
            return Err(PackError::invalid_path(
                archive.display().to_string(),
                "nothing to pack",
            ));
        }

        // Validate everything before spawning anything.
        let archive = path_arg(archive)?;
        let mut args = vec!["-c", "-f", archive];
        for entry in entries {
            let parent = path_arg(entry.parent)?;
            if entry.entry != "." {
                validate_arg(entry.entry)?;
                if entry.entry.contains('/') {
                    return Err(PackError::invalid_path(
                        entry.entry,
                        "entry must be a single path component",
                    ));
                }
            }
            args.extend(["-C", parent, entry.entry]);
        }

        self.run(&args)
    }

    fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let archive = path_arg(archive)?;
        let dest = path_arg(dest_dir)?;
        self.run(&["-x", "-f", archive, "-C", dest])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;

    fn tar_available() -> bool {
        Command::new(DEFAULT_TOOL).arg("--version").output().is_ok()
    }

    #[test]
    fn test_validate_arg() {
        assert!(validate_arg("/data/profiles/work").is_ok());
        assert!(validate_arg(".").is_ok());
        assert!(validate_arg("my profile").is_ok());

        for bad in ["", "-rf", "a;b", "a&b", "a|b", "$(x)", "`x`", "a>b", "a\nb"] {
            assert!(
                matches!(validate_arg(bad), Err(PackError::InvalidPath { .. })),
                "expected '{}' to be rejected",
                bad.escape_debug()
            );
        }
    }

    #[test]
    fn test_invalid_path_spawns_nothing() {
        // A tool that cannot exist: reaching spawn would yield Unavailable.
        let transport = TarTransport::new("/nonexistent/rootswitch-tar");
        let err = transport
            .pack(Path::new("/tmp/a;b"), Path::new("/tmp/out.tar"))
            .unwrap_err();
        assert!(matches!(err, PackError::InvalidPath { .. }));

        let err = transport
            .unpack(Path::new("/tmp/in.tar"), Path::new("/tmp/x&y"))
            .unwrap_err();
        assert!(matches!(err, PackError::InvalidPath { .. }));
    }

    #[test]
    fn test_relative_paths_rejected() {
        let transport = TarTransport::new("/nonexistent/rootswitch-tar");

        // Would otherwise be read as a remote archive on host "backup".
        let err = transport
            .pack(Path::new("/tmp/tree"), Path::new("backup:profile.tar"))
            .unwrap_err();
        match err {
            PackError::InvalidPath { path, reason } => {
                assert_eq!(path, "backup:profile.tar");
                assert!(reason.contains("absolute"));
            }
            other => panic!("expected InvalidPath, got {other:?}"),
        }

        let err = transport
            .unpack(Path::new("host:in.tar"), Path::new("/tmp/out"))
            .unwrap_err();
        assert!(matches!(err, PackError::InvalidPath { .. }));

        let err = transport
            .pack_entries(
                Path::new("/tmp/out.tar"),
                &[PackEntry::new(Path::new("relative/dir"), ".")],
            )
            .unwrap_err();
        assert!(matches!(err, PackError::InvalidPath { .. }));

        let err = transport
            .unpack(Path::new("/tmp/in.tar"), Path::new("out"))
            .unwrap_err();
        assert!(matches!(err, PackError::InvalidPath { .. }));
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir(&source).unwrap();

        let transport = TarTransport::new("/nonexistent/rootswitch-tar");
        let err = transport
            .pack(&source, &dir.path().join("out.tar"))
            .unwrap_err();
        assert!(matches!(err, PackError::Unavailable { .. }));
    }

    #[test]
    fn test_nonzero_exit_is_tool_error() {
        if !tar_available() {
            eprintln!("skipping test_nonzero_exit_is_tool_error: tar not found");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let err = TarTransport::default()
            .unpack(&dir.path().join("missing.tar"), dir.path())
            .unwrap_err();
        match err {
            PackError::Tool { exit_code, .. } => assert_ne!(exit_code, 0),
            other => panic!("expected Tool error, got {other:?}"),
        }
    }

    #[test]
    fn test_pack_unpack_preserves_symlinks() {
        if !tar_available() {
            eprintln!("skipping test_pack_unpack_preserves_symlinks: tar not found");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tree");
        fs::create_dir_all(source.join("etc")).unwrap();
        fs::write(source.join("etc/hosts"), "127.0.0.1 localhost\n").unwrap();
        symlink("/system/bin/sh", source.join("sh")).unwrap();
        symlink("etc/hosts", source.join("hosts")).unwrap();

        let archive = dir.path().join("tree.tar");
        let transport = TarTransport::default();
        transport.pack(&source, &archive).unwrap();

        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        transport.unpack(&archive, &out).unwrap();

        let restored = out.join("tree");
        assert_eq!(
            fs::read_to_string(restored.join("etc/hosts")).unwrap(),
            "127.0.0.1 localhost\n"
        );
        // Dangling absolute link survives as a link.
        assert_eq!(
            fs::read_link(restored.join("sh")).unwrap(),
            Path::new("/system/bin/sh")
        );
        assert!(fs::symlink_metadata(restored.join("hosts"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[test]
    fn test_pack_entries_contents_and_extra_file() {
        if !tar_available() {
            eprintln!("skipping test_pack_entries_contents_and_extra_file: tar not found");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        let extra = dir.path().join("extra");
        fs::create_dir_all(tree.join("bin")).unwrap();
        fs::create_dir_all(&extra).unwrap();
        fs::write(tree.join("init"), "#!/bin/sh\n").unwrap();
        fs::write(extra.join("preference.xml"), "<preferences>\n").unwrap();

        let archive = dir.path().join("bundle.tar");
        let transport = TarTransport::default();
        transport
            .pack_entries(
                &archive,
                &[
                    PackEntry::new(&tree, "."),
                    PackEntry::new(&extra, "preference.xml"),
                ],
            )
            .unwrap();

        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        transport.unpack(&archive, &out).unwrap();
        assert!(out.join("init").is_file());
        assert!(out.join("bin").is_dir());
        assert!(out.join("preference.xml").is_file());
    }

    #[test]
    fn test_entry_must_be_single_component() {
        let transport = TarTransport::new("/nonexistent/rootswitch-tar");
        let err = transport
            .pack_entries(
                Path::new("/tmp/out.tar"),
                &[PackEntry::new(Path::new("/tmp"), "a/b")],
            )
            .unwrap_err();
        assert!(matches!(err, PackError::InvalidPath { .. }));
    }
}
