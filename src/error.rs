//! Error types for rootswitch.

use rootswitch_pack::PackError;
use std::path::Path;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by profile, settings and bootstrap operations.
///
/// None of these are fatal to the host process; the worst outcome of any
/// operation is a failed call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Profile name is empty, blank, or contains reserved characters.
    #[error("invalid profile name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A path handed to the archive tool contained injection-risk characters.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Target profile already exists.
    #[error("profile '{0}' already exists")]
    AlreadyExists(String),

    /// Profile does not exist.
    #[error("profile '{0}' not found")]
    NotFound(String),

    /// Operation is not allowed on the default or the active profile.
    #[error("profile '{name}' is protected: {reason}")]
    ProtectedProfile {
        /// The protected profile.
        name: String,
        /// Which protection applied.
        reason: &'static str,
    },

    /// Archive tool exited unsuccessfully.
    #[error("archive tool failed with exit code {exit_code}: {stderr}")]
    ArchiveTool {
        /// Tool exit code (-1 when killed by a signal).
        exit_code: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// Archive tool could not be started.
    #[error("archive tool unavailable: {0}")]
    ArchiveUnavailable(String),

    /// Creating or replacing a symbolic link failed.
    #[error("symlink error at {path}: {message}")]
    Symlink {
        /// Link path.
        path: String,
        /// Underlying failure.
        message: String,
    },

    /// Legacy rootfs could not be migrated because the destination has content.
    #[error("cannot migrate legacy rootfs {legacy} into {destination}: destination is not empty")]
    MigrationConflict {
        /// Legacy rootfs directory, left in place.
        legacy: String,
        /// Destination that already has content.
        destination: String,
    },

    /// A filesystem step of a larger operation failed.
    #[error("storage error during {operation}: {message}")]
    Storage {
        /// The step that failed.
        operation: String,
        /// Underlying failure.
        message: String,
    },

    /// Settings value rejected or settings file unreadable.
    #[error("settings error: {0}")]
    Settings(String),

    /// Configuration could not be loaded or saved.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid-name error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a protected-profile error.
    pub fn protected(name: impl Into<String>, reason: &'static str) -> Self {
        Self::ProtectedProfile {
            name: name.into(),
            reason,
        }
    }

    /// Create a storage error for a named step.
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a symlink error.
    pub fn symlink(path: &Path, message: impl std::fmt::Display) -> Self {
        Self::Symlink {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a settings error.
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings(message.into())
    }
}

impl From<PackError> for Error {
    fn from(err: PackError) -> Self {
        match err {
            PackError::InvalidPath { path, reason } => Error::InvalidPath { path, reason },
            PackError::Tool { exit_code, stderr } => Error::ArchiveTool { exit_code, stderr },
            PackError::Unavailable { tool, source } => {
                Error::ArchiveUnavailable(format!("{}: {}", tool, source))
            }
        }
    }
}
