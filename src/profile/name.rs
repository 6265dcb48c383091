//! Profile name validation.

use crate::error::{Error, Result};

/// Characters that may never appear in a profile name.
///
/// Path separators would escape the profiles root; the rest are shell
/// metacharacters that must never reach the archive tool.
pub const RESERVED_CHARS: &[char] = &[
    '/', '\\', ';', '&', '|', '$', '`', '<', '>', '(', ')', '*', '?', '!', '\'', '"', '\0',
    '\n', '\r',
];

/// Longest accepted name, in bytes. Leaves room for the settings file prefix
/// and suffix within a 255-byte file name.
pub const MAX_NAME_LEN: usize = 200;

/// Validate a profile name before it touches the filesystem.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid_name(name, "name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_name(
            name,
            format!("name longer than {} bytes", MAX_NAME_LEN),
        ));
    }
    if name.starts_with('.') {
        return Err(Error::invalid_name(name, "name cannot start with '.'"));
    }
    if name.starts_with('-') {
        return Err(Error::invalid_name(name, "name cannot start with '-'"));
    }
    if let Some(c) = name.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(Error::invalid_name(
            name,
            format!("name contains reserved character {:?}", c),
        ));
    }
    Ok(())
}
