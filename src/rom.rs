//! Guest ROM metadata stored inside a rootfs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Metadata file at the root of a rootfs.
pub const ROM_INFO_FILE: &str = "rom.ini";

/// Entry point whose presence marks an installed ROM.
pub const ROM_INIT_FILE: &str = "init";

const UNKNOWN: &str = "unknown";

/// Description of the ROM installed in a rootfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomInfo {
    /// ROM author.
    pub author: String,
    /// Human-readable version.
    pub version: String,
    /// Free-form description.
    pub desc: String,
    /// Checksum published with the ROM.
    pub md5: String,
    /// Monotonic version code.
    pub code: i64,
}

impl RomInfo {
    /// Parse `key=value` properties. `code` is mandatory; other keys default.
    pub fn parse(text: &str) -> Option<Self> {
        let props: HashMap<&str, &str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        let get = |key: &str, default: &str| {
            props
                .get(key)
                .map(|v| v.to_string())
                .unwrap_or_else(|| default.to_string())
        };

        Some(Self {
            code: props.get("code")?.parse().ok()?,
            author: get("author", UNKNOWN),
            version: get("version", UNKNOWN),
            desc: get("desc", UNKNOWN),
            md5: get("md5", ""),
        })
    }

    /// Read `<rootfs>/rom.ini`. `None` if missing or unparsable.
    pub fn read(rootfs: &Path) -> Option<Self> {
        let path = rootfs.join(ROM_INFO_FILE);
        let text = fs::read_to_string(&path).ok()?;
        let info = Self::parse(&text);
        if info.is_none() {
            tracing::warn!(path = %path.display(), "unreadable rom info");
        }
        info
    }
}

/// Whether a ROM is installed in `rootfs`.
pub fn rom_exists(rootfs: &Path) -> bool {
    rootfs.join(ROM_INIT_FILE).exists()
}
