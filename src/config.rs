//! Global rootswitch configuration.
//!
//! Persisted with `confy` in the platform configuration directory. Missing
//! files yield the defaults.

use crate::error::{Error, Result};
use crate::layout::Layout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application name for config file storage.
const APP_NAME: &str = "rootswitch";

/// Global rootswitch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootswitchConfig {
    /// Configuration format version.
    pub version: u8,

    /// Application private data root. `None` uses the platform data directory.
    #[serde(default)]
    pub data_root: Option<PathBuf>,

    /// Archiving tool binary used for copy, export and import.
    #[serde(default = "default_archive_tool")]
    pub archive_tool: String,
}

fn default_archive_tool() -> String {
    rootswitch_pack::DEFAULT_TOOL.to_string()
}

impl Default for RootswitchConfig {
    fn default() -> Self {
        Self {
            version: 1,
            data_root: None,
            archive_tool: default_archive_tool(),
        }
    }
}

impl RootswitchConfig {
    /// Load configuration from disk.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    pub fn load() -> Result<Self> {
        confy::load(APP_NAME, None).map_err(|e| Error::Config(format!("load: {}", e)))
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        confy::store(APP_NAME, None, self).map_err(|e| Error::Config(format!("save: {}", e)))
    }

    /// Layout for this configuration. `override_root` wins over the stored
    /// data root; relative roots are made absolute.
    pub fn layout(&self, override_root: Option<PathBuf>) -> Result<Layout> {
        let root = match override_root.or_else(|| self.data_root.clone()) {
            Some(root) => root,
            None => Layout::default_data_root()?,
        };
        let root = std::path::absolute(&root).map_err(|e| {
            Error::Config(format!("cannot resolve data root {}: {}", root.display(), e))
        })?;
        Ok(Layout::new(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RootswitchConfig::default();
        assert_eq!(config.archive_tool, "tar");
        assert!(config.data_root.is_none());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RootswitchConfig = serde_json::from_str(r#"{"version": 1}"#).unwrap();
        assert_eq!(config, RootswitchConfig::default());
    }

    #[test]
    fn test_layout_override_wins() {
        let config = RootswitchConfig {
            data_root: Some(PathBuf::from("/srv/rootswitch")),
            ..Default::default()
        };
        assert_eq!(
            config.layout(None).unwrap().data_root(),
            std::path::Path::new("/srv/rootswitch")
        );
        assert_eq!(
            config
                .layout(Some(PathBuf::from("/tmp/other")))
                .unwrap()
                .data_root(),
            std::path::Path::new("/tmp/other")
        );
        assert!(config
            .layout(Some(PathBuf::from("relative")))
            .unwrap()
            .data_root()
            .is_absolute());
    }
}
