//! Per-profile typed settings.
//!
//! Each profile owns one settings namespace (`profile_settings_<name>`),
//! persisted as a small JSON document. Writes are atomic and durable before
//! the call returns. The store performs no range validation; callers validate
//! values (see [`DisplaySettings::validate`]) before storing them.

pub mod codec;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::fs_util;
use crate::layout::Layout;
use crate::profile::validate_name;

/// Verbose-logging flag.
pub const VERBOSE_LOGGING: &str = "verbose_logging";
/// Virtual display width in pixels.
pub const DISPLAY_WIDTH: &str = "display_width";
/// Virtual display height in pixels.
pub const DISPLAY_HEIGHT: &str = "display_height";
/// Virtual display density.
pub const DISPLAY_DPI: &str = "display_dpi";

/// Default for [`VERBOSE_LOGGING`].
pub const DEFAULT_VERBOSE_LOGGING: bool = true;
/// Default for [`DISPLAY_WIDTH`].
pub const DEFAULT_DISPLAY_WIDTH: i32 = 1080;
/// Default for [`DISPLAY_HEIGHT`].
pub const DEFAULT_DISPLAY_HEIGHT: i32 = 1920;
/// Default for [`DISPLAY_DPI`].
pub const DEFAULT_DISPLAY_DPI: i32 = 160;

/// Upper bound for display width and height.
pub const MAX_DISPLAY_DIMENSION: i32 = 4096;
/// Upper bound for display density.
pub const MAX_DISPLAY_DPI: i32 = 640;

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    /// Boolean flag.
    Bool(bool),
    /// Free-form string.
    String(String),
    /// 32-bit integer.
    Int(i32),
}

impl SettingValue {
    fn kind(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "bool",
            SettingValue::String(_) => "string",
            SettingValue::Int(_) => "int",
        }
    }
}

/// All settings of one profile, ordered by key.
pub type ProfileSettings = BTreeMap<String, SettingValue>;

/// Durable store of settings namespaces, one per profile.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    layout: Layout,
}

impl SettingsStore {
    /// Create a store under `layout`'s settings directory.
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Load every setting of `profile`. A missing namespace is empty.
    pub fn load(&self, profile: &str) -> Result<ProfileSettings> {
        let path = self.path(profile)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ProfileSettings::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|e| {
            Error::settings(format!("corrupt settings file {}: {}", path.display(), e))
        })
    }

    /// Replace the whole namespace of `profile` with `settings`.
    pub fn replace(&self, profile: &str, settings: &ProfileSettings) -> Result<()> {
        if settings.is_empty() {
            return self.clear(profile);
        }
        let path = self.path(profile)?;
        let payload = serde_json::to_vec_pretty(settings)?;
        fs_util::write_atomic(&path, &payload)
            .map_err(|e| Error::storage("write settings", format!("{}: {}", path.display(), e)))
    }

    /// Remove every setting of `profile`.
    pub fn clear(&self, profile: &str) -> Result<()> {
        let path = self.path(profile)?;
        fs_util::remove_file_if_exists(&path)
            .map_err(|e| Error::storage("clear settings", format!("{}: {}", path.display(), e)))
    }

    /// Make `dst`'s namespace an exact copy of `src`'s.
    pub fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let settings = self.load(src)?;
        self.replace(dst, &settings)
    }

    /// Move `old`'s namespace to `new`, leaving `old` empty.
    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.copy(old, new)?;
        self.clear(old)
    }

    /// Read a single value, if present.
    pub fn get(&self, profile: &str, key: &str) -> Result<Option<SettingValue>> {
        Ok(self.load(profile)?.remove(key))
    }

    /// Store a single value.
    pub fn set(&self, profile: &str, key: &str, value: SettingValue) -> Result<()> {
        let mut settings = self.load(profile)?;
        settings.insert(key.to_string(), value);
        self.replace(profile, &settings)
    }

    /// Read a boolean, falling back to `default` when absent or mistyped.
    pub fn get_bool(&self, profile: &str, key: &str, default: bool) -> Result<bool> {
        Ok(match self.get(profile, key)? {
            Some(SettingValue::Bool(v)) => v,
            other => mistyped(profile, key, other, "bool", default),
        })
    }

    /// Read a string, falling back to `default` when absent or mistyped.
    pub fn get_string(&self, profile: &str, key: &str, default: &str) -> Result<String> {
        Ok(match self.get(profile, key)? {
            Some(SettingValue::String(v)) => v,
            other => mistyped(profile, key, other, "string", default.to_string()),
        })
    }

    /// Read an integer, falling back to `default` when absent or mistyped.
    pub fn get_int(&self, profile: &str, key: &str, default: i32) -> Result<i32> {
        Ok(match self.get(profile, key)? {
            Some(SettingValue::Int(v)) => v,
            other => mistyped(profile, key, other, "int", default),
        })
    }

    /// Store a boolean.
    pub fn set_bool(&self, profile: &str, key: &str, value: bool) -> Result<()> {
        self.set(profile, key, SettingValue::Bool(value))
    }

    /// Store a string.
    pub fn set_string(&self, profile: &str, key: &str, value: &str) -> Result<()> {
        self.set(profile, key, SettingValue::String(value.to_string()))
    }

    /// Store an integer.
    pub fn set_int(&self, profile: &str, key: &str, value: i32) -> Result<()> {
        self.set(profile, key, SettingValue::Int(value))
    }

    /// Whether verbose logging is enabled for `profile` (default: on).
    pub fn verbose_logging(&self, profile: &str) -> Result<bool> {
        self.get_bool(profile, VERBOSE_LOGGING, DEFAULT_VERBOSE_LOGGING)
    }

    /// Document path of `profile`'s namespace. The name must be a valid
    /// profile name so the path stays inside the settings directory.
    fn path(&self, profile: &str) -> Result<PathBuf> {
        validate_name(profile)?;
        Ok(self.layout.settings_path(profile))
    }
}

fn mistyped<T>(
    profile: &str,
    key: &str,
    found: Option<SettingValue>,
    wanted: &str,
    default: T,
) -> T {
    if let Some(value) = found {
        tracing::warn!(
            profile = %profile,
            key = %key,
            found = value.kind(),
            wanted,
            "setting has unexpected type, using default"
        );
    }
    default
}

/// Virtual display geometry of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySettings {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Density in dots per inch.
    pub dpi: i32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_DISPLAY_WIDTH,
            height: DEFAULT_DISPLAY_HEIGHT,
            dpi: DEFAULT_DISPLAY_DPI,
        }
    }
}

impl DisplaySettings {
    /// Load the geometry of `profile`, defaulting each field independently.
    pub fn load(store: &SettingsStore, profile: &str) -> Result<Self> {
        Ok(Self {
            width: store.get_int(profile, DISPLAY_WIDTH, DEFAULT_DISPLAY_WIDTH)?,
            height: store.get_int(profile, DISPLAY_HEIGHT, DEFAULT_DISPLAY_HEIGHT)?,
            dpi: store.get_int(profile, DISPLAY_DPI, DEFAULT_DISPLAY_DPI)?,
        })
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        check_range("display width", self.width, MAX_DISPLAY_DIMENSION)?;
        check_range("display height", self.height, MAX_DISPLAY_DIMENSION)?;
        check_range("display dpi", self.dpi, MAX_DISPLAY_DPI)
    }

    /// Validate, then store all three fields.
    pub fn save(&self, store: &SettingsStore, profile: &str) -> Result<()> {
        self.validate()?;
        let mut settings = store.load(profile)?;
        settings.insert(DISPLAY_WIDTH.into(), SettingValue::Int(self.width));
        settings.insert(DISPLAY_HEIGHT.into(), SettingValue::Int(self.height));
        settings.insert(DISPLAY_DPI.into(), SettingValue::Int(self.dpi));
        store.replace(profile, &settings)
    }
}

fn check_range(what: &str, value: i32, max: i32) -> Result<()> {
    if !(1..=max).contains(&value) {
        return Err(Error::settings(format!(
            "{} {} out of range (1..={})",
            what, value, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, SettingsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(Layout::new(dir.path()));
        (dir, store)
    }

    #[test]
    fn test_typed_get_set() {
        let (_dir, store) = store();
        assert!(store.get_bool("work", VERBOSE_LOGGING, true).unwrap());

        store.set_bool("work", VERBOSE_LOGGING, false).unwrap();
        store.set_int("work", DISPLAY_WIDTH, 720).unwrap();
        store.set_string("work", "label", "a<b>&\"c\"").unwrap();

        assert!(!store.get_bool("work", VERBOSE_LOGGING, true).unwrap());
        assert_eq!(store.get_int("work", DISPLAY_WIDTH, 0).unwrap(), 720);
        assert_eq!(
            store.get_string("work", "label", "").unwrap(),
            "a<b>&\"c\""
        );
        // Namespaces are isolated.
        assert!(store.load("other").unwrap().is_empty());
    }

    #[test]
    fn test_mistyped_value_falls_back_to_default() {
        let (_dir, store) = store();
        store.set_string("work", DISPLAY_WIDTH, "wide").unwrap();
        assert_eq!(store.get_int("work", DISPLAY_WIDTH, 1080).unwrap(), 1080);
    }

    #[test]
    fn test_rename_and_copy() {
        let (dir, store) = store();
        store.set_int("a", DISPLAY_DPI, 320).unwrap();

        store.copy("a", "b").unwrap();
        assert_eq!(store.load("a").unwrap(), store.load("b").unwrap());

        store.rename("a", "c").unwrap();
        assert!(store.load("a").unwrap().is_empty());
        assert_eq!(store.get_int("c", DISPLAY_DPI, 0).unwrap(), 320);
        assert!(!Layout::new(dir.path()).settings_path("a").exists());
    }

    #[test]
    fn test_clear_removes_namespace() {
        let (dir, store) = store();
        store.set_bool("work", VERBOSE_LOGGING, false).unwrap();
        store.clear("work").unwrap();
        store.clear("work").unwrap();
        assert!(!Layout::new(dir.path()).settings_path("work").exists());
        assert!(store.verbose_logging("work").unwrap());
    }

    #[test]
    fn test_namespace_names_are_validated() {
        let (dir, store) = store();
        for bad in ["../../escaped", "a/b", ""] {
            assert!(matches!(
                store.set_bool(bad, VERBOSE_LOGGING, false),
                Err(Error::InvalidName { .. })
            ));
            assert!(matches!(store.load(bad), Err(Error::InvalidName { .. })));
            assert!(matches!(store.clear(bad), Err(Error::InvalidName { .. })));
        }
        assert!(!dir.path().join("escaped").exists());
        assert!(!Layout::new(dir.path()).settings_dir().exists());
    }

    #[test]
    fn test_corrupt_namespace_is_an_error() {
        let (dir, store) = store();
        let path = Layout::new(dir.path()).settings_path("work");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(store.load("work"), Err(Error::Settings(_))));
    }

    #[test]
    fn test_display_settings() {
        let (_dir, store) = store();
        assert_eq!(
            DisplaySettings::load(&store, "work").unwrap(),
            DisplaySettings::default()
        );

        let display = DisplaySettings {
            width: 720,
            height: 1280,
            dpi: 320,
        };
        display.save(&store, "work").unwrap();
        assert_eq!(DisplaySettings::load(&store, "work").unwrap(), display);

        for bad in [
            DisplaySettings { width: 0, ..display },
            DisplaySettings { height: 4097, ..display },
            DisplaySettings { dpi: 641, ..display },
        ] {
            assert!(bad.save(&store, "work").is_err());
        }
        // Rejected input never reached storage.
        assert_eq!(DisplaySettings::load(&store, "work").unwrap(), display);
    }
}
