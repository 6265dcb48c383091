//! CLI command implementations.

pub mod boot;
pub mod copy;
pub mod create;
pub mod delete;
pub mod info;
pub mod list;
pub mod rename;
pub mod settings;
pub mod switch;
pub mod transfer;

use std::path::PathBuf;

use rootswitch::config::RootswitchConfig;
use rootswitch::{Layout, ProfileStore};

use crate::LogHandle;

/// Shared state for one CLI invocation.
pub struct Context {
    /// Loaded configuration.
    pub config: RootswitchConfig,
    /// Profile store over the selected data root.
    pub store: ProfileStore,
    log: LogHandle,
}

impl Context {
    /// Build the context, letting `data_root` override the configured root.
    pub fn new(
        config: RootswitchConfig,
        data_root: Option<PathBuf>,
        log: LogHandle,
    ) -> rootswitch::Result<Self> {
        let layout = config.layout(data_root)?;
        tracing::debug!(data_root = %layout.data_root().display(), "using data root");
        let store = ProfileStore::with_tool(layout, &config.archive_tool);
        Ok(Self { config, store, log })
    }

    /// Path layout in use.
    pub fn layout(&self) -> &Layout {
        self.store.layout()
    }

    /// `profile`, or the active profile if none was given. A named profile
    /// must be valid and exist.
    pub fn profile_or_active(&self, profile: Option<&str>) -> rootswitch::Result<String> {
        self.store.resolve_profile(profile)
    }

    /// Raise logging to debug for the rest of this invocation.
    pub fn enable_verbose_logging(&self) {
        crate::enable_verbose_logging(&self.log);
    }
}

/// Ask for confirmation on stderr. Anything but `y`/`yes` declines.
pub fn confirm(prompt: &str) -> bool {
    eprint!("{} [y/N] ", prompt);
    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    let input = input.trim().to_lowercase();
    input == "y" || input == "yes"
}
