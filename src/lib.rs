//! rootswitch - named, switchable guest root filesystems.
//!
//! Manages a set of profiles, each holding one guest rootfs, and exposes the
//! active one to a guest engine through a single well-known symlink.
//!
//! - [`layout`]: where everything lives under the data root
//! - [`profile`]: create, rename, copy, delete, switch, export and import
//! - [`settings`]: per-profile typed settings and their portable text format
//! - [`bootstrap`]: per-boot preparation of the active rootfs

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod fs_util;
pub mod layout;
pub mod process;
pub mod profile;
pub mod rom;
pub mod settings;

pub use bootstrap::{BootReport, Bootstrap};
pub use error::{Error, Result};
pub use layout::Layout;
pub use profile::ProfileStore;
pub use settings::SettingsStore;

/// rootswitch version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
