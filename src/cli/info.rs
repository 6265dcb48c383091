//! Active and info command implementations.

use clap::Args;
use rootswitch::bootstrap::loader_path_from_exe;
use rootswitch::profile::read_symlink;

use super::Context;

/// Print the active profile.
#[derive(Args, Debug)]
pub struct ActiveCmd {}

impl ActiveCmd {
    /// Execute the active command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        println!("{}", ctx.store.get_active_profile()?);
        Ok(())
    }
}

/// Show paths and configuration.
#[derive(Args, Debug)]
pub struct InfoCmd {}

impl InfoCmd {
    /// Execute the info command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        let layout = ctx.layout();
        let active = ctx.store.get_active_profile()?;

        println!("Version: {}", rootswitch::VERSION);
        println!("Data root: {}", layout.data_root().display());
        println!("Active profile: {}", active);

        let link = layout.active_symlink_path();
        match read_symlink(&link) {
            Some(target) => println!("Rootfs: {} -> {}", link.display(), target.display()),
            None => println!("Rootfs: {} (not linked)", link.display()),
        }

        match loader_path_from_exe() {
            Ok(loader) => println!("Loader: {}", loader.display()),
            Err(e) => println!("Loader: unavailable ({})", e),
        }
        println!("Archive tool: {}", ctx.config.archive_tool);

        if let Ok(path) = confy::get_configuration_file_path("rootswitch", None) {
            println!("Config file: {}", path.display());
        }
        Ok(())
    }
}
