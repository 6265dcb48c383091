//! Rename command implementation.

use clap::Args;

use super::Context;

/// Rename a profile.
#[derive(Args, Debug)]
pub struct RenameCmd {
    /// Current profile name.
    pub old: String,

    /// New profile name.
    pub new: String,
}

impl RenameCmd {
    /// Execute the rename command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        ctx.store.rename_profile(&self.old, &self.new)?;
        println!("Renamed profile: {} -> {}", self.old, self.new);
        Ok(())
    }
}
