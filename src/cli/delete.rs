//! Delete command implementation.

use clap::Args;
use rootswitch::error::Error;

use super::{confirm, Context};

/// Delete a profile.
#[derive(Args, Debug)]
pub struct DeleteCmd {
    /// Profile name to delete.
    pub name: String,

    /// Force deletion without confirmation.
    #[arg(short, long)]
    pub force: bool,
}

impl DeleteCmd {
    /// Execute the delete command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        // Fail on unknown profiles before asking
        if !ctx.store.profile_exists(&self.name) {
            return Err(Error::NotFound(self.name.clone()));
        }

        // Confirm deletion unless --force
        if !self.force && !confirm(&format!("Delete profile '{}' and its rootfs?", self.name)) {
            println!("Cancelled");
            return Ok(());
        }

        ctx.store.delete_profile(&self.name)?;
        println!("Deleted profile: {}", self.name);
        Ok(())
    }
}
