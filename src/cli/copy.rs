//! Copy command implementation.

use clap::Args;

use super::Context;

/// Duplicate a profile.
#[derive(Args, Debug)]
pub struct CopyCmd {
    /// Profile to copy.
    pub source: String,

    /// Name of the new profile.
    pub target: String,
}

impl CopyCmd {
    /// Execute the copy command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        eprintln!("Copying profile '{}'...", self.source);
        ctx.store.copy_profile(&self.source, &self.target)?;
        println!("Copied profile: {} -> {}", self.source, self.target);
        Ok(())
    }
}
