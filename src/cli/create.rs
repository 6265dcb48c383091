//! Create command implementation.

use clap::Args;

use super::Context;

/// Create an empty profile.
#[derive(Args, Debug)]
pub struct CreateCmd {
    /// Profile name.
    pub name: String,

    /// Switch to the new profile after creating it.
    #[arg(long)]
    pub switch: bool,
}

impl CreateCmd {
    /// Execute the create command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        ctx.store.create_profile(&self.name)?;
        println!("Created profile: {}", self.name);

        if self.switch {
            ctx.store.switch_profile(&self.name)?;
            println!("Switched to profile: {}", self.name);
        }
        Ok(())
    }
}
