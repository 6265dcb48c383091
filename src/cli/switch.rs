//! Switch command implementation.

use clap::Args;

use super::Context;

/// Make a profile active.
#[derive(Args, Debug)]
pub struct SwitchCmd {
    /// Profile to activate.
    pub name: String,
}

impl SwitchCmd {
    /// Execute the switch command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        ctx.store.switch_profile(&self.name)?;
        println!("Switched to profile: {}", self.name);
        Ok(())
    }
}
