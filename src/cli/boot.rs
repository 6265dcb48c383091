//! Init and boot command implementations.

use clap::Args;
use rootswitch::error::Error;
use rootswitch::Bootstrap;

use super::Context;

/// Initialize the data root.
#[derive(Args, Debug)]
pub struct InitCmd {}

impl InitCmd {
    /// Execute the init command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        initialize(ctx)?;
        println!("Initialized {}", ctx.layout().data_root().display());
        Ok(())
    }
}

/// Prepare the active rootfs and print the paths for the guest engine.
#[derive(Args, Debug)]
pub struct BootCmd {
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

impl BootCmd {
    /// Execute the boot command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        initialize(ctx)?;

        // Raise the level first so preparation itself is logged verbosely.
        let current = ctx.store.get_active_profile()?;
        if ctx.store.settings().verbose_logging(&current)? {
            ctx.enable_verbose_logging();
        }

        let bootstrap = Bootstrap::from_install(ctx.layout().clone())?;
        let (active, report) = ctx.store.prepare_boot(&bootstrap)?;

        if self.json {
            let json = serde_json::json!({
                "profile": active,
                "rootfs": report.rootfs,
                "loader": report.loader,
                "killed": report.killed,
                "logs_rotated": report.logs_rotated,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            println!("Profile: {}", active);
            println!("Rootfs: {}", report.rootfs.display());
            println!("Loader: {}", report.loader.display());
            if !report.killed.is_empty() {
                println!("Killed orphans: {:?}", report.killed);
            }
        }
        Ok(())
    }
}

/// Run profile initialization. A migration conflict is reported but does
/// not stop startup.
fn initialize(ctx: &Context) -> rootswitch::Result<()> {
    match ctx.store.initialize_profiles() {
        Err(e @ Error::MigrationConflict { .. }) => {
            tracing::warn!(error = %e, "legacy rootfs left in place");
            eprintln!("Warning: {}", e);
            Ok(())
        }
        other => other,
    }
}
