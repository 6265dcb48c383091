//! Settings command implementations.

use clap::{Args, Subcommand};
use rootswitch::settings::DisplaySettings;

use super::Context;

/// Show or change profile settings.
#[derive(Subcommand, Debug)]
pub enum SettingsCmd {
    /// Print every setting of a profile.
    Show(ShowCmd),

    /// Turn verbose logging on or off.
    SetVerbose(SetVerboseCmd),

    /// Change the virtual display geometry.
    SetDisplay(SetDisplayCmd),
}

impl SettingsCmd {
    /// Execute the settings subcommand.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        match self {
            SettingsCmd::Show(cmd) => cmd.run(ctx),
            SettingsCmd::SetVerbose(cmd) => cmd.run(ctx),
            SettingsCmd::SetDisplay(cmd) => cmd.run(ctx),
        }
    }
}

/// Print every setting of a profile.
#[derive(Args, Debug)]
pub struct ShowCmd {
    /// Profile (default: active).
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ShowCmd {
    fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        let profile = ctx.profile_or_active(self.profile.as_deref())?;
        let store = ctx.store.settings();
        let display = DisplaySettings::load(store, &profile)?;
        let verbose = store.verbose_logging(&profile)?;

        if self.json {
            let json = serde_json::json!({
                "profile": profile,
                "verbose_logging": verbose,
                "display": {
                    "width": display.width,
                    "height": display.height,
                    "dpi": display.dpi,
                },
                "raw": store.load(&profile)?,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            println!("Profile: {}", profile);
            println!("Verbose logging: {}", verbose);
            println!(
                "Display: {}x{} @ {} dpi",
                display.width, display.height, display.dpi
            );
        }
        Ok(())
    }
}

/// Turn verbose logging on or off.
#[derive(Args, Debug)]
pub struct SetVerboseCmd {
    /// `true` or `false`.
    #[arg(action = clap::ArgAction::Set)]
    pub enabled: bool,

    /// Profile (default: active).
    #[arg(short, long)]
    pub profile: Option<String>,
}

impl SetVerboseCmd {
    fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        let profile = ctx.profile_or_active(self.profile.as_deref())?;
        ctx.store
            .settings()
            .set_bool(&profile, rootswitch::settings::VERBOSE_LOGGING, self.enabled)?;
        println!("Verbose logging for {}: {}", profile, self.enabled);
        Ok(())
    }
}

/// Change the virtual display geometry. Unset values are kept.
#[derive(Args, Debug)]
pub struct SetDisplayCmd {
    /// Width in pixels (1-4096).
    #[arg(long)]
    pub width: Option<i32>,

    /// Height in pixels (1-4096).
    #[arg(long)]
    pub height: Option<i32>,

    /// Density in dpi (1-640).
    #[arg(long)]
    pub dpi: Option<i32>,

    /// Profile (default: active).
    #[arg(short, long)]
    pub profile: Option<String>,
}

impl SetDisplayCmd {
    fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        let profile = ctx.profile_or_active(self.profile.as_deref())?;
        let store = ctx.store.settings();

        let mut display = DisplaySettings::load(store, &profile)?;
        if let Some(width) = self.width {
            display.width = width;
        }
        if let Some(height) = self.height {
            display.height = height;
        }
        if let Some(dpi) = self.dpi {
            display.dpi = dpi;
        }
        display.save(store, &profile)?;

        println!(
            "Display for {}: {}x{} @ {} dpi",
            profile, display.width, display.height, display.dpi
        );
        Ok(())
    }
}
