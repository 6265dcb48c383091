//! List command implementation.

use clap::Args;

use super::Context;

/// List all profiles.
#[derive(Args, Debug)]
pub struct ListCmd {
    /// Show ROM details.
    #[arg(short, long)]
    pub verbose: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ListCmd {
    /// Execute the list command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        let profiles = ctx.store.describe_profiles()?;

        if self.json {
            let json: Vec<_> = profiles
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.name,
                        "active": p.active,
                        "materialized": p.materialized,
                        "rom_installed": p.rom_installed,
                        "rom_version": p.rom.as_ref().map(|r| r.version.clone()),
                        "rom_code": p.rom.as_ref().map(|r| r.code),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
            return Ok(());
        }

        println!("{:<2} {:<24} {:<6} {:<16}", "", "NAME", "ROM", "VERSION");
        println!("{}", "-".repeat(50));

        for profile in &profiles {
            let marker = if profile.active { "*" } else { "" };
            let rom = if profile.rom_installed { "yes" } else { "no" };
            let version = profile
                .rom
                .as_ref()
                .map(|r| r.version.as_str())
                .unwrap_or("-");
            println!(
                "{:<2} {:<24} {:<6} {:<16}",
                marker,
                truncate(&profile.name, 22),
                rom,
                truncate(version, 14)
            );

            if self.verbose {
                if let Some(info) = &profile.rom {
                    println!("   Author: {}", info.author);
                    println!("   Code: {}", info.code);
                    if !info.desc.is_empty() {
                        println!("   Description: {}", info.desc);
                    }
                }
                let rootfs = ctx.layout().profile_rootfs_dir(&profile.name);
                println!("   Rootfs: {}", rootfs.display());
                println!();
            }
        }

        Ok(())
    }
}

/// Truncate a string to max characters, adding "..." if needed.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
