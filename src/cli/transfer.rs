//! Export and import command implementations.

use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::Args;

use super::Context;

/// Export a profile to a single archive.
#[derive(Args, Debug)]
pub struct ExportCmd {
    /// Profile to export.
    pub name: String,

    /// Destination archive (default: `<name>.tar` in the current directory).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ExportCmd {
    /// Execute the export command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.tar", self.name)));

        eprintln!("Exporting profile '{}'...", self.name);
        ctx.store.export_profile(&self.name, &output)?;
        println!("Exported profile {} to {}", self.name, output.display());
        Ok(())
    }
}

/// Import a profile from an archive.
#[derive(Args, Debug)]
pub struct ImportCmd {
    /// Name of the new profile.
    pub name: String,

    /// Archive to read; `-` or absent reads standard input.
    #[arg(value_name = "FILE")]
    pub archive: Option<PathBuf>,
}

impl ImportCmd {
    /// Execute the import command.
    pub fn run(&self, ctx: &Context) -> rootswitch::Result<()> {
        match self.archive.as_deref() {
            Some(path) if path.as_os_str() != "-" => {
                let file = File::open(path)?;
                ctx.store.import_profile(&self.name, file)?;
            }
            _ => ctx.store.import_profile(&self.name, io::stdin().lock())?,
        }

        println!("Imported profile: {}", self.name);
        Ok(())
    }
}
