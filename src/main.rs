//! rootswitch CLI entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rootswitch::config::RootswitchConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

mod cli;

/// Default log filter.
const DEFAULT_FILTER: &str = "rootswitch=warn";

/// Log filter for `-v` and for profiles with verbose logging enabled.
const VERBOSE_FILTER: &str = "rootswitch=debug";

/// Handle for raising the log level after startup.
pub type LogHandle = reload::Handle<EnvFilter, Registry>;

/// rootswitch - switchable guest root filesystems
#[derive(Parser, Debug)]
#[command(name = "rootswitch")]
#[command(about = "Manage named, switchable guest root filesystems")]
#[command(version)]
struct Cli {
    /// Data root to operate on (overrides the configuration file).
    #[arg(long, global = true, value_name = "DIR")]
    data_root: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List profiles.
    #[command(alias = "ls")]
    List(cli::list::ListCmd),

    /// Print the active profile.
    Active(cli::info::ActiveCmd),

    /// Create an empty profile.
    Create(cli::create::CreateCmd),

    /// Rename a profile.
    #[command(alias = "mv")]
    Rename(cli::rename::RenameCmd),

    /// Duplicate a profile, preserving symlinks.
    #[command(alias = "cp")]
    Copy(cli::copy::CopyCmd),

    /// Delete a profile.
    #[command(alias = "rm")]
    Delete(cli::delete::DeleteCmd),

    /// Make a profile active.
    Switch(cli::switch::SwitchCmd),

    /// Export a profile to an archive.
    Export(cli::transfer::ExportCmd),

    /// Import a profile from an archive.
    Import(cli::transfer::ImportCmd),

    /// Initialize the data root and migrate a legacy rootfs.
    Init(cli::boot::InitCmd),

    /// Prepare the active rootfs for booting the guest engine.
    Boot(cli::boot::BootCmd),

    /// Show or change profile settings.
    #[command(subcommand)]
    Settings(cli::settings::SettingsCmd),

    /// Show paths and configuration.
    Info(cli::info::InfoCmd),
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on RUST_LOG or default to warn
    let log = init_logging(cli.verbose);

    tracing::debug!(version = rootswitch::VERSION, "starting rootswitch");

    // Load configuration
    let config = match RootswitchConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            RootswitchConfig::default()
        }
    };

    let result = cli::Context::new(config, cli.data_root, log).and_then(|ctx| match cli.command {
        Commands::List(cmd) => cmd.run(&ctx),
        Commands::Active(cmd) => cmd.run(&ctx),
        Commands::Create(cmd) => cmd.run(&ctx),
        Commands::Rename(cmd) => cmd.run(&ctx),
        Commands::Copy(cmd) => cmd.run(&ctx),
        Commands::Delete(cmd) => cmd.run(&ctx),
        Commands::Switch(cmd) => cmd.run(&ctx),
        Commands::Export(cmd) => cmd.run(&ctx),
        Commands::Import(cmd) => cmd.run(&ctx),
        Commands::Init(cmd) => cmd.run(&ctx),
        Commands::Boot(cmd) => cmd.run(&ctx),
        Commands::Settings(cmd) => cmd.run(&ctx),
        Commands::Info(cmd) => cmd.run(&ctx),
    });

    // Handle errors
    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber.
fn init_logging(verbose: bool) -> LogHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    });
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    handle
}

/// Raise the log level to debug unless `RUST_LOG` pins it.
pub fn enable_verbose_logging(handle: &LogHandle) {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return;
    }
    if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new(VERBOSE_FILTER)) {
        tracing::debug!(error = %e, "could not raise log level");
    }
}
