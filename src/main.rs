mod accounts;
mod alias;
mod backend;
mod backup;
mod error;
mod files;
mod install;
mod paths;
mod platform;
mod registry;
mod session;
mod usage;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::{accounts::Context, paths::Paths, platform::Platform};

#[derive(Parser)]
#[command(
    name = "ccswitch",
    version,
    about = "Multi-account switcher for Claude Code",
    long_about = "\
Manage and rotate between multiple Claude Code accounts without \
logging in and out each time.\n\
\n\
Accounts are stored in ~/.claude-switch-backup with credentials \
kept in the macOS Keychain, the Secret Service keyring (Linux) or \
DPAPI-encrypted files (WSL)."
)]
struct Cli {
    /// Skip confirmation prompts
    #[arg(short = 'y', long = "yes", global = true)]
    yes: bool,

    /// Log what ccswitch is doing (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add the currently logged-in Claude account to managed accounts
    #[command(name = "add-account", alias = "add")]
    AddAccount,

    /// Remove a managed account by number, email or alias
    #[command(name = "remove-account", aliases = ["remove", "rm"])]
    RemoveAccount {
        /// Account number (e.g. 2), email address or alias
        account: String,
    },

    /// List all managed accounts
    #[command(alias = "ls")]
    List,

    /// Switch accounts — rotates to next if no argument given
    Switch {
        /// Account number, email or alias to switch to (optional; rotates if omitted)
        account: Option<String>,
    },

    /// Show the currently active account
    #[command(alias = "whoami")]
    Status {
        /// Also fetch plan usage for the active account
        #[arg(long)]
        usage: bool,
    },

    /// Give an account a short name
    Alias {
        /// Account number, email or existing alias
        account: String,
        /// New alias (letters, digits, '_' and '-'; not purely numeric)
        name: String,
    },

    /// Remove an alias
    Unalias {
        /// The alias to remove
        name: String,
    },

    /// Copy this executable to <prefix>/bin
    Install {
        /// Installation prefix (default: ~/.local)
        #[arg(long)]
        prefix: Option<PathBuf>,
    },

    /// Remove the executable from <prefix>/bin
    Uninstall {
        /// Installation prefix (default: ~/.local)
        #[arg(long)]
        prefix: Option<PathBuf>,
    },

    /// Print the version
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("\n  {} {:#}\n", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if !platform::root_allowed() {
        anyhow::bail!("Do not run as root (unless inside a container)");
    }
    dispatch(cli.command, cli.yes, Platform::detect(), Paths::from_env)
}

/// `paths` is only called by commands that need a home directory, so
/// `version` and `install --prefix` work without one.
fn dispatch(
    command: Commands,
    yes: bool,
    platform: Platform,
    paths: impl Fn() -> Result<Paths>,
) -> Result<()> {
    log::debug!("platform: {platform}");
    let ctx = || -> Result<Context> {
        Ok(Context {
            platform,
            paths: paths()?,
        })
    };
    let prefix_or_default = |prefix: Option<PathBuf>| -> Result<PathBuf> {
        match prefix {
            Some(p) => Ok(p),
            None => Ok(install::default_prefix(&paths()?)),
        }
    };

    match command {
        Commands::AddAccount => accounts::add(&ctx()?),
        Commands::RemoveAccount { account } => accounts::remove(&ctx()?, &account, yes),
        Commands::List => accounts::list(&ctx()?),
        Commands::Switch { account: None } => accounts::switch_next(&ctx()?),
        Commands::Switch { account: Some(id) } => accounts::switch_to(&ctx()?, &id),
        Commands::Status { usage } => accounts::status(&ctx()?, usage),
        Commands::Alias { account, name } => accounts::set_alias(&ctx()?, &account, &name),
        Commands::Unalias { name } => accounts::unalias(&ctx()?, &name),
        Commands::Install { prefix } => install::install(&prefix_or_default(prefix)?),
        Commands::Uninstall { prefix } => install::uninstall(&prefix_or_default(prefix)?),
        Commands::Version => {
            println!("ccswitch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
