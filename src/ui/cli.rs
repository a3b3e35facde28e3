//! Command-line front end using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! bartender [global options] <command>
//! mods {list|import <ARCHIVE>|install <NAME>|cleanup|verify-case}
//! flags {list [--search T]|get <KEY>|set <KEY> <VALUE>|remove <KEY>|import <FILE> [--merge]|export <FILE>}
//! status
//! settings {show|init}
//! ```

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Sober mod and fastflag manager
#[derive(Debug, Parser)]
#[command(
    name = "bartender",
    author,
    version,
    about = "Mod and fastflag manager for Sober",
    long_about = "Bartender stages Roblox mod archives, installs them into Sober's\n\
                  asset overlay and edits the fastflags in Sober's config.json.\n\n\
                  Import a mod with `bartender mods import SkyboxPack.zip`, then\n\
                  `bartender mods install SkyboxPack`. See `bartender <command> --help`\n\
                  for more information about a command.",
    after_help = "SETTINGS:\n\n\
                  Paths are read from Bartender.yaml in the configuration directory\n\
                  (default ~/.config/bartender) and can be overridden with BARTENDER_*\n\
                  environment variables, e.g. BARTENDER_OVERLAY_DIR."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options available for all commands.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalOptions {
    /// Directory holding Bartender.yaml.
    #[arg(long = "config-dir", value_name = "DIR", global = true, env = "BARTENDER_CONFIG_DIR")]
    pub config_dir: Option<Utf8PathBuf>,

    /// Log at debug level.
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Also print log output to stderr.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manages staged mods and the overlay directory.
    #[command(subcommand)]
    Mods(ModsCommand),

    /// Edits fastflags in Sober's config.json.
    #[command(subcommand)]
    Flags(FlagsCommand),

    /// Shows whether Sober is installed and how many mods are staged.
    Status,

    /// Shows or writes the settings file.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Debug, Subcommand)]
pub enum ModsCommand {
    /// Lists staged mods and whether they are installed.
    List,

    /// Extracts a zip archive into the staging directory.
    Import {
        /// Path to the mod archive.
        #[arg(value_name = "ARCHIVE")]
        archive: Utf8PathBuf,
    },

    /// Copies a staged mod into Sober's overlay directory.
    Install {
        /// Mod name (the archive name without extension).
        name: String,
    },

    /// Removes every file from the overlay directory.
    Cleanup,

    /// Renames overlay files to match the casing of Sober's assets.
    #[command(name = "verify-case")]
    VerifyCase,
}

#[derive(Debug, Subcommand)]
pub enum FlagsCommand {
    /// Lists fastflags.
    List {
        /// Only show flags whose name contains this text (case-insensitive).
        #[arg(short, long, value_name = "TEXT")]
        search: Option<String>,
    },

    /// Prints the value of one fastflag.
    Get { key: String },

    /// Sets a fastflag, keeping the type of an existing value.
    Set {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Removes a fastflag.
    Remove { key: String },

    /// Loads fastflags from a flat JSON file and saves them.
    Import {
        #[arg(value_name = "FILE")]
        file: Utf8PathBuf,

        /// Add to the current fastflags instead of replacing them.
        #[arg(short, long)]
        merge: bool,
    },

    /// Writes the current fastflags to a flat JSON file.
    Export {
        #[arg(value_name = "FILE")]
        file: Utf8PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Prints the effective settings as YAML.
    Show,

    /// Writes the effective settings to Bartender.yaml.
    Init,
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
