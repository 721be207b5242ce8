use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "apkup",
    about = "Check for a newer release, download its installer package and hand it to the system installer",
    version,
    author
)]
pub struct Cli {
    /// Directory the update package is downloaded into
    #[arg(long, global = true, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Base URL of the release API (defaults to https://api.github.com)
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// Installer program that receives the package path
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub installer: Option<String>,

    /// Argument passed to the installer before the package path (repeatable)
    #[arg(
        long = "installer-arg",
        global = true,
        value_name = "ARG",
        allow_hyphen_values = true
    )]
    pub installer_args: Vec<String>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether a newer release is available
    Check,

    /// Check, download, verify and install the latest release
    Update {
        /// Install without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Stop after the package has been downloaded and verified
        #[arg(long)]
        no_install: bool,
    },

    /// Compare two dotted versions
    Compare {
        /// Version that may be newer
        #[arg(value_name = "CANDIDATE")]
        candidate: String,

        /// Version to compare against
        #[arg(value_name = "CURRENT")]
        current: String,
    },
}
