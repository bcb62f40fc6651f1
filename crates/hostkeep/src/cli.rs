//! Command line surface
//!
//! hostkeep takes no options beyond `--help` and `--version`. Anything else on
//! the command line, dashed or not, is collected and ignored.

use clap::Parser;

/// Version string embedded by the build script
pub const VERSION: &str = env!("HOSTKEEP_VERSION");

#[derive(Debug, Parser)]
#[command(name = "hostkeep")]
#[command(
    about = "Repository check, package update and health report for Proxmox VE hosts",
    long_about = None
)]
#[command(version = VERSION)]
pub struct Cli {
    /// Accepted and ignored
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    pub args: Vec<String>,
}
