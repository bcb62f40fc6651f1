//! hostkeep - one-shot maintenance run for Proxmox VE / Debian hosts
//!
//! Checks privileges and tooling, offers to move the host off the
//! enterprise repositories, runs the full package update cycle and prints a
//! health report.

use anyhow::{Context, Result};
use clap::Parser;
use hostkeep::cli::{Cli, VERSION};
use hostkeep::{errors, logging};
use hostkeep_common::prompt::ConsolePrompter;
use hostkeep_common::remediation::RemoteScript;
use hostkeep_common::ui::Console;
use hostkeep_common::{HostkeepConfig, LiveHost, Pipeline};
use std::io::Write;
use tracing::{debug, info, warn};

fn main() {
    let cli = Cli::parse();
    let (config, config_error) = HostkeepConfig::load();
    logging::init(&config.log.level);
    info!(version = VERSION, "hostkeep starting");
    if !cli.args.is_empty() {
        debug!(args = ?cli.args, "ignoring positional arguments");
    }

    let mut console = Console::stdout();
    if let Some(e) = config_error {
        warn!(error = %e, "ignoring config file");
        console.warn(&format!("{}, using defaults", e));
    }

    let code = match run(&config, &mut console) {
        Ok(()) => errors::EXIT_SUCCESS,
        Err(e) => {
            console.error(&format!("{:#}", e));
            errors::exit_code_for(&e)
        }
    };
    console.flush();
    std::process::exit(code);
}

fn run<W: Write>(config: &HostkeepConfig, console: &mut Console<W>) -> Result<()> {
    let host = LiveHost::new();
    let provider = RemoteScript::from_config(&config.remediation);
    let mut prompter = ConsolePrompter::new();

    Pipeline::new(&host, config)
        .run(console, &mut prompter, &provider)
        .context("Maintenance run aborted")?;
    Ok(())
}
