//! Package update cycle
//!
//! Every step streams to the terminal and the first non-zero exit stops the
//! cycle.

use crate::config::PackagesConfig;
use crate::error::{HostkeepError, Result};
use crate::exec::{Escalation, Host, Invocation};
use crate::ui::Console;
use std::io::Write;
use tracing::{error, info};

/// Steps of the update cycle, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStep {
    Refresh,
    Upgrade,
    FullUpgrade,
    Autoremove,
    Autoclean,
}

impl UpdateStep {
    pub const ALL: [UpdateStep; 5] = [
        UpdateStep::Refresh,
        UpdateStep::Upgrade,
        UpdateStep::FullUpgrade,
        UpdateStep::Autoremove,
        UpdateStep::Autoclean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStep::Refresh => "update",
            UpdateStep::Upgrade => "upgrade",
            UpdateStep::FullUpgrade => "dist-upgrade",
            UpdateStep::Autoremove => "autoremove",
            UpdateStep::Autoclean => "autoclean",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UpdateStep::Refresh => "Refreshing package lists",
            UpdateStep::Upgrade => "Upgrading packages",
            UpdateStep::FullUpgrade => "Applying full upgrade",
            UpdateStep::Autoremove => "Removing unused packages",
            UpdateStep::Autoclean => "Cleaning package cache",
        }
    }

    fn takes_yes(&self) -> bool {
        matches!(
            self,
            UpdateStep::Upgrade | UpdateStep::FullUpgrade | UpdateStep::Autoremove
        )
    }
}

/// apt-get driven through the host abstraction
pub struct PackageManager<'a> {
    host: &'a dyn Host,
    escalation: &'a Escalation,
    config: &'a PackagesConfig,
}

impl<'a> PackageManager<'a> {
    pub fn new(host: &'a dyn Host, escalation: &'a Escalation, config: &'a PackagesConfig) -> Self {
        Self {
            host,
            escalation,
            config,
        }
    }

    fn base(&self) -> Invocation {
        let inv = Invocation::new(&self.config.manager).privileged();
        if self.config.noninteractive {
            inv.env("DEBIAN_FRONTEND", "noninteractive")
        } else {
            inv
        }
    }

    pub fn step_invocation(&self, step: UpdateStep) -> Invocation {
        let inv = self.base().arg(step.as_str());
        if step.takes_yes() && self.config.assume_yes {
            inv.arg("-y")
        } else {
            inv
        }
    }

    fn run(&self, label: &str, invocation: &Invocation) -> Result<()> {
        info!(command = %invocation.display(self.escalation), "package step");
        let code = self.host.stream(invocation, self.escalation)?;
        if code != 0 {
            error!(step = label, code, "package step failed");
            return Err(HostkeepError::StepFailed {
                step: label.to_string(),
                code,
            });
        }
        Ok(())
    }

    pub fn run_step(&self, step: UpdateStep) -> Result<()> {
        self.run(
            &format!("{} {}", self.config.manager, step.as_str()),
            &self.step_invocation(step),
        )
    }

    /// Install a single package
    pub fn install(&self, package: &str) -> Result<()> {
        let mut inv = self.base().arg("install");
        if self.config.assume_yes {
            inv = inv.arg("-y");
        }
        inv = inv.arg(package);
        self.run(&format!("{} install {}", self.config.manager, package), &inv)
    }

    /// Run the whole cycle, stopping at the first failure
    pub fn update_cycle<W: Write>(&self, console: &mut Console<W>) -> Result<()> {
        for step in UpdateStep::ALL {
            console.info(&format!("{}...", step.description()));
            console.flush();
            self.run_step(step)?;
        }
        console.success("System packages are up to date");
        Ok(())
    }
}
