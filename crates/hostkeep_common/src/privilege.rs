//! Privilege and tooling checks
//!
//! Both run before anything mutates the host and both are fail-fast.

use crate::config::HostkeepConfig;
use crate::error::{HostkeepError, Result};
use crate::exec::{Escalation, Host};
use tracing::{info, warn};

/// Decide how privileged commands will be launched
pub fn detect_escalation(host: &dyn Host, escalation_command: &str) -> Result<Escalation> {
    if host.effective_uid() == 0 {
        info!("running as root, no escalation prefix");
        return Ok(Escalation::None);
    }

    if host.has_command(escalation_command) {
        info!(command = escalation_command, "using escalation prefix");
        Ok(Escalation::Command(escalation_command.to_string()))
    } else {
        Err(HostkeepError::NoPrivilege(escalation_command.to_string()))
    }
}

/// Outcome of the tooling check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolingReport {
    /// Optional tools that are absent; the run continues without them
    pub degraded: Vec<String>,
}

/// Verify the tools the fail-fast phase cannot work without
pub fn check_tooling(host: &dyn Host, config: &HostkeepConfig) -> Result<ToolingReport> {
    if !host.has_command(&config.packages.manager) {
        return Err(HostkeepError::MissingTool(config.packages.manager.clone()));
    }

    let mut report = ToolingReport::default();
    if !host.has_command("systemctl") {
        warn!("systemctl not found, service states will be unknown");
        report.degraded.push("systemctl".to_string());
    }
    Ok(report)
}
