//! The maintenance run, phase by phase
//!
//! Privilege and tooling checks, the repository resolver and the package
//! cycle are fail-fast: the first error ends the run. The report and the
//! summary never fail.

use crate::config::{HostkeepConfig, PathsConfig};
use crate::error::Result;
use crate::exec::{Escalation, Host};
use crate::packages::PackageManager;
use crate::privilege::{check_tooling, detect_escalation, ToolingReport};
use crate::prompt::Prompter;
use crate::remediation::RemediationProvider;
use crate::report::{probe_file, SystemReportAggregator};
use crate::repository::{RepositoryModeResolver, ResolverOutcome};
use crate::ui::Console;
use chrono::{DateTime, Local};
use std::io::Write;
use tracing::info;

/// The host asked to be rebooted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootNotice {
    /// Packages that triggered the request, when the host lists them
    pub packages: Vec<String>,
}

/// What a completed run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub escalation: Escalation,
    pub tooling: ToolingReport,
    pub resolver: ResolverOutcome,
    pub reboot: Option<RebootNotice>,
    pub finished_at: DateTime<Local>,
}

/// Check the reboot marker, listing packages when the list is readable
pub fn reboot_notice(host: &dyn Host, paths: &PathsConfig) -> Option<RebootNotice> {
    if !host.path_exists(&paths.reboot_marker) {
        return None;
    }
    let packages = probe_file(host, &paths.reboot_packages)
        .map(|content| {
            let mut packages: Vec<String> = Vec::new();
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                if !packages.iter().any(|p| p == line) {
                    packages.push(line.to_string());
                }
            }
            packages
        })
        .unwrap_or_default();
    Some(RebootNotice { packages })
}

/// One full maintenance run against `host`
pub struct Pipeline<'a> {
    host: &'a dyn Host,
    config: &'a HostkeepConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(host: &'a dyn Host, config: &'a HostkeepConfig) -> Self {
        Self { host, config }
    }

    pub fn run<W: Write>(
        &self,
        console: &mut Console<W>,
        prompter: &mut dyn Prompter,
        provider: &dyn RemediationProvider,
    ) -> Result<RunSummary> {
        let escalation = detect_escalation(self.host, &self.config.privilege.escalation_command)?;
        if let Escalation::Command(_) = &escalation {
            console.info(&format!("Not running as root, {}", escalation.describe()));
        }

        let tooling = check_tooling(self.host, self.config)?;
        for tool in &tooling.degraded {
            console.warn(&format!("{} not found, related checks will be limited", tool));
        }

        info!("phase: repository mode");
        let resolver = RepositoryModeResolver::new(self.host, &escalation, self.config)
            .resolve(console, prompter, provider)?;

        info!("phase: package update cycle");
        PackageManager::new(self.host, &escalation, &self.config.packages).update_cycle(console)?;

        info!("phase: system report");
        let report = SystemReportAggregator::new(
            self.host,
            &escalation,
            &self.config.report,
            &self.config.paths,
        )
        .aggregate();
        report.render(console);

        let summary = RunSummary {
            reboot: reboot_notice(self.host, &self.config.paths),
            escalation,
            tooling,
            resolver,
            finished_at: Local::now(),
        };
        print_summary(console, &summary);
        Ok(summary)
    }
}

fn print_summary<W: Write>(console: &mut Console<W>, summary: &RunSummary) {
    console.success(&format!(
        "Maintenance completed at {}",
        summary.finished_at.format("%Y-%m-%d %H:%M:%S")
    ));
    console.info(&summary.resolver.summary());
    if let Some(notice) = &summary.reboot {
        if notice.packages.is_empty() {
            console.warn("A reboot is required");
        } else {
            console.warn(&format!(
                "A reboot is required by: {}",
                notice.packages.join(", ")
            ));
        }
    }
    console.flush();
}
