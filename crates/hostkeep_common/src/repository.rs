//! Repository mode detection and remediation
//!
//! The enterprise endpoint can be configured in more than one place depending
//! on how the host was installed, so every rule is checked and a single
//! match anywhere classifies the host as enterprise. Unreadable files count
//! as "no match" for that rule.

use crate::config::{HostkeepConfig, RepositoryRule};
use crate::error::Result;
use crate::exec::{Escalation, Host};
use crate::packages::PackageManager;
use crate::prompt::{Confirmation, Prompter};
use crate::remediation::RemediationProvider;
use crate::ui::Console;
use std::io::{ErrorKind, Write};
use tracing::{debug, info, warn};

/// Package-repository mode of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryMode {
    Community,
    Enterprise,
    /// None of the candidate files could be read
    Unknown,
}

impl RepositoryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryMode::Community => "community",
            RepositoryMode::Enterprise => "enterprise",
            RepositoryMode::Unknown => "unknown",
        }
    }
}

/// What one rule found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleFinding {
    Missing,
    Unreadable,
    Clean,
    /// 1-based line of the first match
    Matched { line: usize },
}

/// Classification plus per-rule evidence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryAssessment {
    pub mode: RepositoryMode,
    pub findings: Vec<(RepositoryRule, RuleFinding)>,
}

impl RepositoryAssessment {
    pub fn matched(&self) -> impl Iterator<Item = (&RepositoryRule, usize)> {
        self.findings.iter().filter_map(|(rule, finding)| match finding {
            RuleFinding::Matched { line } => Some((rule, *line)),
            _ => None,
        })
    }
}

/// Evaluate one rule
pub fn check_rule(host: &dyn Host, rule: &RepositoryRule) -> RuleFinding {
    let content = match host.read_to_string(&rule.path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return RuleFinding::Missing,
        Err(e) => {
            debug!(path = %rule.path.display(), error = %e, "treating unreadable file as no match");
            return RuleFinding::Unreadable;
        }
    };

    content
        .lines()
        .position(|line| line.contains(&rule.marker))
        .map(|idx| RuleFinding::Matched { line: idx + 1 })
        .unwrap_or(RuleFinding::Clean)
}

/// Classify the host from the rule set
pub fn assess(host: &dyn Host, rules: &[RepositoryRule]) -> RepositoryAssessment {
    let findings: Vec<_> = rules
        .iter()
        .map(|rule| (rule.clone(), check_rule(host, rule)))
        .collect();

    let any_match = findings
        .iter()
        .any(|(_, f)| matches!(f, RuleFinding::Matched { .. }));
    let any_read = findings
        .iter()
        .any(|(_, f)| matches!(f, RuleFinding::Clean | RuleFinding::Matched { .. }));

    let mode = if any_match {
        RepositoryMode::Enterprise
    } else if any_read {
        RepositoryMode::Community
    } else {
        RepositoryMode::Unknown
    };

    debug!(mode = mode.as_str(), rules = rules.len(), "repository assessment");
    RepositoryAssessment { mode, findings }
}

/// How the resolver step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverOutcome {
    NotNeeded(RepositoryMode),
    Declined,
    Interrupted,
    Remediated,
    RemediationFailed(String),
}

impl ResolverOutcome {
    pub fn summary(&self) -> String {
        match self {
            ResolverOutcome::NotNeeded(mode) => {
                format!("repositories: {}, no change needed", mode.as_str())
            }
            ResolverOutcome::Declined => "repositories: enterprise, migration declined".to_string(),
            ResolverOutcome::Interrupted => {
                "repositories: enterprise, migration interrupted".to_string()
            }
            ResolverOutcome::Remediated => "repositories: migrated to community".to_string(),
            ResolverOutcome::RemediationFailed(reason) => {
                format!("repositories: migration failed ({})", reason)
            }
        }
    }
}

/// Detects enterprise repositories and, with consent, runs the remediation
pub struct RepositoryModeResolver<'a> {
    host: &'a dyn Host,
    escalation: &'a Escalation,
    config: &'a HostkeepConfig,
}

impl<'a> RepositoryModeResolver<'a> {
    pub fn new(host: &'a dyn Host, escalation: &'a Escalation, config: &'a HostkeepConfig) -> Self {
        Self {
            host,
            escalation,
            config,
        }
    }

    pub fn assess(&self) -> RepositoryAssessment {
        assess(self.host, &self.config.repository.rules)
    }

    /// Run detection, confirmation and remediation
    ///
    /// Only a failed install of the download client is an error; declining,
    /// interruption and a failing remediation are reported and returned as
    /// outcomes.
    pub fn resolve<W: Write>(
        &self,
        console: &mut Console<W>,
        prompter: &mut dyn Prompter,
        provider: &dyn RemediationProvider,
    ) -> Result<ResolverOutcome> {
        console.info("Checking package repository configuration...");
        let assessment = self.assess();

        if assessment.mode != RepositoryMode::Enterprise {
            if assessment.mode == RepositoryMode::Unknown {
                console.warn("No repository configuration files could be read");
            }
            console.success("No enterprise repositories found, no remediation needed");
            return Ok(ResolverOutcome::NotNeeded(assessment.mode));
        }

        for (rule, line) in assessment.matched() {
            console.warn(&format!(
                "Enterprise repository in {} ({}:{})",
                rule.label,
                rule.path.display(),
                line
            ));
        }

        self.ensure_download_tool(console)?;

        let question = format!(
            "Enterprise repositories require a subscription. \
             Switch to community repositories using {}?",
            provider.describe()
        );
        console.flush();
        match prompter.confirm(&question) {
            Confirmation::Accepted => {}
            Confirmation::Declined => {
                console.info("Repository migration cancelled, no changes made");
                return Ok(ResolverOutcome::Declined);
            }
            Confirmation::Interrupted => {
                console.warn("Repository migration interrupted, no changes made");
                return Ok(ResolverOutcome::Interrupted);
            }
        }

        info!(provider = %provider.describe(), "running repository remediation");
        console.info("Running repository remediation...");
        match provider.remediate(self.host, self.escalation) {
            Ok(outcome) if outcome.success() => {
                console.success("Repository remediation completed");
                Ok(ResolverOutcome::Remediated)
            }
            Ok(outcome) => {
                let reason = format!("exit code {}", outcome.exit_code);
                console.error(&format!("Repository remediation failed ({})", reason));
                Ok(ResolverOutcome::RemediationFailed(reason))
            }
            Err(e) => {
                warn!(error = %e, "remediation did not run");
                console.error(&format!("Repository remediation failed: {}", e));
                Ok(ResolverOutcome::RemediationFailed(e.to_string()))
            }
        }
    }

    /// Install the download client if it is missing
    fn ensure_download_tool<W: Write>(&self, console: &mut Console<W>) -> Result<()> {
        let tool = &self.config.remediation.download_tool;
        if self.host.has_command(tool) {
            return Ok(());
        }

        console.warn(&format!("{} is not installed, installing it now", tool));
        let packages = PackageManager::new(self.host, self.escalation, &self.config.packages);
        packages.install(tool)?;
        console.success(&format!("{} installed", tool));
        Ok(())
    }
}
