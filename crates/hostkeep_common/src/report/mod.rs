//! System report
//!
//! A fixed, ordered set of categories, each evaluated once and independently.
//! A category whose source is missing or fails renders a placeholder line;
//! nothing here returns an error. The report is printed and then dropped.

pub mod history;
pub mod machine;
pub mod platform;
pub mod sensors;
pub mod services;

use crate::config::{PathsConfig, ReportConfig};
use crate::exec::{Escalation, Host, Invocation};
use crate::ui::Console;
use std::io::Write;
use tracing::{debug, warn};

/// Report categories in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    System,
    Cpu,
    Memory,
    Disk,
    Network,
    Platform,
    Services,
    PackageHistory,
    Temperatures,
}

impl Category {
    /// Identity first, most volatile last
    pub const ALL: [Category; 9] = [
        Category::System,
        Category::Cpu,
        Category::Memory,
        Category::Disk,
        Category::Network,
        Category::Platform,
        Category::Services,
        Category::PackageHistory,
        Category::Temperatures,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Category::System => "System",
            Category::Cpu => "CPU",
            Category::Memory => "Memory",
            Category::Disk => "Disk",
            Category::Network => "Network",
            Category::Platform => "Proxmox VE",
            Category::Services => "Services",
            Category::PackageHistory => "Recent Package Activity",
            Category::Temperatures => "Temperatures",
        }
    }
}

/// One rendered line of a section
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Field { label: String, value: String },
    Text(String),
    /// Stand-in for a data source that is absent or failed
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub category: Category,
    pub lines: Vec<Line>,
}

impl Section {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            lines: Vec::new(),
        }
    }

    pub fn field(&mut self, label: &str, value: impl Into<String>) {
        self.lines.push(Line::Field {
            label: label.to_string(),
            value: value.into(),
        });
    }

    /// Field when the value is known, placeholder field otherwise
    pub fn field_or(&mut self, label: &str, value: Option<String>, missing: &str) {
        match value {
            Some(value) => self.field(label, value),
            None => self.lines.push(Line::Placeholder(format!("{}: {}", label, missing))),
        }
    }

    pub fn text(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Text(text.into()));
    }

    pub fn placeholder(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Placeholder(text.into()));
    }

    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Field { label: l, value } if l == label => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Placeholder(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Complete report, sections in [`Category::ALL`] order
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    pub fn section(&self, category: Category) -> Option<&Section> {
        self.sections.iter().find(|s| s.category == category)
    }

    pub fn render<W: Write>(&self, console: &mut Console<W>) {
        for section in &self.sections {
            console.heading(section.category.title());
            if section.lines.is_empty() {
                console.placeholder("No data");
            }
            for line in &section.lines {
                match line {
                    Line::Field { label, value } => console.field(label, value),
                    Line::Text(text) => console.text(text),
                    Line::Placeholder(text) => console.placeholder(text),
                }
            }
        }
        console.blank();
    }
}

/// Result of querying one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Program not on PATH
    Missing,
    /// Ran but failed (or could not be started)
    Failed(String),
    Output(String),
}

impl Probe {
    pub fn output(self) -> Option<String> {
        match self {
            Probe::Output(out) => Some(out),
            _ => None,
        }
    }
}

/// Run a read-only query, folding every failure into [`Probe`]
pub fn probe(host: &dyn Host, invocation: &Invocation, escalation: &Escalation) -> Probe {
    if !host.has_command(&invocation.program) {
        debug!(program = %invocation.program, "probe source missing");
        return Probe::Missing;
    }
    match host.capture(invocation, escalation) {
        Ok(captured) if captured.success() => Probe::Output(captured.stdout),
        Ok(captured) => {
            debug!(
                command = %invocation.display(escalation),
                exit_code = captured.exit_code,
                "probe failed"
            );
            Probe::Failed(format!("exit code {}", captured.exit_code))
        }
        Err(e) => {
            warn!(error = %e, "probe could not run");
            Probe::Failed(e.to_string())
        }
    }
}

/// Read a file for a probe; any error means "not available"
pub fn probe_file(host: &dyn Host, path: &std::path::Path) -> Option<String> {
    match host.read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "probe file unavailable");
            None
        }
    }
}

/// Best-effort snapshot of host health
pub struct SystemReportAggregator<'a> {
    host: &'a dyn Host,
    escalation: &'a Escalation,
    report: &'a ReportConfig,
    paths: &'a PathsConfig,
}

impl<'a> SystemReportAggregator<'a> {
    pub fn new(
        host: &'a dyn Host,
        escalation: &'a Escalation,
        report: &'a ReportConfig,
        paths: &'a PathsConfig,
    ) -> Self {
        Self {
            host,
            escalation,
            report,
            paths,
        }
    }

    pub fn aggregate(&self) -> Report {
        Report {
            sections: Category::ALL.iter().map(|c| self.collect(*c)).collect(),
        }
    }

    fn collect(&self, category: Category) -> Section {
        let host = self.host;
        match category {
            Category::System => machine::system_section(host, self.paths),
            Category::Cpu => machine::cpu_section(host, self.paths, self.report.sample_cpu_usage),
            Category::Memory => machine::memory_section(host),
            Category::Disk => machine::disk_section(host, &self.report.mounts),
            Category::Network => machine::network_section(host),
            Category::Platform => platform::platform_section(host, self.escalation),
            Category::Services => services::services_section(
                host,
                &self.report.services,
                self.report.unknown_services,
            ),
            Category::PackageHistory => history::history_section(
                host,
                &self.paths.history_log,
                self.report.history_lines,
            ),
            Category::Temperatures => sensors::temperatures_section(host),
        }
    }
}
