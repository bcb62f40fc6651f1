//! Tail of the package manager history log

use super::{probe_file, Category, Section};
use crate::exec::Host;
use std::path::Path;

/// Last `count` non-empty lines of the log
pub fn tail_lines(content: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].to_vec()
}

pub fn history_section(host: &dyn Host, log: &Path, count: usize) -> Section {
    let mut section = Section::new(Category::PackageHistory);
    let Some(content) = probe_file(host, log) else {
        section.placeholder(format!("No package history available ({} not found)", log.display()));
        return section;
    };

    let lines = tail_lines(&content, count);
    if lines.is_empty() {
        section.placeholder("Package history is empty");
    }
    for line in lines {
        section.text(line);
    }
    section
}
