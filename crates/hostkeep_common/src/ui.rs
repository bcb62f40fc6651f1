//! Console output
//!
//! All operator-facing text goes through [`Console`] so every line carries a
//! severity tag and tests can capture the output. ASCII tags, color only when
//! the sink is a terminal.

use owo_colors::OwoColorize;
use std::fmt;
use std::io::{self, Write};

/// Rule printed under section titles
pub const SECTION_RULE: &str = "------------------------------------------------------------";

/// Severity of a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Info => "[INFO]",
            Self::Success => "[OK]",
            Self::Warning => "[WARN]",
            Self::Error => "[ERROR]",
        }
    }

    fn paint(&self, color: bool) -> String {
        if !color {
            return self.prefix().to_string();
        }
        match self {
            Self::Info => self.prefix().bright_blue().bold().to_string(),
            Self::Success => self.prefix().bright_green().bold().to_string(),
            Self::Warning => self.prefix().yellow().bold().to_string(),
            Self::Error => self.prefix().bright_red().bold().to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Severity-tagged writer
///
/// Write errors on the console sink are ignored; there is nowhere left to
/// report them.
pub struct Console<W: Write> {
    out: W,
    color: bool,
}

impl Console<io::Stdout> {
    /// Console on stdout, colored when stdout is a TTY
    pub fn stdout() -> Self {
        let color = unsafe { libc::isatty(libc::STDOUT_FILENO) } == 1;
        Self::new(io::stdout(), color)
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn info(&mut self, message: &str) {
        self.tagged(Severity::Info, message);
    }

    pub fn success(&mut self, message: &str) {
        self.tagged(Severity::Success, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.tagged(Severity::Warning, message);
    }

    pub fn error(&mut self, message: &str) {
        self.tagged(Severity::Error, message);
    }

    pub fn tagged(&mut self, severity: Severity, message: &str) {
        let _ = writeln!(self.out, "{} {}", severity.paint(self.color), message);
    }

    /// Section title followed by a rule
    pub fn heading(&mut self, title: &str) {
        let _ = writeln!(self.out);
        if self.color {
            let _ = writeln!(self.out, "{}", title.bright_cyan().bold());
            let _ = writeln!(self.out, "{}", SECTION_RULE.dimmed());
        } else {
            let _ = writeln!(self.out, "{}", title);
            let _ = writeln!(self.out, "{}", SECTION_RULE);
        }
    }

    /// Aligned `label: value` line
    pub fn field(&mut self, label: &str, value: &str) {
        let label = format!("{}:", label);
        let _ = writeln!(self.out, "  {:<18} {}", label, value);
    }

    /// Indented free text
    pub fn text(&mut self, text: &str) {
        let _ = writeln!(self.out, "  {}", text);
    }

    /// Indented placeholder for a missing data source
    pub fn placeholder(&mut self, text: &str) {
        if self.color {
            let _ = writeln!(self.out, "  {}", text.dimmed());
        } else {
            let _ = writeln!(self.out, "  {}", text);
        }
    }

    pub fn blank(&mut self) {
        let _ = writeln!(self.out);
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Console<Vec<u8>> {
        Console::new(Vec::new(), false)
    }

    fn text(console: Console<Vec<u8>>) -> String {
        String::from_utf8(console.into_inner()).unwrap()
    }

    #[test]
    fn test_tags_without_color() {
        let mut c = plain();
        c.info("a");
        c.success("b");
        c.warn("c");
        c.error("d");
        assert_eq!(text(c), "[INFO] a\n[OK] b\n[WARN] c\n[ERROR] d\n");
    }

    #[test]
    fn test_field_alignment() {
        let mut c = plain();
        c.field("Kernel", "6.8.12-4-pve");
        assert_eq!(text(c), "  Kernel:            6.8.12-4-pve\n");
    }

    #[test]
    fn test_color_wraps_tag_only() {
        let mut c = Console::new(Vec::new(), true);
        c.error("boom");
        let out = text(c);
        assert!(out.contains("\u{1b}["));
        assert!(out.ends_with(" boom\n"));
    }
}
