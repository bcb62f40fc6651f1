//! In-memory host and prompter
//!
//! Built for unit tests and behind the `test-support` feature. Commands
//! answer from a table, files come from a map and every invocation is
//! recorded.

use crate::error::{HostkeepError, Result};
use crate::exec::{truncate_output, Captured, Escalation, Host, Invocation};
use crate::prompt::{Confirmation, Prompter};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum FileEntry {
    Content(String),
    Unreadable,
}

#[derive(Debug, Clone)]
struct Recorded {
    program: String,
    line: String,
    streamed: bool,
}

/// A host whose commands and files are fixed up front
#[derive(Debug, Default)]
pub struct ScriptedHost {
    commands: BTreeSet<String>,
    captures: HashMap<String, Captured>,
    streams: HashMap<String, i32>,
    files: HashMap<PathBuf, FileEntry>,
    uid: u32,
    cpu_usage: Option<f32>,
    calls: RefCell<Vec<Recorded>>,
}

impl ScriptedHost {
    /// Empty machine: root, no commands, no files
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `program` resolvable
    pub fn with_command(mut self, program: &str) -> Self {
        self.commands.insert(program.to_string());
        self
    }

    /// Captured answer for an exact command line (without escalation)
    ///
    /// Output is capped the same way the live host caps it.
    pub fn respond(mut self, line: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        let (stdout, stdout_truncated) = truncate_output(stdout.as_bytes());
        let (stderr, stderr_truncated) = truncate_output(stderr.as_bytes());
        self.captures.insert(
            line.to_string(),
            Captured {
                exit_code,
                stdout,
                stderr,
                truncated: stdout_truncated || stderr_truncated,
            },
        );
        self
    }

    /// Exit code for an exact streamed command line (without escalation)
    pub fn respond_stream(mut self, line: &str, exit_code: i32) -> Self {
        self.streams.insert(line.to_string(), exit_code);
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.files
            .insert(path.into(), FileEntry::Content(content.to_string()));
        self
    }

    /// File that exists but cannot be read
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.insert(path.into(), FileEntry::Unreadable);
        self
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = uid;
        self
    }

    pub fn with_cpu_usage(mut self, percent: f32) -> Self {
        self.cpu_usage = Some(percent);
        self
    }

    /// Streamed command lines, escalation included, in call order
    pub fn streamed(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.streamed)
            .map(|c| c.line.clone())
            .collect()
    }

    /// Captured command lines, escalation included, in call order
    pub fn captured(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| !c.streamed)
            .map(|c| c.line.clone())
            .collect()
    }

    /// Streamed runs of `program`
    pub fn streamed_count(&self, program: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.streamed && c.program == program)
            .count()
    }

    fn record(&self, invocation: &Invocation, escalation: &Escalation, streamed: bool) {
        self.calls.borrow_mut().push(Recorded {
            program: invocation.program.clone(),
            line: invocation.display(escalation),
            streamed,
        });
    }

    fn ensure_present(&self, invocation: &Invocation) -> Result<()> {
        if self.commands.contains(&invocation.program) {
            return Ok(());
        }
        Err(HostkeepError::Spawn {
            program: invocation.program.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "not scripted"),
        })
    }
}

impl Host for ScriptedHost {
    fn has_command(&self, program: &str) -> bool {
        self.commands.contains(program)
    }

    fn capture(&self, invocation: &Invocation, escalation: &Escalation) -> Result<Captured> {
        self.ensure_present(invocation)?;
        self.record(invocation, escalation, false);
        let key = invocation.display(&Escalation::None);
        Ok(self.captures.get(&key).cloned().unwrap_or(Captured {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            truncated: false,
        }))
    }

    fn stream(&self, invocation: &Invocation, escalation: &Escalation) -> Result<i32> {
        self.ensure_present(invocation)?;
        self.record(invocation, escalation, true);
        let key = invocation.display(&Escalation::None);
        Ok(self.streams.get(&key).copied().unwrap_or(0))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.files.get(path) {
            Some(FileEntry::Content(content)) => Ok(content.clone()),
            Some(FileEntry::Unreadable) => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "scripted unreadable file",
            )),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        }
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn effective_uid(&self) -> u32 {
        self.uid
    }

    fn cpu_usage_percent(&self) -> Option<f32> {
        self.cpu_usage
    }
}

/// Prompter answering from a queue; declines once the queue is empty
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Confirmation>,
    questions: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Confirmation>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            questions: Vec::new(),
        }
    }

    /// Answers given as raw operator input lines
    pub fn typed(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|l| Confirmation::from_input(l)))
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, question: &str) -> Confirmation {
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(Confirmation::Declined)
    }
}
