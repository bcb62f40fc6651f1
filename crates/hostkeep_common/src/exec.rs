//! Host access layer
//!
//! Every external command and file read goes through the [`Host`] trait so
//! the resolver, package cycle and report can run against a scripted host in
//! tests. [`LiveHost`] is the real implementation:
//! - captured runs collect stdout/stderr/exit code without interpretation
//! - streamed runs inherit the terminal (package manager, remediation script)
//! - privileged runs are prefixed with the explicit [`Escalation`] value

use crate::error::{HostkeepError, Result};
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;
use tracing::debug;

/// Maximum output length to capture
pub const MAX_OUTPUT_BYTES: usize = 256 * 1024;

/// How privileged invocations are launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    /// Already root
    None,
    /// Prefix the given command (e.g. "sudo")
    Command(String),
}

impl Escalation {
    pub fn describe(&self) -> String {
        match self {
            Escalation::None => "running as root".to_string(),
            Escalation::Command(cmd) => format!("escalating with {}", cmd),
        }
    }
}

/// One external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Run through the escalation prefix
    pub privileged: bool,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: Vec::new(),
            privileged: false,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Program and arguments after applying escalation
    ///
    /// Environment variables are passed through `env` when escalating, since
    /// sudo resets the environment by default.
    pub fn argv(&self, escalation: &Escalation) -> Vec<String> {
        let mut argv = Vec::new();
        if self.privileged {
            if let Escalation::Command(prefix) = escalation {
                argv.push(prefix.clone());
                if !self.env.is_empty() {
                    argv.push("env".to_string());
                    argv.extend(self.env.iter().map(|(k, v)| format!("{}={}", k, v)));
                }
            }
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Command line as shown to the operator
    pub fn display(&self, escalation: &Escalation) -> String {
        self.argv(escalation).join(" ")
    }
}

/// Result of a captured command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Stdout or stderr was cut at [`MAX_OUTPUT_BYTES`]
    pub truncated: bool,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Everything the tool needs from the machine it runs on
pub trait Host {
    /// Whether `program` resolves on PATH
    fn has_command(&self, program: &str) -> bool;

    /// Run with captured output
    fn capture(&self, invocation: &Invocation, escalation: &Escalation) -> Result<Captured>;

    /// Run attached to the terminal; returns the exit code
    fn stream(&self, invocation: &Invocation, escalation: &Escalation) -> Result<i32>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn path_exists(&self, path: &Path) -> bool;

    /// Effective UID of this process
    fn effective_uid(&self) -> u32;

    /// Instantaneous whole-machine CPU usage, if it can be sampled
    fn cpu_usage_percent(&self) -> Option<f32>;
}

/// The real machine
#[derive(Debug, Default)]
pub struct LiveHost;

impl LiveHost {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation, escalation: &Escalation) -> (String, Command) {
        let argv = invocation.argv(escalation);
        let program = argv[0].clone();
        let mut cmd = Command::new(&program);
        cmd.args(&argv[1..]);
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        (program, cmd)
    }
}

impl Host for LiveHost {
    fn has_command(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn capture(&self, invocation: &Invocation, escalation: &Escalation) -> Result<Captured> {
        let start = Instant::now();
        let (program, mut cmd) = Self::command(invocation, escalation);
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| HostkeepError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (stdout, stdout_truncated) = truncate_output(&output.stdout);
        let (stderr, stderr_truncated) = truncate_output(&output.stderr);
        let captured = Captured {
            exit_code: exit_code(output.status),
            stdout,
            stderr,
            truncated: stdout_truncated || stderr_truncated,
        };
        debug!(
            command = %invocation.display(escalation),
            exit_code = captured.exit_code,
            truncated = captured.truncated,
            duration_ms = start.elapsed().as_millis() as u64,
            "captured"
        );
        Ok(captured)
    }

    fn stream(&self, invocation: &Invocation, escalation: &Escalation) -> Result<i32> {
        let start = Instant::now();
        let (program, mut cmd) = Self::command(invocation, escalation);
        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| HostkeepError::Spawn { program, source })?;

        let code = exit_code(status);
        debug!(
            command = %invocation.display(escalation),
            exit_code = code,
            duration_ms = start.elapsed().as_millis() as u64,
            "streamed"
        );
        Ok(code)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn effective_uid(&self) -> u32 {
        unsafe { libc::geteuid() }
    }

    fn cpu_usage_percent(&self) -> Option<f32> {
        use sysinfo::{CpuRefreshKind, RefreshKind, System};

        // Usage is a delta; two refreshes are required.
        let refresh = RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage());
        let mut sys = System::new_with_specifics(refresh);
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();
        if sys.cpus().is_empty() {
            return None;
        }
        Some(sys.global_cpu_info().cpu_usage())
    }
}

/// Shell convention: 128 + signal number when the child was killed
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

/// Lossy UTF-8 conversion with a size cap; the flag reports a cut
pub fn truncate_output(bytes: &[u8]) -> (String, bool) {
    let truncated = bytes.len() > MAX_OUTPUT_BYTES;
    let slice = if truncated {
        &bytes[..MAX_OUTPUT_BYTES]
    } else {
        bytes
    };
    (String::from_utf8_lossy(slice).to_string(), truncated)
}
