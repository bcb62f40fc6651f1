//! Error types for the fail-fast phases
//!
//! Report probes never produce these; they degrade to placeholders instead.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HostkeepError {
    #[error("Not running as root and escalation command '{0}' was not found")]
    NoPrivilege(String),

    #[error("Required tool not found on PATH: {0}")]
    MissingTool(String),

    #[error("Step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl HostkeepError {
    /// Exit status of the failing external step, if that is what went wrong
    pub fn step_code(&self) -> Option<i32> {
        match self {
            Self::StepFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HostkeepError>;
