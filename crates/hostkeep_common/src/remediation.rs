//! Remediation providers
//!
//! The trust boundary for switching repositories lives here: a provider
//! fetches whatever it runs, may verify it, and executes it with escalation.

use crate::config::RemediationConfig;
use crate::error::{HostkeepError, Result};
use crate::exec::{Escalation, Host, Invocation, MAX_OUTPUT_BYTES};
use sha2::{Digest, Sha256};
use std::io::Write;
use tracing::{debug, info};

/// Exit status of a remediation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemediationOutcome {
    pub exit_code: i32,
}

impl RemediationOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Something that can move the host off enterprise repositories
pub trait RemediationProvider {
    /// Short description shown in the confirmation question
    fn describe(&self) -> String;

    fn remediate(&self, host: &dyn Host, escalation: &Escalation) -> Result<RemediationOutcome>;
}

/// Download a script over HTTPS and run it with escalation
#[derive(Debug, Clone)]
pub struct RemoteScript {
    url: String,
    sha256: Option<String>,
    download_tool: String,
    shell: String,
}

impl RemoteScript {
    pub fn from_config(config: &RemediationConfig) -> Self {
        Self {
            url: config.script_url.clone(),
            sha256: config.sha256.as_ref().map(|s| s.to_ascii_lowercase()),
            download_tool: config.download_tool.clone(),
            shell: config.shell.clone(),
        }
    }

    /// Fetch the script body
    pub fn fetch(&self, host: &dyn Host) -> Result<String> {
        let fetch = Invocation::new(&self.download_tool).args(["-fsSL", self.url.as_str()]);
        let captured = host.capture(&fetch, &Escalation::None)?;
        if !captured.success() {
            return Err(HostkeepError::Download {
                url: self.url.clone(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.download_tool,
                    captured.exit_code,
                    captured.stderr.trim()
                ),
            });
        }
        if captured.truncated {
            return Err(HostkeepError::Download {
                url: self.url.clone(),
                reason: format!("response larger than {} bytes", MAX_OUTPUT_BYTES),
            });
        }
        if captured.stdout.trim().is_empty() {
            return Err(HostkeepError::Download {
                url: self.url.clone(),
                reason: "empty response".to_string(),
            });
        }
        Ok(captured.stdout)
    }

    /// Check the script against the configured pin, if any
    pub fn verify(&self, script: &str) -> Result<()> {
        let Some(expected) = &self.sha256 else {
            debug!(url = %self.url, "no checksum pinned, running unverified");
            return Ok(());
        };

        let actual = hex::encode(Sha256::digest(script.as_bytes()));
        if &actual != expected {
            return Err(HostkeepError::IntegrityMismatch {
                url: self.url.clone(),
                expected: expected.clone(),
                actual,
            });
        }
        info!(url = %self.url, "remediation script checksum verified");
        Ok(())
    }
}

impl RemediationProvider for RemoteScript {
    fn describe(&self) -> String {
        format!("the community script at {}", self.url)
    }

    fn remediate(&self, host: &dyn Host, escalation: &Escalation) -> Result<RemediationOutcome> {
        let script = self.fetch(host)?;
        self.verify(&script)?;

        // Staged on disk so the script keeps the terminal for its own prompts.
        let mut staged = tempfile::Builder::new()
            .prefix("hostkeep-remediation-")
            .suffix(".sh")
            .tempfile()
            .map_err(|source| HostkeepError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        staged
            .write_all(script.as_bytes())
            .and_then(|_| staged.flush())
            .map_err(|source| HostkeepError::Io {
                path: staged.path().to_path_buf(),
                source,
            })?;

        let path = staged.path().to_string_lossy().to_string();
        let run = Invocation::new(&self.shell).arg(&path).privileged();
        let exit_code = host.stream(&run, escalation)?;
        Ok(RemediationOutcome { exit_code })
    }
}
