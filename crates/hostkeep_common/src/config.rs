//! hostkeep configuration
//!
//! Configuration lives in /etc/hostkeep/config.toml, overridable with
//! $HOSTKEEP_CONFIG. Every section is optional; a missing file means defaults.
//! The defaults reproduce the stock behaviour on a Proxmox VE host.

use crate::error::{HostkeepError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// System configuration directory
pub const SYSTEM_CONFIG_DIR: &str = "/etc/hostkeep";
const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "HOSTKEEP_CONFIG";

/// Marker identifying the subscription-gated package endpoint
pub const ENTERPRISE_MARKER: &str = "enterprise.proxmox.com";

/// Community post-install script that swaps enterprise sources for no-subscription ones
pub const DEFAULT_REMEDIATION_URL: &str = concat!(
    "https://raw.githubusercontent.com/community-scripts/ProxmoxVE/main/",
    "tools/pve/post-pve-install.sh"
);

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Privilege escalation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeConfig {
    /// Command prefixed to privileged invocations when not running as root
    #[serde(default = "default_escalation_command")]
    pub escalation_command: String,
}

fn default_escalation_command() -> String {
    "sudo".to_string()
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self {
            escalation_command: default_escalation_command(),
        }
    }
}

/// Package manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagesConfig {
    /// Package manager binary (apt-get compatible command line)
    #[serde(default = "default_package_manager")]
    pub manager: String,

    /// Pass -y to upgrade/dist-upgrade/autoremove/install
    #[serde(default = "default_true")]
    pub assume_yes: bool,

    /// Export DEBIAN_FRONTEND=noninteractive to package steps
    #[serde(default)]
    pub noninteractive: bool,
}

fn default_package_manager() -> String {
    "apt-get".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            manager: default_package_manager(),
            assume_yes: true,
            noninteractive: false,
        }
    }
}

/// One repository detection rule: a file and the marker that flags it as enterprise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRule {
    /// Short human label used in console output
    pub label: String,
    /// File to scan
    pub path: PathBuf,
    /// Case-sensitive substring searched on each line
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl RepositoryRule {
    pub fn new(label: &str, path: impl Into<PathBuf>, marker: &str) -> Self {
        Self {
            label: label.to_string(),
            path: path.into(),
            marker: marker.to_string(),
        }
    }
}

fn default_marker() -> String {
    ENTERPRISE_MARKER.to_string()
}

/// Repository detection rule set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<RepositoryRule>,
}

fn default_rules() -> Vec<RepositoryRule> {
    vec![
        RepositoryRule::new(
            "PVE enterprise list",
            "/etc/apt/sources.list.d/pve-enterprise.list",
            ENTERPRISE_MARKER,
        ),
        RepositoryRule::new(
            "PBS enterprise list",
            "/etc/apt/sources.list.d/pbs-enterprise.list",
            ENTERPRISE_MARKER,
        ),
        RepositoryRule::new("main sources list", "/etc/apt/sources.list", ENTERPRISE_MARKER),
    ]
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

/// Remediation script settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationConfig {
    #[serde(default = "default_remediation_url")]
    pub script_url: String,

    /// Optional hex SHA-256 the downloaded script must match before it runs
    #[serde(default)]
    pub sha256: Option<String>,

    /// Download client ensured present before the prompt
    #[serde(default = "default_download_tool")]
    pub download_tool: String,

    /// Interpreter the script is handed to
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_remediation_url() -> String {
    DEFAULT_REMEDIATION_URL.to_string()
}

fn default_download_tool() -> String {
    "curl".to_string()
}

fn default_shell() -> String {
    "bash".to_string()
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            script_url: default_remediation_url(),
            sha256: None,
            download_tool: default_download_tool(),
            shell: default_shell(),
        }
    }
}

/// How services the init system does not know are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownServicePolicy {
    /// Collapse into Inactive (two-state output)
    #[default]
    Inactive,
    /// Render a distinct Unknown label
    Unknown,
}

impl UnknownServicePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnknownServicePolicy::Inactive => "inactive",
            UnknownServicePolicy::Unknown => "unknown",
        }
    }
}

/// Report contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Services checked in the service health section, in display order
    #[serde(default = "default_services")]
    pub services: Vec<String>,

    #[serde(default)]
    pub unknown_services: UnknownServicePolicy,

    /// Mount points shown in the disk section
    #[serde(default = "default_mounts")]
    pub mounts: Vec<String>,

    /// Lines of package history to show
    #[serde(default = "default_history_lines")]
    pub history_lines: usize,

    /// Sample CPU usage (adds a short delay)
    #[serde(default = "default_true")]
    pub sample_cpu_usage: bool,
}

fn default_services() -> Vec<String> {
    [
        "pve-cluster",
        "pvedaemon",
        "pveproxy",
        "pvestatd",
        "pve-firewall",
        "pvescheduler",
        "corosync",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_mounts() -> Vec<String> {
    vec!["/".to_string()]
}

fn default_history_lines() -> usize {
    10
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            services: default_services(),
            unknown_services: UnknownServicePolicy::default(),
            mounts: default_mounts(),
            history_lines: default_history_lines(),
            sample_cpu_usage: true,
        }
    }
}

/// Files read by the report and summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_hostname_path")]
    pub hostname: PathBuf,
    #[serde(default = "default_os_release_path")]
    pub os_release: PathBuf,
    #[serde(default = "default_cpuinfo_path")]
    pub cpuinfo: PathBuf,
    #[serde(default = "default_loadavg_path")]
    pub loadavg: PathBuf,
    #[serde(default = "default_history_log_path")]
    pub history_log: PathBuf,
    #[serde(default = "default_reboot_marker_path")]
    pub reboot_marker: PathBuf,
    #[serde(default = "default_reboot_pkgs_path")]
    pub reboot_packages: PathBuf,
}

fn default_hostname_path() -> PathBuf {
    PathBuf::from("/proc/sys/kernel/hostname")
}

fn default_os_release_path() -> PathBuf {
    PathBuf::from("/etc/os-release")
}

fn default_cpuinfo_path() -> PathBuf {
    PathBuf::from("/proc/cpuinfo")
}

fn default_loadavg_path() -> PathBuf {
    PathBuf::from("/proc/loadavg")
}

fn default_history_log_path() -> PathBuf {
    PathBuf::from("/var/log/apt/history.log")
}

fn default_reboot_marker_path() -> PathBuf {
    PathBuf::from("/var/run/reboot-required")
}

fn default_reboot_pkgs_path() -> PathBuf {
    PathBuf::from("/var/run/reboot-required.pkgs")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname_path(),
            os_release: default_os_release_path(),
            cpuinfo: default_cpuinfo_path(),
            loadavg: default_loadavg_path(),
            history_log: default_history_log_path(),
            reboot_marker: default_reboot_marker_path(),
            reboot_packages: default_reboot_pkgs_path(),
        }
    }
}

/// Complete hostkeep configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostkeepConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub privilege: PrivilegeConfig,

    #[serde(default)]
    pub packages: PackagesConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub remediation: RemediationConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

impl HostkeepConfig {
    /// Load config from $HOSTKEEP_CONFIG or /etc/hostkeep/config.toml
    ///
    /// A missing file yields defaults. A file that cannot be read or parsed
    /// also yields defaults, and the error is handed back so it can be
    /// reported once logging is up.
    pub fn load() -> (Self, Option<HostkeepError>) {
        let path = config_path();
        if !path.exists() {
            return (Self::default(), None);
        }

        match Self::load_from(&path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| HostkeepError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| HostkeepError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.packages.manager.trim().is_empty() {
            return Err(HostkeepError::Config("packages.manager is empty".into()));
        }
        if self.remediation.script_url.trim().is_empty() {
            return Err(HostkeepError::Config("remediation.script_url is empty".into()));
        }
        if let Some(pin) = &self.remediation.sha256 {
            if pin.len() != 64 || !pin.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(HostkeepError::Config(
                    "remediation.sha256 must be 64 hex characters".into(),
                ));
            }
        }
        if let Some(rule) = self.repository.rules.iter().find(|r| r.marker.is_empty()) {
            return Err(HostkeepError::Config(format!(
                "repository rule '{}' has an empty marker",
                rule.label
            )));
        }
        Ok(())
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from(SYSTEM_CONFIG_DIR).join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostkeepConfig::default();
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.privilege.escalation_command, "sudo");
        assert_eq!(config.packages.manager, "apt-get");
        assert!(config.packages.assume_yes);
        assert_eq!(config.repository.rules.len(), 3);
        assert!(config
            .repository
            .rules
            .iter()
            .all(|r| r.marker == ENTERPRISE_MARKER));
        assert_eq!(config.remediation.script_url, DEFAULT_REMEDIATION_URL);
        assert_eq!(config.report.unknown_services, UnknownServicePolicy::Inactive);
        assert_eq!(config.report.services.first().map(String::as_str), Some("pve-cluster"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = HostkeepConfig::from_toml_str(
            r#"
            [report]
            services = ["sshd"]
            unknown_services = "unknown"
            "#,
        )
        .unwrap();
        assert_eq!(config.report.services, vec!["sshd".to_string()]);
        assert_eq!(config.report.unknown_services, UnknownServicePolicy::Unknown);
        assert_eq!(config.report.history_lines, 10);
        assert_eq!(config.repository.rules.len(), 3);
    }

    #[test]
    fn test_rules_replace_defaults() {
        let config = HostkeepConfig::from_toml_str(
            r#"
            [[repository.rules]]
            label = "deb822 enterprise"
            path = "/etc/apt/sources.list.d/pve-enterprise.sources"
            "#,
        )
        .unwrap();
        assert_eq!(config.repository.rules.len(), 1);
        assert_eq!(config.repository.rules[0].marker, ENTERPRISE_MARKER);
    }

    #[test]
    fn test_bad_pin_rejected() {
        let err = HostkeepConfig::from_toml_str(
            r#"
            [remediation]
            sha256 = "abc"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, HostkeepError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = HostkeepConfig::from_toml_str("[report\nservices = ").unwrap_err();
        assert!(matches!(err, HostkeepError::Config(_)));
    }

    #[test]
    fn test_toml_serialization() {
        let config = HostkeepConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[packages]"));
        assert!(toml_str.contains("[[repository.rules]]"));
        assert!(toml_str.contains("[remediation]"));
    }
}
