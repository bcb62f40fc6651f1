//! End-to-end runs of the maintenance pipeline against a scripted host
//!
//! Covers the operator-visible scenarios:
//! - community host: no prompt, no remediation, packages updated
//! - enterprise marker declined: no remediation, packages still updated
//! - enterprise marker accepted: remediation script fetched and run once
//! - no Proxmox tooling: platform section is a single line, run completes
//! - missing optional sources: placeholders, the rest renders normally

use hostkeep_common::config::{HostkeepConfig, DEFAULT_REMEDIATION_URL};
use hostkeep_common::error::HostkeepError;
use hostkeep_common::pipeline::Pipeline;
use hostkeep_common::remediation::RemoteScript;
use hostkeep_common::report::{Category, Report, SystemReportAggregator};
use hostkeep_common::repository::{RepositoryMode, ResolverOutcome};
use hostkeep_common::scripted::{ScriptedHost, ScriptedPrompter};
use hostkeep_common::ui::Console;
use hostkeep_common::Escalation;

const MAIN_LIST: &str = "/etc/apt/sources.list";
const PBS_LIST: &str = "/etc/apt/sources.list.d/pbs-enterprise.list";
const COMMUNITY: &str = "deb http://download.proxmox.com/debian/pve bookworm pve-no-subscription\n";
const ENTERPRISE: &str = "deb https://enterprise.proxmox.com/debian/pbs bookworm pbs-enterprise\n";

const SENSORS: &str = "coretemp-isa-0000\nPackage id 0:  +42.0°C  (high = +80.0°C)\n";

const UPDATE_CYCLE: [&str; 5] = [
    "apt-get update",
    "apt-get upgrade -y",
    "apt-get dist-upgrade -y",
    "apt-get autoremove -y",
    "apt-get autoclean",
];

/// Root on a host with the package tooling, curl and bash
fn base_host() -> ScriptedHost {
    ScriptedHost::new()
        .with_command("apt-get")
        .with_command("systemctl")
        .with_command("curl")
        .with_command("bash")
        .with_file("/proc/sys/kernel/hostname", "pve01\n")
}

fn pve_host() -> ScriptedHost {
    base_host()
        .with_command("pveversion")
        .respond("pveversion", 0, "pve-manager/8.2.4/faa83925c9641325\n", "")
        .with_command("sensors")
        .respond("sensors", 0, SENSORS, "")
}

fn aggregate(host: &ScriptedHost, config: &HostkeepConfig) -> Report {
    SystemReportAggregator::new(host, &Escalation::None, &config.report, &config.paths).aggregate()
}

struct Run {
    result: Result<hostkeep_common::RunSummary, HostkeepError>,
    output: String,
    questions: usize,
}

fn run(host: &ScriptedHost, answers: &[&str]) -> Run {
    let config = HostkeepConfig::default();
    let provider = RemoteScript::from_config(&config.remediation);
    let mut prompter = ScriptedPrompter::typed(answers);
    let mut console = Console::new(Vec::new(), false);

    let result = Pipeline::new(host, &config).run(&mut console, &mut prompter, &provider);
    Run {
        result,
        output: String::from_utf8(console.into_inner()).unwrap(),
        questions: prompter.questions().len(),
    }
}

fn package_steps(host: &ScriptedHost) -> Vec<String> {
    host.streamed()
        .into_iter()
        .filter(|line| line.starts_with("apt-get"))
        .collect()
}

// ============================================================================
// Repository resolver scenarios
// ============================================================================

#[test]
fn test_community_host_skips_remediation() {
    let host = pve_host().with_file(MAIN_LIST, COMMUNITY);
    let run = run(&host, &["y\n"]);

    let summary = run.result.unwrap();
    assert_eq!(summary.resolver, ResolverOutcome::NotNeeded(RepositoryMode::Community));
    assert_eq!(run.questions, 0);
    assert_eq!(host.streamed_count("bash"), 0);
    assert!(!host.captured().iter().any(|c| c.starts_with("curl")));
    assert_eq!(package_steps(&host), UPDATE_CYCLE.to_vec());
    assert!(run.output.contains("[OK] No enterprise repositories found, no remediation needed"));
}

#[test]
fn test_enterprise_declined_still_updates() {
    let host = pve_host().with_file(MAIN_LIST, ENTERPRISE);
    let run = run(&host, &["n\n"]);

    let summary = run.result.unwrap();
    assert_eq!(summary.resolver, ResolverOutcome::Declined);
    assert_eq!(run.questions, 1);
    assert_eq!(host.streamed_count("bash"), 0);
    assert_eq!(package_steps(&host), UPDATE_CYCLE.to_vec());
}

#[test]
fn test_enterprise_accepted_runs_script_once() {
    let host = pve_host()
        .with_file(PBS_LIST, ENTERPRISE)
        .respond(
            &format!("curl -fsSL {}", DEFAULT_REMEDIATION_URL),
            0,
            "#!/usr/bin/env bash\necho fixing repositories\n",
            "",
        );
    let run = run(&host, &["Y\n"]);

    let summary = run.result.unwrap();
    assert_eq!(summary.resolver, ResolverOutcome::Remediated);
    let fetches: Vec<String> = host
        .captured()
        .into_iter()
        .filter(|c| c.starts_with("curl"))
        .collect();
    assert_eq!(fetches, vec![format!("curl -fsSL {}", DEFAULT_REMEDIATION_URL)]);
    assert_eq!(host.streamed_count("bash"), 1);

    // Remediation runs before the update cycle.
    let streamed = host.streamed();
    assert!(streamed[0].starts_with("bash "));
    assert_eq!(streamed[1..].to_vec(), UPDATE_CYCLE.to_vec());
}

#[test]
fn test_failed_remediation_does_not_stop_updates() {
    let host = pve_host()
        .with_file(MAIN_LIST, ENTERPRISE)
        .respond(&format!("curl -fsSL {}", DEFAULT_REMEDIATION_URL), 22, "", "404");
    let run = run(&host, &["y\n"]);

    let summary = run.result.unwrap();
    assert!(matches!(summary.resolver, ResolverOutcome::RemediationFailed(_)));
    assert_eq!(host.streamed_count("bash"), 0);
    assert_eq!(package_steps(&host), UPDATE_CYCLE.to_vec());
    assert!(run.output.contains("[ERROR] Repository remediation failed"));
}

// ============================================================================
// Fail-fast phases
// ============================================================================

#[test]
fn test_no_privilege_stops_before_anything_runs() {
    let host = pve_host().with_uid(1000).with_file(MAIN_LIST, ENTERPRISE);
    let run = run(&host, &["y\n"]);

    assert!(matches!(run.result, Err(HostkeepError::NoPrivilege(_))));
    assert_eq!(run.questions, 0);
    assert!(host.streamed().is_empty());
}

#[test]
fn test_non_root_escalates_every_package_step() {
    let host = pve_host().with_uid(1000).with_command("sudo").with_file(MAIN_LIST, COMMUNITY);
    let run = run(&host, &[]);

    assert_eq!(run.result.unwrap().escalation, Escalation::Command("sudo".to_string()));
    let steps: Vec<String> = UPDATE_CYCLE.iter().map(|s| format!("sudo {}", s)).collect();
    assert_eq!(host.streamed(), steps);
}

#[test]
fn test_failed_step_aborts_before_report() {
    let host = pve_host()
        .with_file(MAIN_LIST, COMMUNITY)
        .respond_stream("apt-get upgrade -y", 100);
    let run = run(&host, &[]);

    let err = run.result.unwrap_err();
    assert_eq!(err.step_code(), Some(100));
    assert_eq!(package_steps(&host), UPDATE_CYCLE[..2].to_vec());
    assert!(!run.output.contains("Maintenance completed"));
    assert!(!run.output.contains("Temperatures"));
}

#[test]
fn test_missing_package_manager() {
    let host = ScriptedHost::new().with_file(MAIN_LIST, COMMUNITY);
    let run = run(&host, &[]);
    assert!(matches!(run.result, Err(HostkeepError::MissingTool(tool)) if tool == "apt-get"));
}

// ============================================================================
// Report tolerance
// ============================================================================

#[test]
fn test_non_pve_host_still_reaches_summary() {
    let host = base_host().with_file(MAIN_LIST, COMMUNITY);
    let run = run(&host, &[]);

    assert!(run.result.is_ok());
    assert!(run.output.contains("Not a Proxmox VE host (pveversion not found)"));
    assert!(run.output.contains("[OK] Maintenance completed at "));
}

#[test]
fn test_missing_sensors_only_affects_temperatures() {
    let host = base_host()
        .with_command("pveversion")
        .respond("pveversion", 0, "pve-manager/8.2.4\n", "")
        .with_file(MAIN_LIST, COMMUNITY);
    let config = HostkeepConfig::default();
    let report = aggregate(&host, &config);

    let temps = report.section(Category::Temperatures).unwrap();
    assert_eq!(temps.lines.len(), 1);
    assert_eq!(temps.placeholders().count(), 1);
    let platform = report.section(Category::Platform).unwrap();
    assert_eq!(platform.value_of("Version"), Some("pve-manager/8.2.4"));
    assert_eq!(
        report.section(Category::System).unwrap().value_of("Hostname"),
        Some("pve01")
    );
}

#[test]
fn test_report_with_no_tools_at_all() {
    let host = ScriptedHost::new();
    let config = HostkeepConfig::default();
    let report = aggregate(&host, &config);

    assert_eq!(report.sections.len(), Category::ALL.len());
    for section in &report.sections {
        if section.category == Category::Services {
            continue;
        }
        assert!(
            section.placeholders().count() > 0,
            "{:?} should degrade to placeholders",
            section.category
        );
    }

    // Services keep one two-state line each even without an init system.
    let services = report.section(Category::Services).unwrap();
    assert_eq!(services.lines.len(), config.report.services.len());
    for name in &config.report.services {
        assert_eq!(services.value_of(name), Some("Inactive"));
    }
}

#[test]
fn test_reboot_hint_in_summary() {
    let host = pve_host()
        .with_file(MAIN_LIST, COMMUNITY)
        .with_file("/var/run/reboot-required", "")
        .with_file("/var/run/reboot-required.pkgs", "proxmox-kernel-6.8\n");
    let run = run(&host, &[]);

    let summary = run.result.unwrap();
    assert_eq!(summary.reboot.unwrap().packages, vec!["proxmox-kernel-6.8"]);
    assert!(run.output.contains("[WARN] A reboot is required by: proxmox-kernel-6.8"));
}
