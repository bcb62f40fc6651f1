//! Service health
//!
//! One line per configured service, in configured order. Units the init
//! system does not know, and failed queries, come back as
//! [`ServiceState::Unknown`]; the configured policy decides whether that is
//! shown as its own label or folded into Inactive.

use super::{probe, Category, Probe, Section};
use crate::config::UnknownServicePolicy;
use crate::exec::{Escalation, Host, Invocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Active,
    Inactive,
    Unknown,
}

impl ServiceState {
    pub fn label(&self, policy: UnknownServicePolicy) -> &'static str {
        match (self, policy) {
            (ServiceState::Active, _) => "Active",
            (ServiceState::Inactive, _) => "Inactive",
            (ServiceState::Unknown, UnknownServicePolicy::Inactive) => "Inactive",
            (ServiceState::Unknown, UnknownServicePolicy::Unknown) => "Unknown",
        }
    }
}

/// Interpret `systemctl show --property=LoadState --property=ActiveState`
pub fn parse_unit_show(output: &str) -> ServiceState {
    let mut load_state = None;
    let mut active_state = None;
    for line in output.lines() {
        match line.split_once('=') {
            Some(("LoadState", value)) => load_state = Some(value.trim()),
            Some(("ActiveState", value)) => active_state = Some(value.trim()),
            _ => {}
        }
    }

    match (load_state, active_state) {
        (Some("not-found"), _) | (None, None) => ServiceState::Unknown,
        (_, Some("active")) | (_, Some("reloading")) => ServiceState::Active,
        (_, Some(_)) => ServiceState::Inactive,
        (Some(_), None) => ServiceState::Unknown,
    }
}

/// Ask the init system about one unit
pub fn query_service(host: &dyn Host, name: &str) -> ServiceState {
    let inv = Invocation::new("systemctl").args([
        "show",
        "--property=LoadState",
        "--property=ActiveState",
        name,
    ]);
    match probe(host, &inv, &Escalation::None) {
        Probe::Output(out) => parse_unit_show(&out),
        Probe::Missing | Probe::Failed(_) => ServiceState::Unknown,
    }
}

/// Every service queried fresh, in configured order
pub fn query_services(host: &dyn Host, names: &[String]) -> Vec<(String, ServiceState)> {
    names
        .iter()
        .map(|name| (name.clone(), query_service(host, name)))
        .collect()
}

pub fn services_section(
    host: &dyn Host,
    names: &[String],
    policy: UnknownServicePolicy,
) -> Section {
    let mut section = Section::new(Category::Services);
    if names.is_empty() {
        section.placeholder("No services configured");
        return section;
    }
    for (name, state) in query_services(host, names) {
        section.field(&name, state.label(policy));
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedHost;

    fn show(unit: &str) -> String {
        format!("systemctl show --property=LoadState --property=ActiveState {}", unit)
    }

    #[test]
    fn test_parse_unit_show() {
        let cases = [
            ("LoadState=loaded\nActiveState=active\n", ServiceState::Active),
            ("ActiveState=reloading\nLoadState=loaded\n", ServiceState::Active),
            ("LoadState=loaded\nActiveState=failed\n", ServiceState::Inactive),
            ("LoadState=not-found\nActiveState=inactive\n", ServiceState::Unknown),
            ("", ServiceState::Unknown),
        ];
        for (output, expected) in cases {
            assert_eq!(parse_unit_show(output), expected, "{:?}", output);
        }
    }

    #[test]
    fn test_one_line_per_service_in_order() {
        let host = ScriptedHost::new()
            .with_command("systemctl")
            .respond(&show("pveproxy"), 0, "LoadState=loaded\nActiveState=active\n", "")
            .respond(&show("corosync"), 0, "LoadState=loaded\nActiveState=inactive\n", "")
            .respond(&show("typo-d"), 0, "LoadState=not-found\nActiveState=inactive\n", "");
        let names: Vec<String> = ["typo-d", "pveproxy", "corosync"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let collapsed = services_section(&host, &names, UnknownServicePolicy::Inactive);
        let rendered: Vec<(String, String)> = collapsed
            .lines
            .iter()
            .map(|l| match l {
                crate::report::Line::Field { label, value } => (label.clone(), value.clone()),
                other => panic!("unexpected line {:?}", other),
            })
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("typo-d".to_string(), "Inactive".to_string()),
                ("pveproxy".to_string(), "Active".to_string()),
                ("corosync".to_string(), "Inactive".to_string()),
            ]
        );

        let explicit = services_section(&host, &names, UnknownServicePolicy::Unknown);
        assert_eq!(explicit.value_of("typo-d"), Some("Unknown"));
    }

    #[test]
    fn test_no_systemctl_means_unknown() {
        let host = ScriptedHost::new();
        assert_eq!(query_service(&host, "pvedaemon"), ServiceState::Unknown);
        let names = vec!["pvedaemon".to_string(), "pveproxy".to_string()];
        let section = services_section(&host, &names, UnknownServicePolicy::Inactive);
        assert_eq!(section.lines.len(), 2);
        assert_eq!(section.value_of("pvedaemon"), Some("Inactive"));
    }
}
