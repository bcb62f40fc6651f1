//! Proxmox VE status: version, cluster membership and workloads
//!
//! Without `pveversion` the host is not treated as a PVE node and the section
//! is a single line. Cluster and workload queries are each optional; a failing
//! `pvecm status` on a standalone node is informative, not an error.

use super::{probe, Category, Probe, Section};
use crate::exec::{Escalation, Host, Invocation};

pub fn platform_section(host: &dyn Host, escalation: &Escalation) -> Section {
    let mut section = Section::new(Category::Platform);

    let version = match probe(host, &Invocation::new("pveversion"), escalation) {
        Probe::Missing => {
            section.placeholder("Not a Proxmox VE host (pveversion not found)");
            return section;
        }
        Probe::Failed(reason) => format!("unknown ({})", reason),
        Probe::Output(out) => out
            .lines()
            .next()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
    };
    section.field("Version", version);

    cluster_lines(host, escalation, &mut section);

    let vms = probe(host, &Invocation::new("qm").arg("list").privileged(), escalation);
    workload_lines(&mut section, "VMs", "qm", vms, parse_qm_list);

    let cts = probe(host, &Invocation::new("pct").arg("list").privileged(), escalation);
    workload_lines(&mut section, "Containers", "pct", cts, parse_pct_list);

    section
}

fn cluster_lines(host: &dyn Host, escalation: &Escalation, section: &mut Section) {
    match probe(host, &Invocation::new("pvecm").arg("status").privileged(), escalation) {
        Probe::Missing => section.placeholder("Cluster: not available (pvecm not installed)"),
        Probe::Failed(_) => section.field("Cluster", "Not part of a cluster (standalone node)"),
        Probe::Output(out) => {
            let status = parse_pvecm_status(&out);
            match status.name {
                Some(name) => section.field("Cluster", name),
                None => section.field("Cluster", "Not part of a cluster (standalone node)"),
            }
            if let Some(quorate) = status.quorate {
                section.field("Quorate", quorate);
            }
            if let Some(nodes) = status.nodes {
                section.field("Nodes", nodes);
            }
        }
    }
}

fn workload_lines(
    section: &mut Section,
    label: &str,
    program: &str,
    probe: Probe,
    parse: fn(&str) -> Vec<Workload>,
) {
    match probe {
        Probe::Missing => {
            section.placeholder(format!("{}: not available ({} not installed)", label, program))
        }
        Probe::Failed(reason) => {
            section.placeholder(format!("{}: not available ({})", label, reason))
        }
        Probe::Output(out) => {
            let workloads = parse(&out);
            let running: Vec<&Workload> = workloads.iter().filter(|w| w.is_running()).collect();
            section.field(
                label,
                format!("{}/{} running", running.len(), workloads.len()),
            );
            for w in running {
                section.text(format!("  {} {}", w.id, w.name));
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStatus {
    pub name: Option<String>,
    pub quorate: Option<String>,
    pub nodes: Option<String>,
}

/// `Key: value` lines of `pvecm status`
pub fn parse_pvecm_status(output: &str) -> ClusterStatus {
    let mut status = ClusterStatus::default();
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "Name" => status.name = Some(value),
            "Quorate" => status.quorate = Some(value),
            "Nodes" => status.nodes = Some(value),
            _ => {}
        }
    }
    status
}

/// A VM or container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub id: u32,
    pub name: String,
    pub status: String,
}

impl Workload {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// `qm list`: VMID NAME STATUS MEM(MB) BOOTDISK(GB) PID
pub fn parse_qm_list(output: &str) -> Vec<Workload> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let id = parts.first()?.parse().ok()?;
            Some(Workload {
                id,
                name: parts.get(1)?.to_string(),
                status: parts.get(2)?.to_string(),
            })
        })
        .collect()
}

/// `pct list`: VMID Status [Lock] Name; the lock column is blank when unlocked
pub fn parse_pct_list(output: &str) -> Vec<Workload> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let id = parts.first()?.parse().ok()?;
            if parts.len() < 3 {
                return None;
            }
            Some(Workload {
                id,
                status: parts[1].to_string(),
                name: parts[parts.len() - 1].to_string(),
            })
        })
        .collect()
}
