//! Identity, CPU, memory, disk and network probes

use super::{probe, probe_file, Category, Probe, Section};
use crate::config::PathsConfig;
use crate::exec::{Escalation, Host, Invocation};

const NOT_AVAILABLE: &str = "not available";

pub fn system_section(host: &dyn Host, paths: &PathsConfig) -> Section {
    let mut section = Section::new(Category::System);

    let hostname = probe_file(host, &paths.hostname)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| first_line(probe(host, &Invocation::new("hostname"), &Escalation::None)));
    section.field_or("Hostname", hostname, NOT_AVAILABLE);

    let distribution = probe_file(host, &paths.os_release).and_then(|c| parse_os_release(&c));
    section.field_or("Distribution", distribution, NOT_AVAILABLE);

    let kernel = first_line(probe(host, &Invocation::new("uname").arg("-r"), &Escalation::None));
    section.field_or("Kernel", kernel, NOT_AVAILABLE);

    let uptime = first_line(probe(host, &Invocation::new("uptime").arg("-p"), &Escalation::None))
        .map(|u| u.trim_start_matches("up ").to_string());
    section.field_or("Uptime", uptime, NOT_AVAILABLE);

    section
}

pub fn cpu_section(host: &dyn Host, paths: &PathsConfig, sample_usage: bool) -> Section {
    let mut section = Section::new(Category::Cpu);

    let cpuinfo = probe_file(host, &paths.cpuinfo).map(|c| parse_cpuinfo(&c));
    let (model, cores) = match cpuinfo {
        Some(info) => (info.model, (info.logical_cpus > 0).then_some(info.logical_cpus)),
        None => (None, None),
    };
    section.field_or("Model", model, NOT_AVAILABLE);
    section.field_or("Cores", cores.map(|c| c.to_string()), NOT_AVAILABLE);

    let load = probe_file(host, &paths.loadavg).and_then(|c| parse_loadavg(&c));
    section.field_or("Load average", load, NOT_AVAILABLE);

    if sample_usage {
        let usage = host.cpu_usage_percent().map(|u| format!("{:.1}%", u));
        section.field_or("Usage", usage, NOT_AVAILABLE);
    }

    section
}

pub fn memory_section(host: &dyn Host) -> Section {
    let mut section = Section::new(Category::Memory);
    match probe(host, &Invocation::new("free").arg("-h"), &Escalation::None) {
        Probe::Output(out) => {
            let rows = parse_free(&out);
            if rows.is_empty() {
                section.placeholder("Memory usage not available");
            }
            for row in rows {
                section.field(&row.label, format!("{} used / {} total", row.used, row.total));
            }
        }
        Probe::Missing => section.placeholder("Memory usage not available (free not installed)"),
        Probe::Failed(reason) => {
            section.placeholder(format!("Memory usage not available ({})", reason))
        }
    }
    section
}

pub fn disk_section(host: &dyn Host, mounts: &[String]) -> Section {
    let mut section = Section::new(Category::Disk);
    if !host.has_command("df") {
        section.placeholder("Disk usage not available (df not installed)");
        return section;
    }
    if mounts.is_empty() {
        section.placeholder("No mount points configured");
    }
    for mount in mounts {
        let usage = probe(
            host,
            &Invocation::new("df").args(["-hP", mount.as_str()]),
            &Escalation::None,
        )
        .output()
        .and_then(|out| parse_df(&out));
        match usage {
            Some(d) => section.field(
                &d.mount,
                format!(
                    "{} used of {} ({} full, {} free)",
                    d.used, d.size, d.use_percent, d.available
                ),
            ),
            None => section.placeholder(format!("{}: {}", mount, NOT_AVAILABLE)),
        }
    }
    section
}

pub fn network_section(host: &dyn Host) -> Section {
    let mut section = Section::new(Category::Network);
    let inv = Invocation::new("ip").args(["-brief", "-4", "address", "show"]);
    match probe(host, &inv, &Escalation::None) {
        Probe::Output(out) => {
            let interfaces = parse_ip_brief(&out);
            if interfaces.is_empty() {
                section.placeholder("No IPv4 interfaces configured");
            }
            for iface in interfaces {
                let addrs = if iface.addresses.is_empty() {
                    "no address".to_string()
                } else {
                    iface.addresses.join(", ")
                };
                section.field(&iface.name, format!("{} [{}]", addrs, iface.state));
            }
        }
        Probe::Missing => {
            section.placeholder("Network information not available (ip not installed)")
        }
        Probe::Failed(reason) => {
            section.placeholder(format!("Network information not available ({})", reason))
        }
    }
    section
}

fn first_line(probe: Probe) -> Option<String> {
    probe
        .output()
        .and_then(|out| out.lines().next().map(|l| l.trim().to_string()))
        .filter(|l| !l.is_empty())
}

/// PRETTY_NAME from os-release, quotes stripped
pub fn parse_os_release(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuInfo {
    pub model: Option<String>,
    pub logical_cpus: usize,
}

/// First model name plus the number of processor entries
pub fn parse_cpuinfo(content: &str) -> CpuInfo {
    let mut info = CpuInfo::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "processor" => info.logical_cpus += 1,
            "model name" if info.model.is_none() => {
                info.model = Some(value.trim().to_string()).filter(|v| !v.is_empty())
            }
            _ => {}
        }
    }
    info
}

/// 1, 5 and 15 minute load from /proc/loadavg
pub fn parse_loadavg(content: &str) -> Option<String> {
    let fields: Vec<&str> = content.split_whitespace().take(3).collect();
    (fields.len() == 3).then(|| fields.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRow {
    pub label: String,
    pub total: String,
    pub used: String,
}

/// `Mem:` and `Swap:` rows of `free -h`
pub fn parse_free(output: &str) -> Vec<MemoryRow> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let label = match parts.next()? {
                "Mem:" => "RAM",
                "Swap:" => "Swap",
                _ => return None,
            };
            let total = parts.next()?;
            let used = parts.next()?;
            Some(MemoryRow {
                label: label.to_string(),
                total: total.to_string(),
                used: used.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskUsage {
    pub mount: String,
    pub size: String,
    pub used: String,
    pub available: String,
    pub use_percent: String,
}

/// Last row of POSIX-format `df -hP <mount>`
pub fn parse_df(output: &str) -> Option<DiskUsage> {
    let row = output.lines().skip(1).filter(|l| !l.trim().is_empty()).last()?;
    let parts: Vec<&str> = row.split_whitespace().collect();
    if parts.len() < 6 {
        return None;
    }
    Some(DiskUsage {
        size: parts[1].to_string(),
        used: parts[2].to_string(),
        available: parts[3].to_string(),
        use_percent: parts[4].to_string(),
        mount: parts[5..].join(" "),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub state: String,
    pub addresses: Vec<String>,
}

/// `ip -brief` rows, loopback skipped
pub fn parse_ip_brief(output: &str) -> Vec<Interface> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let state = parts.next()?;
            if name == "lo" {
                return None;
            }
            Some(Interface {
                name: name.split('@').next().unwrap_or(name).to_string(),
                state: state.to_string(),
                addresses: parts.map(str::to_string).collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedHost;

    #[test]
    fn test_parse_os_release() {
        let content = concat!(
            "NAME=\"Debian GNU/Linux\"\n",
            "PRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\n",
            "VERSION_ID=\"12\"\n",
        );
        assert_eq!(
            parse_os_release(content).as_deref(),
            Some("Debian GNU/Linux 12 (bookworm)")
        );
        assert_eq!(parse_os_release("NAME=x\n"), None);
    }

    #[test]
    fn test_parse_cpuinfo_counts_processors() {
        let content = concat!(
            "processor\t: 0\n",
            "model name\t: AMD EPYC 7302P 16-Core Processor\n",
            "\n",
            "processor\t: 1\n",
            "model name\t: AMD EPYC 7302P 16-Core Processor\n",
        );
        let info = parse_cpuinfo(content);
        assert_eq!(info.logical_cpus, 2);
        assert_eq!(info.model.as_deref(), Some("AMD EPYC 7302P 16-Core Processor"));
    }

    #[test]
    fn test_parse_loadavg() {
        assert_eq!(
            parse_loadavg("0.52 0.58 0.59 1/1234 5678\n").as_deref(),
            Some("0.52, 0.58, 0.59")
        );
        assert_eq!(parse_loadavg("0.52\n"), None);
    }

    #[test]
    fn test_parse_free() {
        let out = concat!(
            "        total   used   free  shared  buff/cache  available\n",
            "Mem:     62Gi   18Gi   40Gi   101Mi       4.6Gi       44Gi\n",
            "Swap:   8.0Gi     0B  8.0Gi\n",
        );
        let rows = parse_free(out);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "RAM");
        assert_eq!(rows[0].total, "62Gi");
        assert_eq!(rows[0].used, "18Gi");
        assert_eq!(rows[1].label, "Swap");
        assert_eq!(rows[1].used, "0B");
    }

    #[test]
    fn test_parse_df() {
        let out = "Filesystem            Size  Used Avail Use% Mounted on\n\
                   /dev/mapper/pve-root   94G   12G   78G  14% /\n";
        let usage = parse_df(out).unwrap();
        assert_eq!(usage.mount, "/");
        assert_eq!(usage.size, "94G");
        assert_eq!(usage.use_percent, "14%");
        assert_eq!(parse_df("Filesystem Size\n"), None);
    }

    #[test]
    fn test_parse_ip_brief_skips_loopback() {
        let out = "lo               UNKNOWN        127.0.0.1/8\n\
                   vmbr0            UP             192.168.1.10/24\n\
                   vlan10@eno1      UP             10.0.10.2/24 10.0.10.3/24\n";
        let ifaces = parse_ip_brief(out);
        assert_eq!(ifaces.len(), 2);
        assert_eq!(ifaces[0].name, "vmbr0");
        assert_eq!(ifaces[1].name, "vlan10");
        assert_eq!(ifaces[1].addresses.len(), 2);
    }

    #[test]
    fn test_system_section_falls_back_to_hostname_command() {
        let host = ScriptedHost::new()
            .with_command("hostname")
            .respond("hostname", 0, "pve01\n", "");
        let section = system_section(&host, &PathsConfig::default());
        assert_eq!(section.value_of("Hostname"), Some("pve01"));
        assert_eq!(section.placeholders().count(), 3);
    }

    #[test]
    fn test_disk_section_per_mount() {
        let host = ScriptedHost::new().with_command("df").respond(
            "df -hP /",
            0,
            "Filesystem Size Used Avail Use% Mounted on\n/dev/sda1 50G 10G 40G 20% /\n",
            "",
        );
        let mounts = vec!["/".to_string(), "/var/lib/vz".to_string()];
        let section = disk_section(&host, &mounts);
        assert_eq!(section.value_of("/"), Some("10G used of 50G (20% full, 40G free)"));
        assert_eq!(section.placeholders().collect::<Vec<_>>(), vec!["/var/lib/vz: not available"]);
    }
}
