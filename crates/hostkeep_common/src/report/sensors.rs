//! Temperatures from lm-sensors

use super::{probe, Category, Probe, Section};
use crate::exec::{Escalation, Host, Invocation};

/// `label: reading` for every line of `sensors` carrying a Celsius value
///
/// Threshold annotations such as `(high = +80.0°C, crit = +100.0°C)` are
/// dropped.
pub fn parse_sensors(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let (label, rest) = line.split_once(':')?;
            let reading = rest.split('(').next().unwrap_or(rest).trim();
            if !reading.contains("°C") {
                return None;
            }
            Some((label.trim().to_string(), reading.to_string()))
        })
        .collect()
}

pub fn temperatures_section(host: &dyn Host) -> Section {
    let mut section = Section::new(Category::Temperatures);
    match probe(host, &Invocation::new("sensors"), &Escalation::None) {
        Probe::Missing => {
            section.placeholder("Temperature sensors not available (lm-sensors not installed)")
        }
        Probe::Failed(reason) => {
            section.placeholder(format!("Temperature sensors not available ({})", reason))
        }
        Probe::Output(out) => {
            let readings = parse_sensors(&out);
            if readings.is_empty() {
                section.placeholder("No temperature readings reported");
            }
            for (label, reading) in readings {
                section.field(&label, reading);
            }
        }
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedHost;

    const SENSORS: &str = "k10temp-pci-00c3\n\
        Adapter: PCI adapter\n\
        Tctl:         +45.8°C\n\
        \n\
        nvme-pci-0100\n\
        Adapter: PCI adapter\n\
        Composite:    +38.9°C  (low  = -273.1°C, high = +84.8°C)\n\
        fan1:        1200 RPM\n";

    #[test]
    fn test_parse_sensors_keeps_celsius_lines() {
        assert_eq!(
            parse_sensors(SENSORS),
            vec![
                ("Tctl".to_string(), "+45.8°C".to_string()),
                ("Composite".to_string(), "+38.9°C".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_sensors_is_placeholder() {
        let section = temperatures_section(&ScriptedHost::new());
        assert_eq!(
            section.placeholders().collect::<Vec<_>>(),
            vec!["Temperature sensors not available (lm-sensors not installed)"]
        );
    }

    #[test]
    fn test_sensors_without_readings() {
        let host = ScriptedHost::new()
            .with_command("sensors")
            .respond("sensors", 0, "fan1: 1200 RPM\n", "");
        let section = temperatures_section(&host);
        assert_eq!(section.placeholders().next(), Some("No temperature readings reported"));
    }
}
