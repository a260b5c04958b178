// Serial port discovery for `--list-ports`

use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use std::collections::HashSet;

/// Port entry as printed by `--list-ports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSummary {
    pub port_name: String,
    pub port_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl From<&SerialPortInfo> for PortSummary {
    fn from(info: &SerialPortInfo) -> Self {
        match &info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                port_name: info.port_name.clone(),
                port_type: "usb".to_string(),
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product.clone(),
            },
            other => Self {
                port_name: info.port_name.clone(),
                port_type: match other {
                    SerialPortType::PciPort => "pci",
                    SerialPortType::BluetoothPort => "bluetooth",
                    _ => "unknown",
                }
                .to_string(),
                vid: None,
                pid: None,
                product: None,
            },
        }
    }
}

/// Return the list of available serial ports, deduplicated and sorted so
/// that USB/ACM adapters come before built-in UARTs.
pub fn available_ports_sorted() -> Vec<SerialPortInfo> {
    match serialport::available_ports() {
        Ok(ports) => sort_and_dedup_ports(ports),
        Err(err) => {
            log::warn!("Port enumeration failed: {err}");
            Vec::new()
        }
    }
}

pub(crate) fn sort_and_dedup_ports(raw_ports: Vec<SerialPortInfo>) -> Vec<SerialPortInfo> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut ports: Vec<SerialPortInfo> = raw_ports
        .into_iter()
        .filter(|p| seen.insert(dedup_key(p)))
        .collect();

    ports.sort_by(|a, b| {
        priority(&a.port_name)
            .cmp(&priority(&b.port_name))
            .then_with(|| a.port_name.cmp(&b.port_name))
    });
    ports
}

fn base_name(port_name: &str) -> String {
    port_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(port_name)
        .to_lowercase()
}

fn dedup_key(port: &SerialPortInfo) -> String {
    let base = base_name(&port.port_name);
    match &port.port_type {
        SerialPortType::UsbPort(usb) => format!("{base}:vid={:04x}:pid={:04x}", usb.vid, usb.pid),
        _ => base,
    }
}

fn priority(name: &str) -> i32 {
    let n = name.to_lowercase();
    if n.contains("ttyusb") || n.contains("usb") {
        0
    } else if n.contains("acm") {
        1
    } else if n.contains("serial")
        || n.contains("ttys")
        || n.contains("ttyama")
        || n.starts_with("com")
    {
        2
    } else {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn make(name: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::Unknown,
        }
    }

    fn usb(name: &str, vid: u16, pid: u16) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid,
                serial_number: None,
                manufacturer: None,
                product: Some("CP2102".to_string()),
            }),
        }
    }

    #[test]
    fn test_usb_and_acm_sort_first() {
        let input = vec![
            make("/dev/ttyS1"),
            make("/dev/serial0"),
            make("/dev/ttyACM0"),
            make("/dev/ttyUSB0"),
            make("/dev/ttyS0"),
        ];
        let names: Vec<String> = sort_and_dedup_ports(input)
            .into_iter()
            .map(|p| p.port_name)
            .collect();
        assert_eq!(
            names,
            vec!["/dev/ttyUSB0", "/dev/ttyACM0", "/dev/serial0", "/dev/ttyS0", "/dev/ttyS1"]
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let input = vec![
            usb("/dev/ttyUSB0", 0x10c4, 0xea60),
            usb("/dev/ttyUSB0", 0x10c4, 0xea60),
            make("/dev/ttyS0"),
            make("/dev/ttyS0"),
        ];
        assert_eq!(sort_and_dedup_ports(input).len(), 2);
    }

    #[test]
    fn test_summary_reports_usb_ids() {
        let summary = PortSummary::from(&usb("/dev/ttyUSB0", 0x10c4, 0xea60));
        assert_eq!(summary.port_type, "usb");
        assert_eq!(summary.vid, Some(0x10c4));
        assert_eq!(summary.pid, Some(0xea60));

        let json = serde_json::to_string(&PortSummary::from(&make("/dev/ttyS0"))).unwrap();
        assert_eq!(json, r#"{"port_name":"/dev/ttyS0","port_type":"unknown"}"#);
    }
}
