//! `arcade ports`: local serial port enumeration, no daemon needed.

use std::sync::Arc;

use arcade_core::SerialPortCandidate;
use arcade_serial::{SerialDeviceRegistry, SystemSerial};

pub async fn cmd_ports() -> anyhow::Result<()> {
    let registry = SerialDeviceRegistry::new(Arc::new(SystemSerial));
    let ports = registry.list_candidates().await;
    print!("{}", format_ports(&ports));
    Ok(())
}

/// One row per port, best first: score, path, then whatever the OS told us.
pub(crate) fn format_ports(ports: &[SerialPortCandidate]) -> String {
    if ports.is_empty() {
        return "(no serial ports found)\n".to_string();
    }
    let width = ports.iter().map(|p| p.path.len()).max().unwrap_or(0);
    let mut out = String::new();
    for port in ports {
        let mut details = Vec::new();
        if let Some(m) = &port.manufacturer {
            details.push(m.clone());
        }
        if let Some(name) = &port.friendly_name {
            details.push(name.clone());
        }
        if let (Some(vid), Some(pid)) = (&port.vendor_id, &port.product_id) {
            details.push(format!("{vid}:{pid}"));
        }
        let line = format!("{:>4}  {:<width$}  {}", port.score, port.path, details.join(", "));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
