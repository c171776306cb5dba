//! Heuristic ranking of serial ports: which one is most likely the device.
//!
//! A high score is a guess, not a guarantee. The supervisor still has to
//! open the port to confirm it.

use crate::types::SerialPortCandidate;

/// Substring groups and the weight each contributes. A port collects the
/// weight of every group with at least one matching needle.
const SCORE_RULES: &[(&[&str], u32)] = &[
    (&["pico", "rp2040", "raspberry"], 120),
    (&["esp32", "espressif"], 110),
    (&["usb serial", "uart"], 60),
    (&["ch340", "cp210", "silicon labs"], 60),
    (&["ttyacm", "ttyusb", "com"], 40),
];

/// Score a single port from its descriptive fields.
pub fn score_port(port: &SerialPortCandidate) -> u32 {
    let haystack = [
        port.manufacturer.as_deref(),
        port.pnp_id.as_deref(),
        port.friendly_name.as_deref(),
        port.vendor_id.as_deref(),
        port.product_id.as_deref(),
        Some(port.path.as_str()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    SCORE_RULES
        .iter()
        .filter(|(needles, _)| needles.iter().any(|n| haystack.contains(n)))
        .map(|(_, weight)| weight)
        .sum()
}

/// Score every port and sort by descending score. The sort is stable, so
/// equal scores keep enumeration order.
pub fn rank_candidates(ports: Vec<SerialPortCandidate>) -> Vec<SerialPortCandidate> {
    let mut ranked: Vec<SerialPortCandidate> = ports
        .into_iter()
        .map(|mut p| {
            p.score = score_port(&p);
            p
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silicon_labs_outranks_unknown() {
        let ranked = rank_candidates(vec![
            SerialPortCandidate::new("/dev/ttyS0"),
            SerialPortCandidate::new("/dev/cu.SLAB_USBtoUART")
                .with_manufacturer("Silicon Labs CP2102"),
        ]);
        assert_eq!(ranked[0].path, "/dev/cu.SLAB_USBtoUART");
        assert!(ranked[0].score >= 60);
        assert_eq!(ranked[1].score, 0);
    }

    #[test]
    fn groups_are_additive() {
        let port = SerialPortCandidate::new("/dev/ttyACM0").with_manufacturer("Raspberry Pi");
        // raspberry (120) + ttyacm (40)
        assert_eq!(score_port(&port), 160);
    }

    #[test]
    fn group_counts_once() {
        let port = SerialPortCandidate::new("/dev/ttyUSB0").with_manufacturer("Pico RP2040");
        // pico and rp2040 share a group; ttyusb adds 40
        assert_eq!(score_port(&port), 160);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut port = SerialPortCandidate::new("COM7");
        port.friendly_name = Some("USB-SERIAL CH340".into());
        // ch340 (60) + com (40); "usb-serial" has a dash so usb serial does not match
        assert_eq!(score_port(&port), 100);
    }

    #[test]
    fn vendor_fields_participate() {
        let mut port = SerialPortCandidate::new("/dev/cu.usbmodem1101");
        port.vendor_id = Some("303a".into());
        port.product_id = Some("1001".into());
        port.pnp_id = Some("USB\\VID_303A&PID_1001\\Espressif".into());
        assert_eq!(score_port(&port), 110);
    }

    #[test]
    fn ties_keep_enumeration_order() {
        let ranked = rank_candidates(vec![
            SerialPortCandidate::new("/dev/ttyUSB1"),
            SerialPortCandidate::new("/dev/ttyUSB0"),
            SerialPortCandidate::new("/dev/ttyS0"),
        ]);
        let paths: Vec<&str> = ranked.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, ["/dev/ttyUSB1", "/dev/ttyUSB0", "/dev/ttyS0"]);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(rank_candidates(Vec::new()).is_empty());
    }
}
