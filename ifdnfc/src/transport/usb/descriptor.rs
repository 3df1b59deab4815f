// ifdnfc/src/transport/usb/descriptor.rs

//! Known PN53x USB devices.

use rusb::{Device, Direction, TransferType, UsbContext};

/// PN533 based readers driven over USB bulk endpoints.
pub const SUPPORTED_DEVICES: &[(u16, u16, &str)] = &[
    (0x04cc, 0x2533, "NXP PN533"),
    (0x04e6, 0x5591, "SCM Micro SCL3711"),
    (0x054c, 0x02e1, "Sony RC-S360"),
];

/// Product name of a supported device.
pub fn device_name(vendor_id: u16, product_id: u16) -> Option<&'static str> {
    SUPPORTED_DEVICES
        .iter()
        .find(|(v, p, _)| *v == vendor_id && *p == product_id)
        .map(|(_, _, name)| *name)
}

/// Bulk endpoints of the first interface exposing both directions.
/// Returns (in_endpoint, out_endpoint, interface_number).
pub fn find_endpoints<C: UsbContext>(device: &Device<C>) -> Option<(u8, u8, u8)> {
    let config = device.active_config_descriptor().ok()?;
    for interface in config.interfaces() {
        for desc in interface.descriptors() {
            let mut in_ep = None;
            let mut out_ep = None;
            for ep in desc.endpoint_descriptors() {
                if ep.transfer_type() != TransferType::Bulk {
                    continue;
                }
                match ep.direction() {
                    Direction::In if in_ep.is_none() => in_ep = Some(ep.address()),
                    Direction::Out if out_ep.is_none() => out_ep = Some(ep.address()),
                    _ => {}
                }
            }
            if let (Some(i), Some(o)) = (in_ep, out_ep) {
                return Some((i, o, desc.interface_number()));
            }
        }
    }
    None
}
