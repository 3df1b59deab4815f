// ifdnfc/src/transport/usb/mod.rs

#![cfg(feature = "usb")]

//! PN533 USB backend.
//!
//! Connection strings: `usb`, `pn533_usb` (first supported reader) or
//! `usb:BBB:DDD`, `pn533_usb:BBB:DDD` (bus and device address).

use std::sync::Arc;
use std::time::Duration;

use rusb::{DeviceHandle, UsbContext};

use crate::protocol::Frame;
use crate::protocol::pn53x::{self, SamMode, cmd};
use crate::transport::traits::{Backend, Context, Transport};
use crate::types::{Modulation, Property, Target, Technology};
use crate::utils::bytes_to_hex;
use crate::{Error, Result};

mod descriptor;
pub use descriptor::{SUPPORTED_DEVICES, device_name};
use descriptor::find_endpoints;

/// Timeout of short chip commands (configuration, deselect, presence check)
const COMMAND_TIMEOUT_MS: u64 = 1000;

/// Timeout of a single passive activation attempt
const SELECT_TIMEOUT_MS: u64 = 3000;

const READ_BUFFER_LEN: usize = 512;

/// Bus/address filter parsed from a connection string; `None` selects the
/// first supported reader.
pub fn parse_connstring(connstring: &str) -> Result<Option<(u8, u8)>> {
    let mut fields = connstring.split(':');
    match fields.next() {
        Some("usb") | Some("pn533_usb") => {}
        _ => return Err(Error::InvalidConnstring(connstring.to_string())),
    }
    let location = match (fields.next(), fields.next()) {
        (None, None) => None,
        (Some(bus), Some(dev)) => {
            let bus = bus
                .parse::<u8>()
                .map_err(|_| Error::InvalidConnstring(connstring.to_string()))?;
            let dev = dev
                .parse::<u8>()
                .map_err(|_| Error::InvalidConnstring(connstring.to_string()))?;
            Some((bus, dev))
        }
        _ => return Err(Error::InvalidConnstring(connstring.to_string())),
    };
    if fields.next().is_some() {
        return Err(Error::InvalidConnstring(connstring.to_string()));
    }
    Ok(location)
}

/// Backend creating a libusb context.
#[derive(Debug, Default)]
pub struct UsbBackend;

impl UsbBackend {
    /// USB backend.
    pub fn new() -> Self {
        Self
    }
}

impl Backend for UsbBackend {
    fn init(&self) -> Result<Arc<dyn Context>> {
        let ctx = rusb::Context::new().map_err(|e| Error::ContextInit(e.to_string()))?;
        Ok(Arc::new(UsbRadioContext { ctx }))
    }
}

/// libusb context scanning for supported PN53x devices.
pub struct UsbRadioContext {
    ctx: rusb::Context,
}

impl Context for UsbRadioContext {
    fn open(&self, connstring: &str) -> Result<Box<dyn Transport>> {
        let location = parse_connstring(connstring)?;
        for device in self.ctx.devices()?.iter() {
            let dd = device.device_descriptor()?;
            let Some(name) = device_name(dd.vendor_id(), dd.product_id()) else {
                continue;
            };
            if location.is_some_and(|loc| loc != (device.bus_number(), device.address())) {
                continue;
            }
            let Some((in_ep, out_ep, iface)) = find_endpoints(&device) else {
                log::warn!("{}: no bulk endpoints", name);
                continue;
            };

            let mut handle = device.open()?;
            if let Ok(true) = handle.kernel_driver_active(iface) {
                let _ = handle.detach_kernel_driver(iface);
            }
            handle.claim_interface(iface)?;

            let mut transport = Pn533Transport {
                handle,
                in_ep,
                out_ep,
                iface,
                selected: LogicalTarget::default(),
            };
            transport.setup()?;
            log::info!(
                "opened {} at {:03}:{:03}",
                name,
                device.bus_number(),
                device.address()
            );
            return Ok(Box::new(transport));
        }
        Err(Error::DeviceNotFound(connstring.to_string()))
    }

    fn list_devices(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for device in self.ctx.devices()?.iter() {
            let dd = device.device_descriptor()?;
            if device_name(dd.vendor_id(), dd.product_id()).is_some() {
                out.push(format!(
                    "pn533_usb:{:03}:{:03}",
                    device.bus_number(),
                    device.address()
                ));
            }
        }
        Ok(out)
    }
}

/// Logical target number (Tg) used by InDataExchange. InDeselect keeps it;
/// switching the chip mode forgets it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct LogicalTarget(Option<u8>);

impl LogicalTarget {
    fn select(&mut self, tg: Option<u8>) {
        self.0 = tg;
    }

    fn deselect(&mut self) {}

    fn forget(&mut self) {
        self.0 = None;
    }

    fn tg(&self) -> Result<u8> {
        self.0.ok_or_else(|| Error::Radio("no target selected".into()))
    }
}

/// PN533 reader on a claimed USB interface.
pub struct Pn533Transport {
    handle: DeviceHandle<rusb::Context>,
    in_ep: u8,
    out_ep: u8,
    iface: u8,
    selected: LogicalTarget,
}

impl Pn533Transport {
    fn setup(&mut self) -> Result<()> {
        let fw = pn53x::parse_firmware_version(
            &self.command(&pn53x::get_firmware_version(), COMMAND_TIMEOUT_MS)?,
        )?;
        log::debug!(
            "PN53x ic={:#04x} firmware {}.{}",
            fw.ic,
            fw.version,
            fw.revision
        );
        self.command(&pn53x::sam_configuration(SamMode::Normal), COMMAND_TIMEOUT_MS)?;
        Ok(())
    }

    fn read_frame(&mut self, timeout_ms: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; READ_BUFFER_LEN];
        let n = self
            .handle
            .read_bulk(self.in_ep, &mut buf, Duration::from_millis(timeout_ms))
            .map_err(|e| match e {
                rusb::Error::Timeout => Error::Timeout,
                other => other.into(),
            })?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Send one command payload (TFI included) and return the decoded
    /// response payload.
    fn command(&mut self, payload: &[u8], timeout_ms: u64) -> Result<Vec<u8>> {
        let framed = Frame::encode(payload)?;
        log::trace!("TX {}", bytes_to_hex(&framed));
        self.handle.write_bulk(
            self.out_ep,
            &framed,
            Duration::from_millis(COMMAND_TIMEOUT_MS),
        )?;

        let ack = self.read_frame(COMMAND_TIMEOUT_MS)?;
        if !Frame::is_ack(&ack) {
            return Err(Error::FrameFormat(format!(
                "expected ack, got {}",
                bytes_to_hex(&ack)
            )));
        }

        let resp = match self.read_frame(timeout_ms) {
            Ok(r) => r,
            Err(Error::Timeout) => {
                // abort the pending command
                let _ = self.handle.write_bulk(
                    self.out_ep,
                    &Frame::ack(),
                    Duration::from_millis(COMMAND_TIMEOUT_MS),
                );
                return Err(Error::Timeout);
            }
            Err(e) => return Err(e),
        };
        log::trace!("RX {}", bytes_to_hex(&resp));
        Frame::decode(&resp)
    }

    fn list(&mut self, modulation: Modulation, max: u8, uid: Option<&[u8]>) -> Result<Vec<(u8, Target)>> {
        let req = pn53x::in_list_passive_target(modulation, max, uid)?;
        match self.command(&req, SELECT_TIMEOUT_MS) {
            Ok(resp) => pn53x::parse_in_list_passive_target(&resp, modulation),
            Err(Error::Timeout) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

impl Transport for Pn533Transport {
    fn init_initiator(&mut self) -> Result<()> {
        self.command(&pn53x::sam_configuration(SamMode::Normal), COMMAND_TIMEOUT_MS)?;
        self.command(&pn53x::rf_field(true), COMMAND_TIMEOUT_MS)?;
        self.command(&pn53x::max_retries(false), COMMAND_TIMEOUT_MS)?;
        self.selected.forget();
        Ok(())
    }

    fn init_secure_element(&mut self) -> Result<()> {
        self.command(
            &pn53x::sam_configuration(SamMode::WiredCard),
            COMMAND_TIMEOUT_MS,
        )?;
        self.selected.forget();
        Ok(())
    }

    fn set_property_bool(&mut self, property: Property, value: bool) -> Result<()> {
        match property {
            Property::InfiniteSelect => {
                self.command(&pn53x::max_retries(value), COMMAND_TIMEOUT_MS)?;
            }
        }
        Ok(())
    }

    fn select_passive_target(
        &mut self,
        modulation: Modulation,
        uid: Option<&[u8]>,
    ) -> Result<Option<Target>> {
        let found = self.list(modulation, 1, uid)?.into_iter().next();
        self.selected.select(found.as_ref().map(|(tg, _)| *tg));
        Ok(found.map(|(_, target)| target))
    }

    fn list_passive_targets(
        &mut self,
        modulation: Modulation,
        max_targets: usize,
    ) -> Result<Vec<Target>> {
        if max_targets == 0 {
            return Ok(Vec::new());
        }
        let found = self.list(modulation, max_targets.min(2) as u8, None)?;
        self.selected.select(found.first().map(|(tg, _)| *tg));
        Ok(found.into_iter().map(|(_, t)| t).collect())
    }

    fn deselect_target(&mut self) -> Result<()> {
        // Tg 0 releases every selected target
        let resp = self.command(&pn53x::in_deselect(0), COMMAND_TIMEOUT_MS)?;
        pn53x::status_body(&resp, cmd::IN_DESELECT)?;
        self.selected.deselect();
        Ok(())
    }

    fn target_is_present(&mut self, target: &Target) -> Result<bool> {
        match target.technology() {
            Technology::Iso14443a | Technology::Iso14443b => {
                let resp =
                    self.command(&pn53x::diagnose_attention_request(), COMMAND_TIMEOUT_MS)?;
                pn53x::parse_diagnose_attention(&resp)
            }
            _ => {
                let found =
                    self.select_passive_target(target.modulation(), Some(target.uid()))?;
                Ok(found.is_some_and(|t| t.uid() == target.uid()))
            }
        }
    }

    fn transceive_bytes(
        &mut self,
        tx: &[u8],
        rx_capacity: usize,
        timeout_ms: u64,
    ) -> Result<Vec<u8>> {
        let tg = self.selected.tg()?;
        let resp = self.command(&pn53x::in_data_exchange(tg, tx), timeout_ms)?;
        let data = pn53x::status_body(&resp, cmd::IN_DATA_EXCHANGE)?;
        if data.len() > rx_capacity {
            return Err(Error::Overflow {
                received: data.len(),
                capacity: rx_capacity,
            });
        }
        Ok(data.to_vec())
    }
}

impl Drop for Pn533Transport {
    fn drop(&mut self) {
        if let Err(e) = self.command(&pn53x::rf_field(false), COMMAND_TIMEOUT_MS) {
            log::debug!("unable to switch the RF field off: {}", e);
        }
        let _ = self.handle.release_interface(self.iface);
    }
}
