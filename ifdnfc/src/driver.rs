// ifdnfc/src/driver.rs

//! Safe IFD handler entrypoints. [`crate::ifdhandler`] exposes them over the
//! pcsc-lite C ABI; tests and embedders can drive them directly.

use std::sync::Arc;

use crate::atr::{AtrBuilder, PcscAtrBuilder};
use crate::config::DriverConfig;
use crate::constants::{CONNSTRING_SEPARATOR, IFDNFC_CTRL_ACTIVE, SCARD_PROTOCOL_T1, tag};
use crate::control::{ControlRequest, ControlResponse};
use crate::registry::{Registry, SlotHandle};
use crate::slot::Slot;
use crate::transport::Backend;
use crate::types::{Atr, Lun, Mode, PowerAction};
use crate::{Error, Result};

/// Translate a pcscd libudev device name
/// (`usb:<vid>/<pid>:libudev:<ifn>:/dev/bus/usb/<bus>/<dev>`) into the
/// `usb:<bus>:<dev>` connection string.
///
/// Returns `None` when `name` is not a libudev name at all and
/// `Some(None)` when it is one but the device path cannot be read.
pub fn parse_usb_device_name(name: &str) -> Option<Option<String>> {
    let rest = name.strip_prefix("usb:")?;
    let mut fields = rest.splitn(4, ':');
    let vidpid = fields.next()?;
    let _driver = fields.next()?;
    let _ifn = fields.next()?;
    let devpath = fields.next()?;
    if !vidpid.contains('/') {
        return None;
    }

    let location = devpath.strip_prefix("/dev/bus/usb/").and_then(|p| {
        let (bus, dev) = p.split_once('/')?;
        let valid = |s: &str| !s.is_empty() && s.len() <= 3 && !s.contains('/');
        (valid(bus) && valid(dev)).then(|| format!("usb:{}:{}", bus, dev))
    });
    Some(location)
}

/// The IFD handler: a registry of slots sharing one radio context.
pub struct Driver {
    registry: Registry,
    config: Arc<DriverConfig>,
    atr_builder: Arc<dyn AtrBuilder>,
}

impl Driver {
    /// Driver with the default configuration.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_config(backend, DriverConfig::default())
    }

    /// Driver with an explicit configuration.
    pub fn with_config(backend: Arc<dyn Backend>, config: DriverConfig) -> Self {
        Self {
            registry: Registry::new(backend, config.max_devices),
            config: Arc::new(config),
            atr_builder: Arc::new(PcscAtrBuilder),
        }
    }

    /// Replace the ATR builder used for slots created from now on.
    pub fn with_atr_builder(mut self, builder: Arc<dyn AtrBuilder>) -> Self {
        self.atr_builder = builder;
        self
    }

    /// Configuration shared by every slot.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Slot registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Slot allocated for `lun`.
    pub fn slot(&self, lun: Lun) -> Result<SlotHandle> {
        self.registry.lookup(lun)
    }

    /// IFDHCreateChannelByName
    pub fn create_channel_by_name(&self, lun: Lun, name: &str) -> Result<()> {
        let config = Arc::clone(&self.config);
        let builder = Arc::clone(&self.atr_builder);
        let handle = self
            .registry
            .allocate(lun, move |ctx| Slot::new(lun, ctx, config, builder))?;
        let mut slot = handle.lock();

        let connstring = match parse_usb_device_name(name) {
            Some(location) => location,
            None if name.contains(CONNSTRING_SEPARATOR) => Some(name.to_string()),
            None => None,
        };
        if let Some(cs) = connstring {
            if let Err(e) = slot.connect(Some(&cs)) {
                log::debug!("lun {}: '{}' not opened yet: {}", lun, cs, e);
            }
            slot.set_mode(Mode::Active);
        }

        if slot.is_connected() {
            log::debug!("DEVICENAME '{}' is used by the radio stack", name);
        } else {
            log::debug!("DEVICENAME '{}' is not used", name);
        }
        log::info!("IFD handler for NFC devices is ready (lun {})", lun);
        Ok(())
    }

    /// IFDHCreateChannel
    pub fn create_channel(&self, lun: Lun, channel: u64) -> Result<()> {
        self.create_channel_by_name(lun, &format!("/dev/pcsc/{}", channel))
    }

    /// IFDHCloseChannel
    pub fn close_channel(&self, lun: Lun) -> Result<()> {
        let handle = self.registry.lookup(lun)?;
        {
            let mut slot = handle.lock();
            slot.disconnect();
            slot.forget_connstring();
        }
        self.registry.release(lun)?;
        Ok(())
    }

    /// IFDHGetCapabilities. `capacity` is the size of the caller's buffer.
    pub fn get_capabilities(&self, lun: Lun, tag: u32, capacity: usize) -> Result<Vec<u8>> {
        let handle = self.registry.lookup(lun)?;
        let slot = handle.lock();
        match tag {
            tag::TAG_IFD_ATR | tag::SCARD_ATTR_ATR_STRING => {
                if !slot.is_present() {
                    return Err(Error::NotConnected);
                }
                let atr = slot.atr();
                if capacity < atr.len() {
                    return Err(Error::BufferTooSmall {
                        needed: atr.len(),
                        available: capacity,
                    });
                }
                Ok(atr.as_bytes().to_vec())
            }
            tag::TAG_IFD_SIMULTANEOUS_ACCESS => {
                if capacity < 1 {
                    return Err(Error::InsufficientBuffer {
                        needed: 1,
                        available: capacity,
                    });
                }
                Ok(vec![self.config.max_devices.min(u8::MAX as usize) as u8])
            }
            tag::TAG_IFD_THREAD_SAFE => {
                if capacity < 1 {
                    return Err(Error::BufferTooSmall {
                        needed: 1,
                        available: capacity,
                    });
                }
                Ok(vec![0])
            }
            tag::TAG_IFD_SLOTS_NUMBER => {
                if capacity < 1 {
                    return Err(Error::BufferTooSmall {
                        needed: 1,
                        available: capacity,
                    });
                }
                Ok(vec![1])
            }
            tag::TAG_IFD_POLLING_THREAD_KILLABLE
            | tag::TAG_IFD_STOP_POLLING_THREAD
            | tag::TAG_IFD_POLLING_THREAD_WITH_TIMEOUT => {
                Err(Error::NotSupported(format!("polling tag {:#06x}", tag)))
            }
            other => {
                log::error!("tag {:08x} ({}) not supported", other, other);
                Err(Error::UnsupportedTag(other))
            }
        }
    }

    /// IFDHSetCapabilities: nothing is writable.
    pub fn set_capabilities(&self, _lun: Lun, _tag: u32, _value: &[u8]) -> Result<()> {
        Err(Error::ReadOnly)
    }

    /// IFDHSetProtocolParameters: only T=1 is spoken.
    pub fn set_protocol_parameters(&self, _lun: Lun, protocol: u32) -> Result<()> {
        if protocol != SCARD_PROTOCOL_T1 {
            return Err(Error::ProtocolNotSupported(protocol));
        }
        Ok(())
    }

    /// IFDHPowerICC. `capacity` is the size of the caller's ATR buffer.
    pub fn power_icc(&self, lun: Lun, action: u32, capacity: usize) -> Result<Atr> {
        let handle = self.registry.lookup(lun)?;
        let mut slot = handle.lock();
        if !slot.is_connected() {
            return Err(Error::NotConnected);
        }
        let action = PowerAction::try_from(action).inspect_err(|e| {
            log::error!("{}", e);
        })?;
        let atr = match action {
            PowerAction::PowerDown => slot.power_down()?,
            PowerAction::Reset => slot.reset()?,
            PowerAction::PowerUp => slot.power_up()?,
        };
        if capacity < atr.len() {
            return Err(Error::BufferTooSmall {
                needed: atr.len(),
                available: capacity,
            });
        }
        Ok(atr)
    }

    /// IFDHTransmitToICC. `capacity` is the size of the caller's receive
    /// buffer.
    pub fn transmit_to_icc(&self, lun: Lun, apdu: &[u8], capacity: usize) -> Result<Vec<u8>> {
        let handle = self.registry.lookup(lun)?;
        let mut slot = handle.lock();
        slot.transmit(apdu, capacity)
    }

    /// IFDHICCPresence
    pub fn icc_presence(&self, lun: Lun) -> Result<bool> {
        let handle = self.registry.lookup(lun)?;
        let mut slot = handle.lock();
        Ok(slot.icc_presence())
    }

    /// IFDHControl. `capacity` must equal the response size.
    pub fn control(&self, lun: Lun, code: u32, request: &[u8], capacity: usize) -> Result<Vec<u8>> {
        let handle = self.registry.lookup(lun)?;
        if code != IFDNFC_CTRL_ACTIVE {
            return Err(Error::NotSupported(format!("control code {:#010x}", code)));
        }
        if capacity != ControlResponse::LEN {
            return Err(Error::InvalidLength {
                expected: ControlResponse::LEN,
                actual: capacity,
            });
        }
        let request = ControlRequest::decode(request)?;
        let mut slot = handle.lock();
        let response = slot.handle_control(&request)?;
        Ok(response.encode().to_vec())
    }
}
