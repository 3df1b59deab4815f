// ifdnfc/src/ifdhandler.rs

//! pcsc-lite IFD handler exports.
//!
//! pcscd loads the cdylib and calls these symbols. Every export forwards to
//! a process-wide [`Driver`] and converts the result into a response code;
//! nothing panics across the boundary.

use std::ffi::{CStr, c_char, c_long, c_uchar, c_ulong};
use std::sync::{Arc, OnceLock};

use crate::driver::Driver;
use crate::error::ResponseCode;
use crate::transport::Backend;
use crate::types::Lun;
use crate::{Error, Result};

/// pcsc-lite `DWORD`
#[allow(clippy::upper_case_acronyms)]
pub type DWORD = c_ulong;
/// pcsc-lite `RESPONSECODE`
#[allow(clippy::upper_case_acronyms)]
pub type RESPONSECODE = c_long;

/// SCARD_IO_HEADER
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScardIoHeader {
    /// SCARD_PROTOCOL_* in use
    pub protocol: DWORD,
    /// Length of the header, unused here
    pub length: DWORD,
}

static DRIVER: OnceLock<Driver> = OnceLock::new();

fn default_backend() -> Arc<dyn Backend> {
    #[cfg(feature = "usb")]
    {
        Arc::new(crate::transport::usb::UsbBackend::new())
    }
    #[cfg(not(feature = "usb"))]
    {
        Arc::new(crate::transport::NullBackend)
    }
}

/// The driver behind the C exports.
pub fn driver() -> &'static Driver {
    DRIVER.get_or_init(|| {
        log::debug!("driver initialization");
        Driver::new(default_backend())
    })
}

fn respond<T>(result: &Result<T>) -> RESPONSECODE {
    if let Err(e) = result {
        log::debug!("returning {:?}: {}", e.response_code(), e);
    }
    ResponseCode::from_result(result).as_i64() as RESPONSECODE
}

fn lun(raw: DWORD) -> Lun {
    Lun::new(raw as u64)
}

/// Allocate a slot for `Lun` and activate it when `device_name` carries a
/// connection string.
///
/// # Safety
/// `device_name` must be null or a valid NUL terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn IFDHCreateChannelByName(
    lun_raw: DWORD,
    device_name: *const c_char,
) -> RESPONSECODE {
    if device_name.is_null() {
        return respond::<()>(&Err(Error::NotConnected));
    }
    let name = unsafe { CStr::from_ptr(device_name) }.to_string_lossy();
    respond(&driver().create_channel_by_name(lun(lun_raw), &name))
}

/// Allocate a slot named after a numeric channel; the slot stays inactive.
#[unsafe(no_mangle)]
pub extern "C" fn IFDHCreateChannel(lun_raw: DWORD, channel: DWORD) -> RESPONSECODE {
    respond(&driver().create_channel(lun(lun_raw), channel as u64))
}

/// Close the transceiver and free the slot.
#[unsafe(no_mangle)]
pub extern "C" fn IFDHCloseChannel(lun_raw: DWORD) -> RESPONSECODE {
    respond(&driver().close_channel(lun(lun_raw)))
}

/// Read a capability into `value`.
///
/// # Safety
/// `length` must point to the size of the writable buffer `value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn IFDHGetCapabilities(
    lun_raw: DWORD,
    tag: DWORD,
    length: *mut DWORD,
    value: *mut c_uchar,
) -> RESPONSECODE {
    if length.is_null() || value.is_null() {
        return respond::<()>(&Err(Error::NotConnected));
    }
    let capacity = unsafe { *length } as usize;
    let result = driver().get_capabilities(lun(lun_raw), tag as u32, capacity);
    if let Ok(bytes) = &result {
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), value, bytes.len());
            *length = bytes.len() as DWORD;
        }
    }
    respond(&result)
}

/// Capabilities are read-only.
#[unsafe(no_mangle)]
pub extern "C" fn IFDHSetCapabilities(
    lun_raw: DWORD,
    tag: DWORD,
    _length: DWORD,
    _value: *mut c_uchar,
) -> RESPONSECODE {
    respond(&driver().set_capabilities(lun(lun_raw), tag as u32, &[]))
}

/// Accepts T=1 only.
#[unsafe(no_mangle)]
pub extern "C" fn IFDHSetProtocolParameters(
    lun_raw: DWORD,
    protocol: DWORD,
    _flags: c_uchar,
    _pts1: c_uchar,
    _pts2: c_uchar,
    _pts3: c_uchar,
) -> RESPONSECODE {
    respond(&driver().set_protocol_parameters(lun(lun_raw), protocol as u32))
}

/// Power up, power down or reset the card and return its ATR.
///
/// # Safety
/// `atr_length` must point to the size of the writable buffer `atr`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn IFDHPowerICC(
    lun_raw: DWORD,
    action: DWORD,
    atr: *mut c_uchar,
    atr_length: *mut DWORD,
) -> RESPONSECODE {
    if atr.is_null() || atr_length.is_null() {
        return respond::<()>(&Err(Error::NotConnected));
    }
    let capacity = unsafe { *atr_length } as usize;
    let result = driver().power_icc(lun(lun_raw), action as u32, capacity);
    unsafe {
        match &result {
            Ok(a) => {
                std::ptr::copy_nonoverlapping(a.as_bytes().as_ptr(), atr, a.len());
                *atr_length = a.len() as DWORD;
            }
            Err(_) => *atr_length = 0,
        }
    }
    respond(&result)
}

/// Send an APDU to the card and copy its answer into `rx_buffer`.
///
/// # Safety
/// `tx_buffer` must hold `tx_length` bytes, `rx_length` must point to the
/// size of the writable buffer `rx_buffer`, `recv_pci` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn IFDHTransmitToICC(
    lun_raw: DWORD,
    _send_pci: ScardIoHeader,
    tx_buffer: *const c_uchar,
    tx_length: DWORD,
    rx_buffer: *mut c_uchar,
    rx_length: *mut DWORD,
    recv_pci: *mut ScardIoHeader,
) -> RESPONSECODE {
    if rx_length.is_null() || recv_pci.is_null() || rx_buffer.is_null() || tx_buffer.is_null() {
        return respond::<()>(&Err(Error::NotConnected));
    }
    let apdu = unsafe { std::slice::from_raw_parts(tx_buffer, tx_length as usize) };
    let capacity = unsafe { *rx_length } as usize;
    let result = driver().transmit_to_icc(lun(lun_raw), apdu, capacity);
    unsafe {
        match &result {
            Ok(resp) => {
                std::ptr::copy_nonoverlapping(resp.as_ptr(), rx_buffer, resp.len());
                *rx_length = resp.len() as DWORD;
                (*recv_pci).protocol = 1;
            }
            Err(_) => *rx_length = 0,
        }
    }
    respond(&result)
}

/// `IFD_SUCCESS` when a card is present, `IFD_ICC_NOT_PRESENT` otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn IFDHICCPresence(lun_raw: DWORD) -> RESPONSECODE {
    match driver().icc_presence(lun(lun_raw)) {
        Ok(true) => ResponseCode::SUCCESS.as_i64() as RESPONSECODE,
        Ok(false) => ResponseCode::ICC_NOT_PRESENT.as_i64() as RESPONSECODE,
        Err(e) => respond::<()>(&Err(e)),
    }
}

/// Control channel; only `IFDNFC_CTRL_ACTIVE` is understood.
///
/// # Safety
/// `tx_buffer` must hold `tx_length` bytes and `rx_buffer` must be writable
/// for `rx_length` bytes; null buffers are rejected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn IFDHControl(
    lun_raw: DWORD,
    control_code: DWORD,
    tx_buffer: *const c_uchar,
    tx_length: DWORD,
    rx_buffer: *mut c_uchar,
    rx_length: DWORD,
    bytes_returned: *mut DWORD,
) -> RESPONSECODE {
    if !bytes_returned.is_null() {
        unsafe { *bytes_returned = 0 };
    }
    let request: &[u8] = if tx_buffer.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(tx_buffer, tx_length as usize) }
    };
    let capacity = if rx_buffer.is_null() {
        0
    } else {
        rx_length as usize
    };
    let result = driver().control(lun(lun_raw), control_code as u32, request, capacity);
    if let Ok(resp) = &result {
        unsafe {
            std::ptr::copy_nonoverlapping(resp.as_ptr(), rx_buffer, resp.len());
            if !bytes_returned.is_null() {
                *bytes_returned = resp.len() as DWORD;
            }
        }
    }
    respond(&result)
}
