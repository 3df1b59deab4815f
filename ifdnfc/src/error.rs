// ifdnfc/src/error.rs

//! Error type and the mapping to IFD response codes.

use thiserror::Error;

use crate::constants::ifd;
use crate::types::Lun;

/// Common error type
#[derive(Error, Debug)]
pub enum Error {
    /// Every slot of the registry is taken
    #[error("all {0} device slots are in use")]
    CapacityExceeded(usize),

    /// A channel is already open on this Lun
    #[error("lun {0} is already allocated")]
    LunInUse(Lun),

    /// No slot was created for this Lun
    #[error("no device slot for lun {0}")]
    UnknownLun(Lun),

    /// The radio library could not be initialized
    #[error("unable to initialize the radio context: {0}")]
    ContextInit(String),

    /// No device matched the connection string
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Malformed connection string
    #[error("invalid connection string '{0}'")]
    InvalidConnstring(String),

    // optional rusb backend
    /// USB transfer failure
    #[cfg(feature = "usb")]
    #[error("usb error: {0}")]
    Usb(#[from] rusb::Error),

    /// Radio level failure reported by the transport
    #[error("radio error: {0}")]
    Radio(String),

    /// No answer before the deadline
    #[error("operation timed out")]
    Timeout,

    /// Target answered more bytes than the receive buffer holds
    #[error("response overflow: received {received} bytes, buffer holds {capacity}")]
    Overflow {
        /// Bytes sent by the target
        received: usize,
        /// Bytes the caller can take
        capacity: usize,
    },

    /// The slot has no open device
    #[error("device is not connected")]
    NotConnected,

    /// No card is powered in the field
    #[error("no card present")]
    IccNotPresent,

    /// Discovery found nothing
    #[error("no target found in the field")]
    NoTarget,

    /// Caller buffer smaller than the value to return (communication error)
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes the value needs
        needed: usize,
        /// Bytes the caller offered
        available: usize,
    },

    /// Caller buffer rejected with IFD_ERROR_INSUFFICIENT_BUFFER
    #[error("insufficient buffer: need {needed} bytes, have {available}")]
    InsufficientBuffer {
        /// Bytes the value needs
        needed: usize,
        /// Bytes the caller offered
        available: usize,
    },

    /// Frame length field disagrees with the payload
    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Length announced by the header
        expected: usize,
        /// Length actually received
        actual: usize,
    },

    /// Frame checksum did not verify
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Computed checksum
        expected: u8,
        /// Checksum carried by the frame
        actual: u8,
    },

    /// Frame could not be parsed
    #[error("frame format error: {0}")]
    FrameFormat(String),

    /// Chip answered with another command code
    #[error("unexpected response code: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedResponse {
        /// Response code for the command sent
        expected: u8,
        /// Response code received
        actual: u8,
    },

    /// Chip reported a non-zero status byte
    #[error("pn53x status error {0:#04x}")]
    ChipStatus(u8),

    /// Control request with an unknown command
    #[error("unknown control command {0}")]
    UnknownCommand(i32),

    /// Capability tag the handler does not know
    #[error("capability tag {0:#06x} not supported")]
    UnsupportedTag(u32),

    /// Protocol other than T=1 requested
    #[error("protocol {0:#x} not supported")]
    ProtocolNotSupported(u32),

    /// Power action outside power up, down and reset
    #[error("power action {0} not supported")]
    UnsupportedAction(u32),

    /// Operation the device cannot perform
    #[error("unsupported operation: {0}")]
    NotSupported(String),

    /// Capabilities cannot be written
    #[error("capabilities are read-only")]
    ReadOnly,

    /// Power action failed on the device
    #[error("power action failed: {0}")]
    PowerAction(String),
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// IFD handler response code reported to the middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCode(i64);

impl ResponseCode {
    /// `IFD_SUCCESS`
    pub const SUCCESS: Self = Self(ifd::IFD_SUCCESS);
    /// `IFD_ERROR_TAG`
    pub const ERROR_TAG: Self = Self(ifd::IFD_ERROR_TAG);
    /// `IFD_ERROR_VALUE_READ_ONLY`
    pub const ERROR_VALUE_READ_ONLY: Self = Self(ifd::IFD_ERROR_VALUE_READ_ONLY);
    /// `IFD_ERROR_NOT_SUPPORTED`
    pub const ERROR_NOT_SUPPORTED: Self = Self(ifd::IFD_ERROR_NOT_SUPPORTED);
    /// `IFD_PROTOCOL_NOT_SUPPORTED`
    pub const PROTOCOL_NOT_SUPPORTED: Self = Self(ifd::IFD_PROTOCOL_NOT_SUPPORTED);
    /// `IFD_ERROR_POWER_ACTION`
    pub const ERROR_POWER_ACTION: Self = Self(ifd::IFD_ERROR_POWER_ACTION);
    /// `IFD_COMMUNICATION_ERROR`
    pub const COMMUNICATION_ERROR: Self = Self(ifd::IFD_COMMUNICATION_ERROR);
    /// `IFD_NOT_SUPPORTED`
    pub const NOT_SUPPORTED: Self = Self(ifd::IFD_NOT_SUPPORTED);
    /// `IFD_ICC_NOT_PRESENT`
    pub const ICC_NOT_PRESENT: Self = Self(ifd::IFD_ICC_NOT_PRESENT);
    /// `IFD_ERROR_INSUFFICIENT_BUFFER`
    pub const ERROR_INSUFFICIENT_BUFFER: Self = Self(ifd::IFD_ERROR_INSUFFICIENT_BUFFER);

    /// Raw pcsc-lite value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Collapse a driver result into the code returned across the C ABI.
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::SUCCESS,
            Err(e) => e.response_code(),
        }
    }
}

impl Error {
    /// Map the error onto the pcsc-lite response-code taxonomy.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::IccNotPresent => ResponseCode::ICC_NOT_PRESENT,
            Self::UnsupportedTag(_) => ResponseCode::ERROR_TAG,
            Self::ProtocolNotSupported(_) => ResponseCode::PROTOCOL_NOT_SUPPORTED,
            Self::UnsupportedAction(_) => ResponseCode::NOT_SUPPORTED,
            Self::NotSupported(_) => ResponseCode::ERROR_NOT_SUPPORTED,
            Self::ReadOnly => ResponseCode::ERROR_VALUE_READ_ONLY,
            Self::PowerAction(_) => ResponseCode::ERROR_POWER_ACTION,
            Self::InsufficientBuffer { .. } => ResponseCode::ERROR_INSUFFICIENT_BUFFER,
            _ => ResponseCode::COMMUNICATION_ERROR,
        }
    }
}
