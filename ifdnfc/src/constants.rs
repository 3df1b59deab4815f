// ifdnfc/src/constants.rs

//! Protocol constants shared across the crate

/// Maximum ATR length allowed by ISO 7816-3 (and pcsc-lite's MAX_ATR_SIZE)
pub const MAX_ATR_SIZE: usize = 33;

/// Default number of slots served by one driver instance
pub const DEFAULT_MAX_DEVICES: usize = 10;

/// Minimum delay between two reopen attempts from a presence check (seconds)
pub const OPEN_RETRY_INTERVAL_SECS: u64 = 5;

/// Relay timeout; larger than the ISO14443-4 FWTmax (~4.9 s)
pub const TRANSCEIVE_TIMEOUT_MS: u64 = 5000;

/// Separator between driver name and parameters in a connection string
pub const CONNSTRING_SEPARATOR: char = ':';

/// Size of a connection string buffer on the control channel, NUL included
pub const CONNSTRING_BUFSIZE: usize = 1024;

/// Default PC/SC friendly name prefix used by the activation utility
pub const READER_NAME: &str = "IFD-NFC";

/// pcsc-lite IFD handler response codes
pub mod ifd {
    /// Call succeeded
    pub const IFD_SUCCESS: i64 = 0;
    /// Unknown capability tag
    pub const IFD_ERROR_TAG: i64 = 600;
    /// Capability cannot be written
    pub const IFD_ERROR_VALUE_READ_ONLY: i64 = 602;
    /// Capability known but not provided
    pub const IFD_ERROR_NOT_SUPPORTED: i64 = 606;
    /// Requested protocol other than T=1
    pub const IFD_PROTOCOL_NOT_SUPPORTED: i64 = 607;
    /// Power action failed
    pub const IFD_ERROR_POWER_ACTION: i64 = 608;
    /// Generic failure
    pub const IFD_COMMUNICATION_ERROR: i64 = 612;
    /// Unknown power action or control code
    pub const IFD_NOT_SUPPORTED: i64 = 614;
    /// No card in the slot
    pub const IFD_ICC_NOT_PRESENT: i64 = 616;
    /// Caller buffer too small
    pub const IFD_ERROR_INSUFFICIENT_BUFFER: i64 = 618;

    /// IFDHPowerICC: activate the card
    pub const IFD_POWER_UP: u32 = 500;
    /// IFDHPowerICC: deactivate the card
    pub const IFD_POWER_DOWN: u32 = 501;
    /// IFDHPowerICC: warm reset
    pub const IFD_RESET: u32 = 502;
}

/// Capability tags understood by IFDHGetCapabilities
pub mod tag {
    /// Current ATR
    pub const TAG_IFD_ATR: u32 = 0x0303;
    /// SCARD_ATTR_VALUE(SCARD_CLASS_ICC_STATE, 0x0303)
    pub const SCARD_ATTR_ATR_STRING: u32 = 0x0009_0303;
    /// Whether slots of one reader may be used concurrently
    pub const TAG_IFD_THREAD_SAFE: u32 = 0x0FAD;
    /// Slots per reader
    pub const TAG_IFD_SLOTS_NUMBER: u32 = 0x0FAE;
    /// Readers one driver instance can serve
    pub const TAG_IFD_SIMULTANEOUS_ACCESS: u32 = 0x0FAF;
    /// Polling thread capabilities, none provided
    pub const TAG_IFD_POLLING_THREAD_KILLABLE: u32 = 0x0FB1;
    #[allow(missing_docs)]
    pub const TAG_IFD_STOP_POLLING_THREAD: u32 = 0x0FB2;
    #[allow(missing_docs)]
    pub const TAG_IFD_POLLING_THREAD_WITH_TIMEOUT: u32 = 0x0FB3;
}

/// SCARD_PROTOCOL_T0
pub const SCARD_PROTOCOL_T0: u32 = 0x0001;
/// SCARD_PROTOCOL_T1, the only protocol offered
pub const SCARD_PROTOCOL_T1: u32 = 0x0002;

/// Control code for mode changes: SCARD_CTL_CODE(1) on pcsc-lite
pub const IFDNFC_CTRL_ACTIVE: u32 = 0x4200_0001;

/// ISO 7816 status words produced by the identity-query interceptor
pub mod sw {
    /// `90 00`
    pub const SUCCESS: [u8; 2] = [0x90, 0x00];
    /// `67 00`: APDU is not 5 bytes long
    pub const WRONG_LENGTH: [u8; 2] = [0x67, 0x00];
    /// `6A 81`: unknown P1 or no such data for the technology
    pub const FUNCTION_NOT_SUPPORTED: [u8; 2] = [0x6A, 0x81];
    /// `62 82`: data padded up to Le
    pub const END_OF_DATA: [u8; 2] = [0x62, 0x82];
    /// First byte of `6C xx` (wrong Le, xx = available length)
    pub const WRONG_LE: u8 = 0x6C;
}

/// PN53x frame preamble: 0x00 0x00 0xFF
pub const PN53X_PREAMBLE: [u8; 3] = [0x00, 0x00, 0xFF];

/// PN53x frame postamble: 0x00
pub const PN53X_POSTAMBLE: u8 = 0x00;

/// Minimal normal information frame length in bytes
pub const PN53X_MIN_FRAME_LEN: usize = 7;

/// Largest payload carried by a normal (non-extended) frame, TFI included
pub const PN53X_MAX_NORMAL_PAYLOAD: usize = 254;

/// Largest payload accepted in an extended frame, TFI included
pub const PN53X_MAX_EXTENDED_PAYLOAD: usize = 264;

/// Minimal extended information frame length in bytes
pub const PN53X_MIN_EXTENDED_FRAME_LEN: usize = 10;

/// ACK frame returned by the PN53x after every command
pub const PN53X_ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];

/// Host->PN53x direction byte (TFI)
pub const PN53X_HOST_TO_CHIP: u8 = 0xD4;
/// PN53x->host direction byte (TFI)
pub const PN53X_CHIP_TO_HOST: u8 = 0xD5;
