// ifdnfc/src/types.rs

//! Domain types shared by the driver, the radio boundary and the C ABI.

use derive_more::Display;
use std::convert::TryFrom;
use std::fmt;

use crate::constants::MAX_ATR_SIZE;
use crate::Error;

/// Logical unit number assigned by the middleware to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lun(u64);

impl Lun {
    /// Wrap a raw `DWORD` Lun.
    pub const fn new(lun: u64) -> Self {
        Self(lun)
    }

    /// Raw value as passed over the C ABI.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Lun {
    fn from(lun: u64) -> Self {
        Self(lun)
    }
}

impl fmt::Display for Lun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Operating mode of a slot, as set over the control channel.
#[repr(i32)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// No transceiver is used
    #[default]
    #[display(fmt = "Inactive")]
    Inactive = 0,
    /// Cards in the RF field are reported
    #[display(fmt = "Active")]
    Active = 1,
    /// The wired secure element is reported as the card
    #[display(fmt = "Active Secure Element")]
    ActiveWithSecureElement = 2,
}

impl Mode {
    /// Any mode but [`Mode::Inactive`].
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Inactive)
    }
}

impl TryFrom<i32> for Mode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Inactive),
            1 => Ok(Self::Active),
            2 => Ok(Self::ActiveWithSecureElement),
            other => Err(Error::UnknownCommand(other)),
        }
    }
}

/// Contactless technology of a target.
#[allow(missing_docs)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Technology {
    #[display(fmt = "ISO/IEC 14443A")]
    Iso14443a,
    #[display(fmt = "ISO/IEC 14443-4B")]
    Iso14443b,
    #[display(fmt = "ISO/IEC 14443-4B'")]
    Iso14443bi,
    #[display(fmt = "ISO/IEC 14443-2B ST SRx")]
    Iso14443b2sr,
    #[display(fmt = "ISO/IEC 14443-2B ASK CTx")]
    Iso14443b2ct,
    #[display(fmt = "Innovision Jewel")]
    Jewel,
    #[display(fmt = "FeliCa")]
    Felica,
    #[display(fmt = "D.E.P.")]
    Dep,
}

/// Air-interface bit rate.
#[allow(missing_docs)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BaudRate {
    #[display(fmt = "106 kbps")]
    Br106,
    #[display(fmt = "212 kbps")]
    Br212,
    #[display(fmt = "424 kbps")]
    Br424,
    #[display(fmt = "847 kbps")]
    Br847,
}

/// Technology plus bit rate, the unit the radio polls with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modulation {
    /// Air interface
    pub technology: Technology,
    /// Bit rate
    pub baud_rate: BaudRate,
}

impl Modulation {
    /// ISO14443A at 106 kbps, the default polling modulation
    pub const ISO14443A_106: Self = Self::new(Technology::Iso14443a, BaudRate::Br106);
    /// ISO14443-4B at 106 kbps
    pub const ISO14443B_106: Self = Self::new(Technology::Iso14443b, BaudRate::Br106);
    /// FeliCa at 212 kbps
    pub const FELICA_212: Self = Self::new(Technology::Felica, BaudRate::Br212);
    /// FeliCa at 424 kbps
    pub const FELICA_424: Self = Self::new(Technology::Felica, BaudRate::Br424);
    /// Innovision Jewel at 106 kbps
    pub const JEWEL_106: Self = Self::new(Technology::Jewel, BaudRate::Br106);

    /// Combine a technology and a bit rate.
    pub const fn new(technology: Technology, baud_rate: BaudRate) -> Self {
        Self {
            technology,
            baud_rate,
        }
    }
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.technology, self.baud_rate)
    }
}

/// Radio-stack properties the driver toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// Keep polling until a target shows up instead of trying once
    InfiniteSelect,
}

/// ISO14443A target information
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Iso14443aInfo {
    /// ATQA (SENS_RES)
    pub atqa: [u8; 2],
    /// SAK (SEL_RES)
    pub sak: u8,
    /// NFCID1, 4, 7 or 10 bytes
    pub uid: Vec<u8>,
    /// ATS without the TL byte and CRC: T0, optional TA1/TB1/TC1, historical bytes
    pub ats: Vec<u8>,
}

/// ISO14443-4B target information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Iso14443bInfo {
    /// Pseudo-unique PICC identifier
    pub pupi: [u8; 4],
    /// Application data from ATQB
    pub application_data: [u8; 4],
    /// Protocol info from ATQB
    pub protocol_info: [u8; 3],
    /// CID assigned on ATTRIB
    pub card_identifier: u8,
}

/// ISO14443-4B' (Innovatron) target information
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Iso14443biInfo {
    pub div: [u8; 4],
    pub version_log: u8,
    pub config: u8,
    pub atr: Vec<u8>,
}

/// ST SRx target information
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Iso14443b2srInfo {
    pub uid: [u8; 8],
}

/// ASK CTx target information
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Iso14443b2ctInfo {
    pub uid: [u8; 4],
    pub product_code: u8,
    pub fab_code: u8,
}

/// Innovision Jewel target information
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JewelInfo {
    pub sens_res: [u8; 2],
    pub id: [u8; 4],
}

/// FeliCa target information
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FelicaInfo {
    pub idm: [u8; 8],
    pub pmm: [u8; 8],
    pub system_code: [u8; 2],
}

/// NFC-DEP (peer to peer) target information
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DepInfo {
    pub nfcid3: [u8; 10],
    pub did: u8,
    pub bs: u8,
    pub br: u8,
    pub to: u8,
    pub pp: u8,
    pub general_bytes: Vec<u8>,
}

/// A contactless target as reported by the radio stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// ISO14443A, the only technology that can be reselected
    Iso14443a(Iso14443aInfo),
    /// ISO14443-4B
    Iso14443b(Iso14443bInfo),
    /// ISO14443-4B' (Innovatron)
    Iso14443bi(Iso14443biInfo),
    /// ST SRx
    Iso14443b2sr(Iso14443b2srInfo),
    /// ASK CTx
    Iso14443b2ct(Iso14443b2ctInfo),
    /// Innovision Jewel
    Jewel(JewelInfo),
    /// FeliCa answers at either 212 or 424 kbps
    Felica {
        /// Polling response
        info: FelicaInfo,
        /// Rate the target answered at
        baud_rate: BaudRate,
    },
    /// NFC-DEP
    Dep(DepInfo),
}

impl Target {
    /// Technology of the variant.
    pub fn technology(&self) -> Technology {
        match self {
            Self::Iso14443a(_) => Technology::Iso14443a,
            Self::Iso14443b(_) => Technology::Iso14443b,
            Self::Iso14443bi(_) => Technology::Iso14443bi,
            Self::Iso14443b2sr(_) => Technology::Iso14443b2sr,
            Self::Iso14443b2ct(_) => Technology::Iso14443b2ct,
            Self::Jewel(_) => Technology::Jewel,
            Self::Felica { .. } => Technology::Felica,
            Self::Dep(_) => Technology::Dep,
        }
    }

    /// Modulation to select this target again.
    pub fn modulation(&self) -> Modulation {
        match self {
            Self::Felica { baud_rate, .. } => Modulation::new(Technology::Felica, *baud_rate),
            other => Modulation::new(other.technology(), BaudRate::Br106),
        }
    }

    /// Identifier returned by the `FF CA 00` identity query.
    pub fn uid(&self) -> &[u8] {
        match self {
            Self::Iso14443a(info) => &info.uid,
            Self::Iso14443b(info) => &info.pupi,
            Self::Iso14443bi(info) => &info.div,
            Self::Iso14443b2sr(info) => &info.uid,
            Self::Iso14443b2ct(info) => &info.uid,
            Self::Jewel(info) => &info.id,
            Self::Felica { info, .. } => &info.idm,
            Self::Dep(info) => &info.nfcid3,
        }
    }

    /// ATS (TL stripped) for ISO14443A targets.
    pub fn ats(&self) -> Option<&[u8]> {
        match self {
            Self::Iso14443a(info) => Some(&info.ats),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} uid={}",
            self.technology(),
            crate::utils::bytes_to_hex(self.uid())
        )
    }
}

/// Answer-To-Reset, at most MAX_ATR_SIZE bytes
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Atr {
    bytes: [u8; MAX_ATR_SIZE],
    len: usize,
}

impl Atr {
    /// Empty ATR reported for targets without APDU support.
    pub const EMPTY: Self = Self {
        bytes: [0; MAX_ATR_SIZE],
        len: 0,
    };

    /// ATR bytes, TS first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Number of ATR bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for [`Atr::EMPTY`].
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Space separated lowercase hex, for logs.
    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex_spaced(self.as_bytes())
    }
}

impl Default for Atr {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Atr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atr({})", self.to_hex())
    }
}

impl TryFrom<&[u8]> for Atr {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() > MAX_ATR_SIZE {
            return Err(Error::InvalidLength {
                expected: MAX_ATR_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; MAX_ATR_SIZE];
        arr[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            bytes: arr,
            len: bytes.len(),
        })
    }
}

/// IFDHPowerICC action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    /// `IFD_POWER_UP`
    PowerUp,
    /// `IFD_POWER_DOWN`
    PowerDown,
    /// `IFD_RESET`
    Reset,
}

impl TryFrom<u32> for PowerAction {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use crate::constants::ifd;
        match value {
            ifd::IFD_POWER_UP => Ok(Self::PowerUp),
            ifd::IFD_POWER_DOWN => Ok(Self::PowerDown),
            ifd::IFD_RESET => Ok(Self::Reset),
            other => Err(Error::UnsupportedAction(other)),
        }
    }
}
