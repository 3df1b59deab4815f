// ifdnfc/src/protocol/pn53x.rs

//! PN53x host commands and response parsers.
//!
//! Builders return the payload starting with the TFI (`D4`); wrap it with
//! [`crate::protocol::Frame::encode`] before writing it to the wire.
//! Parsers take a decoded payload starting with `D5`.

use crate::constants::{PN53X_CHIP_TO_HOST, PN53X_HOST_TO_CHIP};
use crate::protocol::parser::{Cursor, expect_byte_at, expect_response_code};
use crate::types::{
    BaudRate, FelicaInfo, Iso14443aInfo, Iso14443bInfo, JewelInfo, Modulation, Target, Technology,
};
use crate::{Error, Result};

/// Command codes
pub mod cmd {
    /// Diagnose
    pub const DIAGNOSE: u8 = 0x00;
    /// GetFirmwareVersion
    pub const GET_FIRMWARE_VERSION: u8 = 0x02;
    /// SAMConfiguration
    pub const SAM_CONFIGURATION: u8 = 0x14;
    /// RFConfiguration
    pub const RF_CONFIGURATION: u8 = 0x32;
    /// InDataExchange
    pub const IN_DATA_EXCHANGE: u8 = 0x40;
    /// InDeselect
    pub const IN_DESELECT: u8 = 0x44;
    /// InListPassiveTarget
    pub const IN_LIST_PASSIVE_TARGET: u8 = 0x4A;
}

/// Diagnose test number for the card presence check
pub const DIAGNOSE_ATTENTION_REQUEST: u8 = 0x06;

/// RFConfiguration items
const RF_ITEM_FIELD: u8 = 0x01;
const RF_ITEM_MAX_RETRIES: u8 = 0x05;

/// SAMConfiguration modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SamMode {
    /// SAM not used, the RF field is driven by the host
    Normal = 0x01,
    /// Host talks to the wired SAM as if it were a card in the field
    WiredCard = 0x03,
}

/// PN53x firmware identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// IC code, 0x32 for a PN532
    pub ic: u8,
    /// Firmware version
    pub version: u8,
    /// Firmware revision
    pub revision: u8,
    /// Supported card families bitmap
    pub support: u8,
}

fn command(code: u8, params: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + params.len());
    out.push(PN53X_HOST_TO_CHIP);
    out.push(code);
    out.extend_from_slice(params);
    out
}

/// Check `D5 <code+1>` and return the remaining bytes.
pub fn response_body(resp: &[u8], code: u8) -> Result<&[u8]> {
    expect_response_code(resp, PN53X_CHIP_TO_HOST)?;
    expect_byte_at(resp, 1, code.wrapping_add(1))?;
    Ok(&resp[2..])
}

/// Check the status byte leading the body of status-carrying responses
/// (InDataExchange, InDeselect) and return what follows it.
pub fn status_body(resp: &[u8], code: u8) -> Result<&[u8]> {
    let body = response_body(resp, code)?;
    let mut c = Cursor::new(body);
    let status = c.u8()?;
    if status & 0x3F != 0 {
        return Err(Error::ChipStatus(status & 0x3F));
    }
    Ok(c.rest())
}

/// GetFirmwareVersion request.
pub fn get_firmware_version() -> Vec<u8> {
    command(cmd::GET_FIRMWARE_VERSION, &[])
}

/// Decode a GetFirmwareVersion response.
pub fn parse_firmware_version(resp: &[u8]) -> Result<FirmwareVersion> {
    let body = response_body(resp, cmd::GET_FIRMWARE_VERSION)?;
    let mut c = Cursor::new(body);
    Ok(FirmwareVersion {
        ic: c.u8()?,
        version: c.u8()?,
        revision: c.u8()?,
        support: c.u8()?,
    })
}

/// SAMConfiguration request.
pub fn sam_configuration(mode: SamMode) -> Vec<u8> {
    // timeout 0 (no timeout), IRQ pin unused
    command(cmd::SAM_CONFIGURATION, &[mode as u8, 0x00, 0x00])
}

/// Switch the RF field on or off.
pub fn rf_field(on: bool) -> Vec<u8> {
    command(cmd::RF_CONFIGURATION, &[RF_ITEM_FIELD, u8::from(on)])
}

/// MxRtyATR, MxRtyPSL, MxRtyPassiveActivation. `infinite` retries passive
/// activation forever, otherwise a single attempt is made.
pub fn max_retries(infinite: bool) -> Vec<u8> {
    let passive = if infinite { 0xFF } else { 0x00 };
    command(cmd::RF_CONFIGURATION, &[RF_ITEM_MAX_RETRIES, 0xFF, 0x01, passive])
}

/// Deselect target `tg`, or all targets when `tg` is zero.
pub fn in_deselect(tg: u8) -> Vec<u8> {
    command(cmd::IN_DESELECT, &[tg])
}

/// Send `data` to target `tg`.
pub fn in_data_exchange(tg: u8, data: &[u8]) -> Vec<u8> {
    let mut params = Vec::with_capacity(1 + data.len());
    params.push(tg);
    params.extend_from_slice(data);
    command(cmd::IN_DATA_EXCHANGE, &params)
}

/// Presence check request for the selected target.
pub fn diagnose_attention_request() -> Vec<u8> {
    command(cmd::DIAGNOSE, &[DIAGNOSE_ATTENTION_REQUEST])
}

/// Diagnose 0x06 answers a single status byte; zero means the card replied.
pub fn parse_diagnose_attention(resp: &[u8]) -> Result<bool> {
    let body = response_body(resp, cmd::DIAGNOSE)?;
    Ok(Cursor::new(body).u8()? == 0x00)
}

/// BrTy code used by InListPassiveTarget.
pub fn baud_rate_type(modulation: Modulation) -> Result<u8> {
    match (modulation.technology, modulation.baud_rate) {
        (Technology::Iso14443a, BaudRate::Br106) => Ok(0x00),
        (Technology::Felica, BaudRate::Br212) => Ok(0x01),
        (Technology::Felica, BaudRate::Br424) => Ok(0x02),
        (Technology::Iso14443b, BaudRate::Br106) => Ok(0x03),
        (Technology::Jewel, BaudRate::Br106) => Ok(0x04),
        _ => Err(Error::NotSupported(format!("modulation {}", modulation))),
    }
}

/// Insert cascade tags into a 7 or 10 byte ISO14443A UID.
pub fn cascade_uid(uid: &[u8]) -> Vec<u8> {
    match uid.len() {
        7 => {
            let mut out = vec![0x88];
            out.extend_from_slice(uid);
            out
        }
        10 => {
            let mut out = vec![0x88];
            out.extend_from_slice(&uid[..3]);
            out.push(0x88);
            out.extend_from_slice(&uid[3..]);
            out
        }
        _ => uid.to_vec(),
    }
}

/// Build InListPassiveTarget. `uid` restricts ISO14443A selection; for
/// FeliCa a default polling request (system code FFFF) is sent and for
/// ISO14443B the AFI 00 applies to all cards.
pub fn in_list_passive_target(
    modulation: Modulation,
    max_targets: u8,
    uid: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let brty = baud_rate_type(modulation)?;
    let mut params = vec![max_targets.clamp(1, 2), brty];
    match modulation.technology {
        Technology::Iso14443a => {
            if let Some(uid) = uid {
                params.extend_from_slice(&cascade_uid(uid));
            }
        }
        Technology::Felica => params.extend_from_slice(&[0x00, 0xFF, 0xFF, 0x01, 0x00]),
        Technology::Iso14443b => params.push(0x00),
        _ => {}
    }
    Ok(command(cmd::IN_LIST_PASSIVE_TARGET, &params))
}

fn parse_iso14443a(c: &mut Cursor<'_>) -> Result<Target> {
    let atqa = c.array::<2>()?;
    let sak = c.u8()?;
    let uid_len = c.u8()? as usize;
    let uid = c.take(uid_len)?.to_vec();
    let mut ats = Vec::new();
    if sak & 0x20 != 0 {
        // TL counts itself
        let tl = c.u8()? as usize;
        ats = c.take(tl.saturating_sub(1))?.to_vec();
    }
    Ok(Target::Iso14443a(Iso14443aInfo {
        atqa,
        sak,
        uid,
        ats,
    }))
}

fn parse_iso14443b(c: &mut Cursor<'_>) -> Result<Target> {
    let atqb = c.take(12)?;
    if atqb[0] != 0x50 {
        return Err(Error::UnexpectedResponse {
            expected: 0x50,
            actual: atqb[0],
        });
    }
    let mut info = Iso14443bInfo::default();
    info.pupi.copy_from_slice(&atqb[1..5]);
    info.application_data.copy_from_slice(&atqb[5..9]);
    info.protocol_info.copy_from_slice(&atqb[9..12]);
    let attrib_len = c.u8()? as usize;
    let attrib = c.take(attrib_len)?;
    if let Some(first) = attrib.first() {
        info.card_identifier = first & 0x0F;
    }
    Ok(Target::Iso14443b(info))
}

fn parse_felica(c: &mut Cursor<'_>, baud_rate: BaudRate) -> Result<Target> {
    let pol_len = c.u8()? as usize;
    let pol = c.take(pol_len.saturating_sub(1))?;
    let mut p = Cursor::new(pol);
    let code = p.u8()?;
    if code != 0x01 {
        return Err(Error::UnexpectedResponse {
            expected: 0x01,
            actual: code,
        });
    }
    let idm = p.array::<8>()?;
    let pmm = p.array::<8>()?;
    let system_code = if p.remaining() >= 2 {
        p.array::<2>()?
    } else {
        [0u8; 2]
    };
    Ok(Target::Felica {
        info: FelicaInfo {
            idm,
            pmm,
            system_code,
        },
        baud_rate,
    })
}

fn parse_jewel(c: &mut Cursor<'_>) -> Result<Target> {
    Ok(Target::Jewel(JewelInfo {
        sens_res: c.array::<2>()?,
        id: c.array::<4>()?,
    }))
}

/// Parse `D5 4B NbTg [Tg TargetData]...`. Returns the targets along with
/// their logical numbers.
pub fn parse_in_list_passive_target(
    resp: &[u8],
    modulation: Modulation,
) -> Result<Vec<(u8, Target)>> {
    let body = response_body(resp, cmd::IN_LIST_PASSIVE_TARGET)?;
    let mut c = Cursor::new(body);
    let count = c.u8()?;
    let mut targets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tg = c.u8()?;
        let target = match modulation.technology {
            Technology::Iso14443a => parse_iso14443a(&mut c)?,
            Technology::Iso14443b => parse_iso14443b(&mut c)?,
            Technology::Felica => parse_felica(&mut c, modulation.baud_rate)?,
            Technology::Jewel => parse_jewel(&mut c)?,
            _ => return Err(Error::NotSupported(format!("modulation {}", modulation))),
        };
        targets.push((tg, target));
    }
    Ok(targets)
}
