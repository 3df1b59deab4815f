// ifdnfc/src/atr.rs

//! ATR synthesis for contactless targets.
//!
//! Contactless cards have no Answer-To-Reset, so PC/SC readers build one
//! from the anticollision data (PC/SC Part 3, 3.1.3.2.3). ISO14443-4A cards
//! contribute their ATS historical bytes, ISO14443-4B cards their ATQB
//! application data and protocol info.

use derive_more::Display;

use crate::constants::MAX_ATR_SIZE;
use crate::protocol::checksum::xor;
use crate::types::{Atr, Target};
use crate::utils::bytes_to_hex_spaced;

/// Maximum number of historical bytes (low nibble of T0)
pub const MAX_HISTORICAL_BYTES: usize = 15;

/// Input flavour handed to an [`AtrBuilder`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtrKind {
    /// Raw input is the ATS with TL stripped
    #[display(fmt = "ISO14443A/106")]
    Iso14443a106,
    /// Raw input is the 12-byte ATQB
    #[display(fmt = "ISO14443B/106")]
    Iso14443b106,
}

/// Turns raw anticollision data into an ATR. `None` means the input could
/// not be mapped.
pub trait AtrBuilder: Send + Sync {
    /// Build the ATR for `raw` data of the given kind.
    fn build(&self, kind: AtrKind, raw: &[u8]) -> Option<Atr>;
}

/// Result of synthesizing the ATR of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synthesis {
    /// ATR to report, possibly empty
    pub atr: Atr,
    /// False when the builder could not map the target
    pub succeeded: bool,
}

/// ATS historical bytes: everything after T0 and the interface bytes
/// TA1/TB1/TC1 announced by bits 0x10/0x20/0x40 of T0. Empty when the ATS
/// ends before that.
pub fn iso14443a_historical_bytes(ats: &[u8]) -> &[u8] {
    let Some(&t0) = ats.first() else {
        return &[];
    };
    let skip = 1 + [0x10u8, 0x20, 0x40]
        .iter()
        .filter(|&&bit| t0 & bit != 0)
        .count();
    ats.get(skip..).unwrap_or(&[])
}

/// PC/SC Part 3 ATR builder: `3B 8n 80 01 <historical bytes> TCK`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcscAtrBuilder;

impl PcscAtrBuilder {
    /// The builder is stateless.
    pub fn new() -> Self {
        Self
    }

    /// Wrap historical bytes into an ATR. TCK is the XOR of T0 up to the
    /// last historical byte.
    pub fn from_historical(historical: &[u8]) -> Option<Atr> {
        if historical.len() > MAX_HISTORICAL_BYTES {
            return None;
        }
        let mut raw = Vec::with_capacity(MAX_ATR_SIZE);
        raw.push(0x3B);
        raw.push(0x80 | historical.len() as u8);
        // TD1: T=0 announced with TD2 following; TD2: T=1
        raw.push(0x80);
        raw.push(0x01);
        raw.extend_from_slice(historical);
        raw.push(xor(&raw[1..]));
        Atr::try_from(raw.as_slice()).ok()
    }

    fn iso14443b_historical(atqb: &[u8]) -> Option<Vec<u8>> {
        if atqb.len() != 12 || atqb[0] != 0x50 {
            return None;
        }
        let mut hist = Vec::with_capacity(8);
        // application data, protocol info, MBLI unknown before ATTRIB
        hist.extend_from_slice(&atqb[5..12]);
        hist.push(0x00);
        Some(hist)
    }
}

impl AtrBuilder for PcscAtrBuilder {
    fn build(&self, kind: AtrKind, raw: &[u8]) -> Option<Atr> {
        match kind {
            AtrKind::Iso14443a106 => Self::from_historical(iso14443a_historical_bytes(raw)),
            AtrKind::Iso14443b106 => Self::from_historical(&Self::iso14443b_historical(raw)?),
        }
    }
}

/// Build the ATR reported for `target`.
///
/// ISO14443B always reports failure even when an ATR was produced; the
/// caller keeps the ATR regardless.
pub fn synthesize(builder: &dyn AtrBuilder, target: &Target) -> Synthesis {
    match target {
        Target::Iso14443a(info) => match builder.build(AtrKind::Iso14443a106, &info.ats) {
            Some(atr) => {
                log::debug!("ATR {} from ATS {}", atr.to_hex(), bytes_to_hex_spaced(&info.ats));
                Synthesis {
                    atr,
                    succeeded: true,
                }
            }
            None => {
                log::debug!(
                    "unable to build {} ATR from ATS {}",
                    AtrKind::Iso14443a106,
                    bytes_to_hex_spaced(&info.ats)
                );
                Synthesis {
                    atr: Atr::EMPTY,
                    succeeded: false,
                }
            }
        },
        Target::Iso14443b(info) => {
            let mut atqb = [0u8; 12];
            atqb[0] = 0x50;
            atqb[1..5].copy_from_slice(&info.pupi);
            atqb[5..9].copy_from_slice(&info.application_data);
            atqb[9..12].copy_from_slice(&info.protocol_info);
            let atr = builder
                .build(AtrKind::Iso14443b106, &atqb)
                .unwrap_or(Atr::EMPTY);
            log::debug!("{} ATR {}", AtrKind::Iso14443b106, atr.to_hex());
            Synthesis {
                atr,
                succeeded: false,
            }
        }
        Target::Iso14443bi(_)
        | Target::Iso14443b2sr(_)
        | Target::Iso14443b2ct(_)
        | Target::Jewel(_)
        | Target::Felica { .. }
        | Target::Dep(_) => Synthesis {
            atr: Atr::EMPTY,
            succeeded: true,
        },
    }
}
