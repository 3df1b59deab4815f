// ifdnfc/src/intercept.rs

//! APDU relay with local handling of the PC/SC `GET DATA` pseudo-APDU
//! (`FF CA P1 P2 Le`) that asks the reader for the card identifier.

use std::time::Duration;

use crate::atr::iso14443a_historical_bytes;
use crate::constants::sw;
use crate::transport::Transport;
use crate::types::Target;
use crate::utils::{as_ms, bytes_to_hex_spaced};
use crate::{Error, Result};

/// CLA and INS of the PC/SC "get data" command
pub const IDENTITY_QUERY_PREFIX: [u8; 2] = [0xFF, 0xCA];

/// `FF CA 00 ..`: card identifier
pub const P1_UID: u8 = 0x00;
/// `FF CA 01 ..`: ISO14443A historical bytes
pub const P1_HISTORICAL_BYTES: u8 = 0x01;

/// True when the APDU is answered locally instead of relayed.
pub fn is_identity_query(apdu: &[u8]) -> bool {
    apdu.starts_with(&IDENTITY_QUERY_PREFIX)
}

fn requested_data<'a>(target: &'a Target, p1: u8) -> Option<&'a [u8]> {
    match (p1, target) {
        (P1_UID, t) => Some(t.uid()),
        (P1_HISTORICAL_BYTES, Target::Iso14443a(info)) => {
            Some(iso14443a_historical_bytes(&info.ats))
        }
        _ => None,
    }
}

/// Answer an identity query from the tracked target.
pub fn identity_query_response(target: &Target, apdu: &[u8]) -> Vec<u8> {
    if apdu.len() != 5 {
        return sw::WRONG_LENGTH.to_vec();
    }
    let Some(data) = requested_data(target, apdu[2]) else {
        return sw::FUNCTION_NOT_SUPPORTED.to_vec();
    };

    let le = apdu[4] as usize;
    let available = data.len();
    if le != 0 && le < available {
        return vec![sw::WRONG_LE, available.min(u8::MAX as usize) as u8];
    }

    let mut resp = Vec::with_capacity(le.max(available) + 2);
    resp.extend_from_slice(data);
    if le > available {
        resp.resize(le, 0x00);
        resp.extend_from_slice(&sw::END_OF_DATA);
    } else {
        resp.extend_from_slice(&sw::SUCCESS);
    }
    resp
}

/// Exchange one APDU with the tracked target. Identity queries never reach
/// the radio.
pub fn exchange(
    transport: &mut dyn Transport,
    target: &Target,
    apdu: &[u8],
    rx_capacity: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    if is_identity_query(apdu) {
        let resp = identity_query_response(target, apdu);
        log::debug!(
            "intercepted {} -> {}",
            bytes_to_hex_spaced(apdu),
            bytes_to_hex_spaced(&resp)
        );
        if resp.len() > rx_capacity {
            return Err(Error::InsufficientBuffer {
                needed: resp.len(),
                available: rx_capacity,
            });
        }
        return Ok(resp);
    }

    log::debug!("=> {}", bytes_to_hex_spaced(apdu));
    match transport.transceive_bytes(apdu, rx_capacity, as_ms(timeout)) {
        Ok(resp) => {
            log::debug!("<= {}", bytes_to_hex_spaced(&resp));
            Ok(resp)
        }
        Err(e) => {
            log::error!("unable to transmit data to the target: {}", e);
            Err(e)
        }
    }
}
