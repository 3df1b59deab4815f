//! Test support helpers intended for use by unit and integration tests.
//!
//! These helpers centralize common MockRadio setup so tests across the
//! crate and tests/ directory can reuse the same logic.
#![allow(dead_code)]

use std::sync::Arc;

use crate::atr::PcscAtrBuilder;
use crate::config::DriverConfig;
use crate::driver::Driver;
use crate::slot::Slot;
use crate::transport::MockRadio;
use crate::types::{Iso14443aInfo, Lun, Target};

/// ISO14443A target with ATQA 00 04 and an ISO14443-4 compliant SAK.
/// `ats` is given without its TL byte.
#[doc(hidden)]
pub fn iso14443a_target(uid: &[u8], ats: &[u8]) -> Target {
    Target::Iso14443a(Iso14443aInfo {
        atqa: [0x00, 0x04],
        sak: 0x20,
        uid: uid.to_vec(),
        ats: ats.to_vec(),
    })
}

/// Disconnected, inactive slot on a fresh simulated radio.
#[doc(hidden)]
pub fn mock_slot(lun: u64) -> (MockRadio, Slot) {
    mock_slot_with_config(lun, DriverConfig::default())
}

/// Like [`mock_slot`] with an explicit configuration.
#[doc(hidden)]
pub fn mock_slot_with_config(lun: u64, config: DriverConfig) -> (MockRadio, Slot) {
    let radio = MockRadio::new();
    let slot = Slot::new(
        Lun::new(lun),
        radio.context(),
        Arc::new(config),
        Arc::new(PcscAtrBuilder::new()),
    );
    (radio, slot)
}

/// Driver whose slots open transports on the returned radio.
#[doc(hidden)]
pub fn mock_driver() -> (MockRadio, Driver) {
    let radio = MockRadio::new();
    let driver = Driver::new(radio.backend());
    (radio, driver)
}
