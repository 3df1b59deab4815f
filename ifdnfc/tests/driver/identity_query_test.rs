#[path = "../common/mod.rs"]
mod common;

use ifdnfc::intercept::identity_query_response;
use ifdnfc::{Error, ResponseCode, test_support};
use proptest::prelude::*;

use common::fixtures::{self, ATR, UID};
use common::helpers::{active_driver, power_up};

#[test]
fn uid_is_answered_locally() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    assert_eq!(power_up(&driver, lun).unwrap().as_bytes(), &ATR);

    let r = driver
        .transmit_to_icc(lun, &fixtures::apdu("ffca000000"), 258)
        .unwrap();
    let mut expected = UID.to_vec();
    expected.extend_from_slice(&[0x90, 0x00]);
    assert_eq!(r, expected);
    assert!(radio.sent().is_empty());
}

#[test]
fn historical_bytes_query() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();

    let r = driver
        .transmit_to_icc(lun, &fixtures::apdu("ffca010000"), 258)
        .unwrap();
    assert_eq!(r, vec![0x80, 0x90, 0x00]);
}

#[test]
fn le_handling() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();

    let short = driver
        .transmit_to_icc(lun, &fixtures::apdu("ffca000002"), 258)
        .unwrap();
    assert_eq!(short, vec![0x6C, 0x04]);

    let long = driver
        .transmit_to_icc(lun, &fixtures::apdu("ffca000008"), 258)
        .unwrap();
    assert_eq!(
        long,
        vec![0x04, 0xAA, 0xBB, 0xCC, 0x00, 0x00, 0x00, 0x00, 0x62, 0x82]
    );
}

#[test]
fn malformed_queries() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();

    let no_le = driver
        .transmit_to_icc(lun, &fixtures::apdu("ffca0000"), 258)
        .unwrap();
    assert_eq!(no_le, vec![0x67, 0x00]);

    let bad_p1 = driver
        .transmit_to_icc(lun, &fixtures::apdu("ffca020000"), 258)
        .unwrap();
    assert_eq!(bad_p1, vec![0x6A, 0x81]);
    assert!(radio.sent().is_empty());
}

#[test]
fn historical_bytes_not_available_for_felica() {
    let r = identity_query_response(&fixtures::felica_card(), &[0xFF, 0xCA, 0x01, 0x00, 0x00]);
    assert_eq!(r, vec![0x6A, 0x81]);
    let r = identity_query_response(&fixtures::felica_card(), &[0xFF, 0xCA, 0x00, 0x00, 0x00]);
    assert_eq!(r.len(), 10);
    assert_eq!(&r[8..], &[0x90, 0x00]);
}

#[test]
fn small_receive_buffer() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();

    let err = driver
        .transmit_to_icc(lun, &fixtures::apdu("ffca000000"), 3)
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientBuffer { needed: 6, available: 3 }));
    assert_eq!(err.response_code(), ResponseCode::ERROR_INSUFFICIENT_BUFFER);
}

#[test]
fn other_apdus_are_relayed() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();
    radio.push_response(vec![0x6F, 0x00, 0x90, 0x00]);

    let select = fixtures::apdu(fixtures::SELECT_PPSE);
    let r = driver.transmit_to_icc(lun, &select, 258).unwrap();
    assert_eq!(r, vec![0x6F, 0x00, 0x90, 0x00]);
    assert_eq!(radio.sent(), vec![select]);
}

#[test]
fn relay_failure_is_communication_error() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();
    radio.with(|s| s.fail_transceive = true);

    let err = driver
        .transmit_to_icc(lun, &fixtures::apdu(fixtures::SELECT_PPSE), 258)
        .unwrap_err();
    assert_eq!(err.response_code(), ResponseCode::COMMUNICATION_ERROR);
}

#[test]
fn relayed_reply_larger_than_buffer_is_rejected() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();
    radio.push_response(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x90, 0x00]);

    let read_binary = fixtures::apdu("00b0000008");
    let err = driver.transmit_to_icc(lun, &read_binary, 4).unwrap_err();
    assert!(matches!(err, Error::Overflow { received: 8, capacity: 4 }));
    assert_eq!(err.response_code(), ResponseCode::COMMUNICATION_ERROR);
    assert!(driver.slot(lun).unwrap().lock().is_present());
}

proptest! {
    #[test]
    fn uid_response_follows_le(
        uid in prop::collection::vec(any::<u8>(), 4..=10),
        le in any::<u8>(),
    ) {
        let target = test_support::iso14443a_target(&uid, &[0x78]);
        let r = identity_query_response(&target, &[0xFF, 0xCA, 0x00, 0x00, le]);
        let le = le as usize;
        if le == 0 || le == uid.len() {
            prop_assert_eq!(&r[..uid.len()], &uid[..]);
            prop_assert_eq!(&r[uid.len()..], &[0x90, 0x00]);
        } else if le < uid.len() {
            prop_assert_eq!(r, vec![0x6C, uid.len() as u8]);
        } else {
            prop_assert_eq!(r.len(), le + 2);
            prop_assert_eq!(&r[..uid.len()], &uid[..]);
            prop_assert!(r[uid.len()..le].iter().all(|&b| b == 0));
            prop_assert_eq!(&r[le..], &[0x62, 0x82]);
        }
    }
}
