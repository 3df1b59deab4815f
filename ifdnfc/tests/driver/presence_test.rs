#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use ifdnfc::constants::tag;
use ifdnfc::transport::MockRadio;
use ifdnfc::transport::mock::MockCall;
use ifdnfc::{Driver, DriverConfig, Lun, ResponseCode};

use common::fixtures::{self, ATR};
use common::helpers::{active_driver, init_logger, power_up};

#[test]
fn presence_follows_the_field() {
    let (radio, driver, lun) = active_driver();
    assert!(!driver.icc_presence(lun).unwrap());

    radio.insert_target(fixtures::card());
    assert!(driver.icc_presence(lun).unwrap());
    assert_eq!(
        driver.get_capabilities(lun, tag::TAG_IFD_ATR, 33).unwrap(),
        ATR.to_vec()
    );

    radio.clear_targets();
    assert!(!driver.icc_presence(lun).unwrap());
    let err = driver
        .get_capabilities(lun, tag::TAG_IFD_ATR, 33)
        .unwrap_err();
    assert_eq!(err.response_code(), ResponseCode::COMMUNICATION_ERROR);

    radio.insert_target(fixtures::card());
    assert!(driver.icc_presence(lun).unwrap());
}

#[test]
fn present_target_is_only_rechecked() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    assert!(driver.icc_presence(lun).unwrap());

    radio.clear_calls();
    assert!(driver.icc_presence(lun).unwrap());
    assert_eq!(radio.calls(), vec![MockCall::PresenceCheck]);
}

#[test]
fn cold_reselect_requires_identical_ats() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();

    let handle = driver.slot(lun).unwrap();
    assert!(handle.lock().reselect_target(false));
    assert!(handle.lock().is_present());

    // same UID, different ATS: another card as far as the slot is concerned
    radio.clear_targets();
    radio.insert_target(fixtures::card_with_ats(&[0x78, 0x80, 0x70, 0x02]));
    assert!(!handle.lock().reselect_target(false));
    assert!(!handle.lock().is_present());
    assert!(handle.lock().is_connected());
}

#[test]
fn warm_reselect_ignores_ats() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    power_up(&driver, lun).unwrap();

    radio.clear_targets();
    radio.insert_target(fixtures::card_with_ats(&[0x78, 0x80, 0x70, 0x02]));
    radio.clear_calls();

    let handle = driver.slot(lun).unwrap();
    assert!(handle.lock().reselect_target(true));
    assert!(radio.calls().contains(&MockCall::Select {
        modulation: ifdnfc::Modulation::ISO14443A_106,
        uid: Some(fixtures::UID.to_vec()),
    }));
}

fn driver_with_retry(radio: &MockRadio, interval: Duration) -> (Driver, Lun) {
    init_logger();
    let config = DriverConfig::builder()
        .open_retry_interval(interval)
        .build();
    let driver = Driver::with_config(radio.backend(), config);
    let lun = Lun::new(0x20);
    driver.create_channel_by_name(lun, "mock:0").unwrap();
    (driver, lun)
}

fn open_calls(radio: &MockRadio) -> usize {
    radio
        .calls()
        .iter()
        .filter(|c| matches!(c, MockCall::Open(_)))
        .count()
}

#[test]
fn reopen_is_rate_limited() {
    let radio = MockRadio::new();
    radio.with(|s| s.fail_open = true);
    let (driver, lun) = driver_with_retry(&radio, Duration::from_secs(3600));
    assert_eq!(open_calls(&radio), 1);

    radio.with(|s| s.fail_open = false);
    radio.insert_target(fixtures::card());
    for _ in 0..3 {
        assert!(!driver.icc_presence(lun).unwrap());
    }
    assert_eq!(open_calls(&radio), 1);
}

#[test]
fn reopen_after_interval() {
    let radio = MockRadio::new();
    radio.with(|s| s.fail_open = true);
    let (driver, lun) = driver_with_retry(&radio, Duration::ZERO);

    assert!(!driver.icc_presence(lun).unwrap());
    assert_eq!(open_calls(&radio), 2);

    radio.with(|s| s.fail_open = false);
    radio.insert_target(fixtures::card());
    assert!(driver.icc_presence(lun).unwrap());
    assert_eq!(radio.open_transports(), 1);
}

#[test]
fn inactive_slot_never_reopens() {
    let radio = MockRadio::new();
    let (driver, lun) = driver_with_retry(&radio, Duration::ZERO);
    driver.slot(lun).unwrap().lock().disconnect();
    radio.clear_calls();

    assert!(!driver.icc_presence(lun).unwrap());
    assert_eq!(open_calls(&radio), 0);
}
