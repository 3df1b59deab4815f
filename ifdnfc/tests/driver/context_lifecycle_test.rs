#[path = "../common/mod.rs"]
mod common;

use ifdnfc::constants::tag;
use ifdnfc::{Driver, DriverConfig, Error, Lun, ResponseCode, test_support};

use common::fixtures;
use common::helpers::init_logger;

#[test]
fn context_is_shared_and_released_with_last_slot() {
    init_logger();
    let (radio, driver) = test_support::mock_driver();
    driver.create_channel_by_name(Lun::new(1), "mock:0").unwrap();
    driver.create_channel_by_name(Lun::new(2), "mock:1").unwrap();
    assert_eq!(radio.live_contexts(), 1);
    assert_eq!(radio.open_transports(), 2);

    driver.close_channel(Lun::new(1)).unwrap();
    assert_eq!(radio.live_contexts(), 1);
    assert_eq!(radio.open_transports(), 1);

    driver.close_channel(Lun::new(2)).unwrap();
    assert_eq!(radio.live_contexts(), 0);
    assert_eq!(radio.open_transports(), 0);
    assert!(!driver.registry().has_context());
}

#[test]
fn context_recreated_after_teardown() {
    let (radio, driver) = test_support::mock_driver();
    driver.create_channel_by_name(Lun::new(1), "mock:0").unwrap();
    driver.close_channel(Lun::new(1)).unwrap();

    driver.create_channel_by_name(Lun::new(1), "mock:0").unwrap();
    assert_eq!(radio.with(|s| s.contexts_created), 2);
    assert_eq!(radio.live_contexts(), 1);

    radio.insert_target(fixtures::card());
    assert!(driver.icc_presence(Lun::new(1)).unwrap());
}

#[test]
fn close_deselects_present_target() {
    let (radio, driver) = test_support::mock_driver();
    let lun = Lun::new(1);
    driver.create_channel_by_name(lun, "mock:0").unwrap();
    radio.insert_target(fixtures::card());
    assert!(driver.icc_presence(lun).unwrap());

    radio.clear_calls();
    driver.close_channel(lun).unwrap();
    assert_eq!(radio.calls(), vec![ifdnfc::transport::mock::MockCall::Deselect]);
    assert!(matches!(driver.slot(lun), Err(Error::UnknownLun(_))));
}

#[test]
fn slot_pool_is_bounded() {
    let radio = ifdnfc::transport::MockRadio::new();
    let driver = Driver::with_config(
        radio.backend(),
        DriverConfig::builder().max_devices(2).build(),
    );
    driver.create_channel(Lun::new(1), 1).unwrap();
    driver.create_channel(Lun::new(2), 2).unwrap();

    let err = driver.create_channel(Lun::new(3), 3).unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded(2)));
    assert_eq!(err.response_code(), ResponseCode::COMMUNICATION_ERROR);

    assert_eq!(
        driver
            .get_capabilities(Lun::new(1), tag::TAG_IFD_SIMULTANEOUS_ACCESS, 1)
            .unwrap(),
        vec![2]
    );

    driver.close_channel(Lun::new(1)).unwrap();
    driver.create_channel(Lun::new(3), 3).unwrap();
}

#[test]
fn context_failure_fails_channel_creation() {
    let (radio, driver) = test_support::mock_driver();
    radio.with(|s| s.fail_context = true);
    let err = driver
        .create_channel_by_name(Lun::new(1), "mock:0")
        .unwrap_err();
    assert!(matches!(err, Error::ContextInit(_)));
    assert!(driver.registry().is_empty());
}

#[test]
fn unknown_lun_everywhere() {
    let (_radio, driver) = test_support::mock_driver();
    let lun = Lun::new(0x99);
    let codes = [
        driver.close_channel(lun).map(|_| ()),
        driver.get_capabilities(lun, tag::TAG_IFD_ATR, 33).map(|_| ()),
        driver.power_icc(lun, 500, 33).map(|_| ()),
        driver.transmit_to_icc(lun, &[0x00], 258).map(|_| ()),
        driver.icc_presence(lun).map(|_| ()),
    ];
    for result in &codes {
        assert_eq!(
            ResponseCode::from_result(result),
            ResponseCode::COMMUNICATION_ERROR
        );
    }
}
