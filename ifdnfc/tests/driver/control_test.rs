#[path = "../common/mod.rs"]
mod common;

use ifdnfc::constants::IFDNFC_CTRL_ACTIVE;
use ifdnfc::control::{ControlCommand, ControlRequest, ControlResponse};
use ifdnfc::{Error, Lun, Mode, ResponseCode, test_support};

use common::helpers::{active_driver, control};

#[test]
fn status_round_trip() {
    let (_radio, driver, lun) = active_driver();
    let status = control(&driver, lun, ControlCommand::GetStatus, "");
    assert_eq!(status.mode, Mode::Active as i32);
    assert!(status.connected);
    assert!(!status.se_available);
    assert_eq!(status.connstring, "mock:0");
    assert_eq!(status.mode_name(), "Active");
}

#[test]
fn libudev_device_name_is_translated() {
    let (radio, driver) = test_support::mock_driver();
    let lun = Lun::new(7);
    driver
        .create_channel_by_name(lun, "usb:04cc/2533:libudev:0:/dev/bus/usb/001/004")
        .unwrap();

    let status = control(&driver, lun, ControlCommand::GetStatus, "");
    assert_eq!(status.mode, Mode::Active as i32);
    assert!(!status.connected);
    assert_eq!(status.connstring, "usb:001:004");
    assert_eq!(radio.open_transports(), 0);
}

#[test]
fn deactivate_and_reactivate() {
    let (radio, driver, lun) = active_driver();
    let status = control(&driver, lun, ControlCommand::SetInactive, "");
    assert_eq!(status.mode, Mode::Inactive as i32);
    assert!(!status.connected);
    assert_eq!(status.connstring, "mock:0");
    assert_eq!(radio.open_transports(), 0);

    let status = control(&driver, lun, ControlCommand::SetActive, "mock:1");
    assert!(status.connected);
    assert_eq!(status.connstring, "mock:1");
    assert_eq!(radio.open_transports(), 1);
}

#[test]
fn rejected_requests() {
    let (radio, driver, lun) = active_driver();
    let req = ControlRequest::new(ControlCommand::SetInactive, "").encode();

    let err = driver
        .control(lun, IFDNFC_CTRL_ACTIVE + 1, &req, ControlResponse::LEN)
        .unwrap_err();
    assert_eq!(err.response_code(), ResponseCode::ERROR_NOT_SUPPORTED);

    let err = driver
        .control(lun, IFDNFC_CTRL_ACTIVE, &req, ControlResponse::LEN - 1)
        .unwrap_err();
    assert_eq!(err.response_code(), ResponseCode::COMMUNICATION_ERROR);

    let err = driver
        .control(lun, IFDNFC_CTRL_ACTIVE, &req[..100], ControlResponse::LEN)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidLength { .. }));

    let bogus = ControlRequest {
        command: 9,
        connstring: String::new(),
    }
    .encode();
    let err = driver
        .control(lun, IFDNFC_CTRL_ACTIVE, &bogus, ControlResponse::LEN)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownCommand(9)));
    assert_eq!(err.response_code(), ResponseCode::COMMUNICATION_ERROR);

    // none of the above touched the slot
    assert_eq!(radio.open_transports(), 1);
    assert!(driver.slot(lun).unwrap().lock().is_connected());
}

#[test]
fn response_layout_is_host_endian() {
    let (_radio, driver, lun) = active_driver();
    let req = ControlRequest::new(ControlCommand::GetStatus, "").encode();
    let raw = driver
        .control(lun, IFDNFC_CTRL_ACTIVE, &req, ControlResponse::LEN)
        .unwrap();
    assert_eq!(raw.len(), 1032);
    assert_eq!(&raw[..4], &1i32.to_ne_bytes());
    assert_eq!(raw[4], 1);
    assert_eq!(raw[5], 0);
    assert_eq!(&raw[6..12], b"mock:0");
    assert_eq!(raw[12], 0);
}
