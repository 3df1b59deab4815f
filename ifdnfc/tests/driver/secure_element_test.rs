#[path = "../common/mod.rs"]
mod common;

use ifdnfc::constants::ifd;
use ifdnfc::control::ControlCommand;
use ifdnfc::slot::FieldState;
use ifdnfc::transport::mock::MockCall;
use ifdnfc::types::Property;
use ifdnfc::{Error, Mode, Modulation};

use common::fixtures;
use common::helpers::{active_driver, control, power_up};

#[test]
fn activation_reports_secure_element() {
    let (radio, driver, lun) = active_driver();
    radio.set_secure_element(Some(fixtures::secure_element()));

    let status = control(&driver, lun, ControlCommand::SetActiveSe, "mock:0");
    assert_eq!(status.mode, Mode::ActiveWithSecureElement as i32);
    assert!(status.connected);
    assert!(status.se_available);
}

#[test]
fn presence_is_sticky_in_secure_element_mode() {
    let (radio, driver, lun) = active_driver();
    radio.set_secure_element(Some(fixtures::secure_element()));
    control(&driver, lun, ControlCommand::SetActiveSe, "mock:0");

    radio.set_secure_element(None);
    radio.clear_calls();
    for _ in 0..3 {
        assert!(driver.icc_presence(lun).unwrap());
    }
    assert!(radio.calls().is_empty());
}

#[test]
fn power_up_prefers_secure_element() {
    let (radio, driver, lun) = active_driver();
    radio.set_secure_element(Some(fixtures::secure_element()));
    radio.insert_target(fixtures::card());
    control(&driver, lun, ControlCommand::SetActiveSe, "");

    let atr = power_up(&driver, lun).unwrap();
    assert_eq!(atr.as_bytes(), &[0x3B, 0x80, 0x80, 0x01, 0x01]);
    let slot = driver.slot(lun).unwrap();
    assert_eq!(slot.lock().target().unwrap().uid(), &[0x08, 0x01, 0x02, 0x03]);
}

#[test]
fn power_up_falls_back_to_field() {
    let (radio, driver, lun) = active_driver();
    radio.insert_target(fixtures::card());
    control(&driver, lun, ControlCommand::SetActiveSe, "");

    let atr = power_up(&driver, lun).unwrap();
    assert_eq!(atr.as_bytes(), &fixtures::ATR);
}

#[test]
fn secure_element_init_failure() {
    let (radio, driver, lun) = active_driver();
    radio.with(|s| s.fail_secure_element = true);
    let status = control(&driver, lun, ControlCommand::SetActiveSe, "");
    assert!(status.connected);
    assert!(!status.se_available);
    assert!(matches!(power_up(&driver, lun), Err(Error::NoTarget)));
}

#[test]
fn back_to_plain_mode() {
    let (radio, driver, lun) = active_driver();
    radio.set_secure_element(Some(fixtures::secure_element()));
    control(&driver, lun, ControlCommand::SetActiveSe, "");
    let status = control(&driver, lun, ControlCommand::SetActive, "");
    assert_eq!(status.mode, Mode::Active as i32);
    assert!(!status.se_available);
}

#[test]
fn reset_keeps_secure_element_routing() {
    let (radio, driver, lun) = active_driver();
    radio.set_secure_element(Some(fixtures::secure_element()));
    radio.insert_target(fixtures::card());
    control(&driver, lun, ControlCommand::SetActiveSe, "");
    let atr = power_up(&driver, lun).unwrap();
    radio.clear_calls();

    let reset = driver.power_icc(lun, ifd::IFD_RESET, 33).unwrap();
    assert_eq!(reset, atr);
    assert_eq!(
        radio.calls(),
        vec![
            MockCall::Deselect,
            MockCall::SetProperty(Property::InfiniteSelect, false),
            MockCall::Select {
                modulation: Modulation::ISO14443A_106,
                uid: Some(fixtures::secure_element().uid().to_vec()),
            },
        ]
    );

    let slot = driver.slot(lun).unwrap();
    let slot = slot.lock();
    assert_eq!(slot.target().unwrap().uid(), &[0x08, 0x01, 0x02, 0x03]);
    assert!(matches!(
        slot.connection().unwrap().field(),
        FieldState::Discovered(_)
    ));
}
