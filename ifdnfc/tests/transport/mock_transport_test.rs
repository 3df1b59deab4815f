#[path = "../common/mod.rs"]
mod common;

use ifdnfc::transport::mock::MockCall;
use ifdnfc::transport::{Backend, MockRadio};
use ifdnfc::types::Modulation;
use ifdnfc::Error;

use common::fixtures;

#[test]
fn context_opens_mock_connstrings_only() {
    let radio = MockRadio::new();
    let ctx = radio.backend().init().unwrap();
    assert_eq!(ctx.list_devices().unwrap(), vec!["mock:0".to_string()]);
    assert!(matches!(
        ctx.open("pn533_usb:001:002"),
        Err(Error::DeviceNotFound(_))
    ));
    let t = ctx.open("mock:0").unwrap();
    assert_eq!(radio.open_transports(), 1);
    drop(t);
    assert_eq!(radio.open_transports(), 0);
    drop(ctx);
    assert_eq!(radio.live_contexts(), 0);
}

#[test]
fn selection_filters_modulation_and_uid() {
    let radio = MockRadio::new();
    radio.insert_target(fixtures::felica_card());
    radio.insert_target(fixtures::card());
    let mut t = radio.backend().init().unwrap().open("mock:0").unwrap();

    let a = t
        .select_passive_target(Modulation::ISO14443A_106, None)
        .unwrap();
    assert_eq!(a, Some(fixtures::card()));
    assert_eq!(
        t.select_passive_target(Modulation::ISO14443A_106, Some(&[0x01, 0x02]))
            .unwrap(),
        None
    );
    let f = t.list_passive_targets(Modulation::FELICA_212, 2).unwrap();
    assert_eq!(f, vec![fixtures::felica_card()]);
    assert!(t
        .list_passive_targets(Modulation::FELICA_424, 2)
        .unwrap()
        .is_empty());
}

#[test]
fn presence_check_and_secure_element_routing() {
    let radio = MockRadio::new();
    radio.insert_target(fixtures::card());
    radio.set_secure_element(Some(fixtures::secure_element()));
    let mut t = radio.backend().init().unwrap().open("mock:0").unwrap();

    assert!(t.target_is_present(&fixtures::card()).unwrap());
    t.init_secure_element().unwrap();
    assert!(!t.target_is_present(&fixtures::card()).unwrap());
    assert_eq!(
        t.select_passive_target(Modulation::ISO14443A_106, None)
            .unwrap(),
        Some(fixtures::secure_element())
    );
    t.init_initiator().unwrap();
    assert!(t.target_is_present(&fixtures::card()).unwrap());
}

#[test]
fn transceive_pops_whole_replies() {
    let radio = MockRadio::new();
    radio.push_response(vec![0x01, 0x02, 0x03, 0x90, 0x00]);
    radio.push_response(vec![0x01, 0x02, 0x03, 0x90, 0x00]);
    let mut t = radio.backend().init().unwrap().open("mock:0").unwrap();

    assert_eq!(
        t.transceive_bytes(&[0x00, 0xB0], 5, 100).unwrap(),
        vec![0x01, 0x02, 0x03, 0x90, 0x00]
    );
    assert!(matches!(
        t.transceive_bytes(&[0x00, 0xB0], 3, 100),
        Err(Error::Overflow {
            received: 5,
            capacity: 3
        })
    ));
    assert!(matches!(
        t.transceive_bytes(&[0x00, 0xB0], 3, 100),
        Err(Error::Timeout)
    ));
    assert_eq!(radio.sent().len(), 3);
}

#[test]
fn failure_switches() {
    let radio = MockRadio::new();
    let mut t = radio.backend().init().unwrap().open("mock:0").unwrap();
    radio.with(|s| {
        s.fail_init = true;
        s.fail_select = true;
        s.fail_deselect = true;
    });
    assert!(t.init_initiator().is_err());
    assert!(t
        .select_passive_target(Modulation::ISO14443A_106, None)
        .is_err());
    assert!(t.deselect_target().is_err());
    assert_eq!(
        radio.calls(),
        vec![
            MockCall::Open("mock:0".into()),
            MockCall::InitInitiator,
            MockCall::Select {
                modulation: Modulation::ISO14443A_106,
                uid: None
            },
            MockCall::Deselect,
        ]
    );
}
