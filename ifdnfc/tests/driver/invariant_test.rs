#[path = "../common/mod.rs"]
mod common;

use ifdnfc::constants::{ifd, tag};
use ifdnfc::control::ControlCommand;
use ifdnfc::Mode;
use proptest::prelude::*;

use common::fixtures;
use common::helpers::{active_driver, control};

#[derive(Debug, Clone, Copy)]
enum Op {
    Insert,
    Remove,
    InsertSe,
    RemoveSe,
    Presence,
    PowerUp,
    PowerDown,
    Reset,
    Transmit,
    SetActive,
    SetActiveSe,
    SetInactive,
    FailOpen(bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Insert),
        Just(Op::Remove),
        Just(Op::InsertSe),
        Just(Op::RemoveSe),
        Just(Op::Presence),
        Just(Op::PowerUp),
        Just(Op::PowerDown),
        Just(Op::Reset),
        Just(Op::Transmit),
        Just(Op::SetActive),
        Just(Op::SetActiveSe),
        Just(Op::SetInactive),
        any::<bool>().prop_map(Op::FailOpen),
    ]
}

proptest! {
    #[test]
    fn presence_implies_connection(ops in prop::collection::vec(op(), 1..40)) {
        let (radio, driver, lun) = active_driver();
        for op in ops {
            match op {
                Op::Insert => radio.insert_target(fixtures::card()),
                Op::Remove => radio.clear_targets(),
                Op::InsertSe => radio.set_secure_element(Some(fixtures::secure_element())),
                Op::RemoveSe => radio.set_secure_element(None),
                Op::Presence => { let _ = driver.icc_presence(lun); }
                Op::PowerUp => { let _ = driver.power_icc(lun, ifd::IFD_POWER_UP, 33); }
                Op::PowerDown => { let _ = driver.power_icc(lun, ifd::IFD_POWER_DOWN, 33); }
                Op::Reset => { let _ = driver.power_icc(lun, ifd::IFD_RESET, 33); }
                Op::Transmit => { let _ = driver.transmit_to_icc(lun, &[0xFF, 0xCA, 0x00, 0x00, 0x00], 258); }
                Op::SetActive => { control(&driver, lun, ControlCommand::SetActive, "mock:0"); }
                Op::SetActiveSe => { control(&driver, lun, ControlCommand::SetActiveSe, "mock:0"); }
                Op::SetInactive => { control(&driver, lun, ControlCommand::SetInactive, ""); }
                Op::FailOpen(fail) => radio.with(|s| s.fail_open = fail),
            }

            let handle = driver.slot(lun).unwrap();
            let slot = handle.lock();
            if slot.is_present() {
                prop_assert!(slot.is_connected());
                prop_assert!(slot.target().is_some());
            } else {
                prop_assert!(slot.atr().is_empty());
            }
            if slot.mode() == Mode::Inactive {
                prop_assert!(!slot.is_connected());
            }
            prop_assert_eq!(radio.open_transports(), usize::from(slot.is_connected()));
            drop(slot);

            let atr = driver.get_capabilities(lun, tag::TAG_IFD_ATR, 33);
            prop_assert_eq!(atr.is_ok(), handle.lock().is_present());
        }
    }
}
