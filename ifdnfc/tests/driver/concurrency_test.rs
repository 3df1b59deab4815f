#[path = "../common/mod.rs"]
mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use ifdnfc::transport::TransceiveGate;
use ifdnfc::{Lun, test_support};

use common::fixtures;
use common::helpers::{init_logger, power_up};

#[test]
fn luns_progress_independently_while_one_is_busy() {
    init_logger();
    let (radio, driver) = test_support::mock_driver();
    let (a, b) = (Lun::new(0), Lun::new(1));
    driver.create_channel_by_name(a, "mock:0").unwrap();
    driver.create_channel_by_name(b, "mock:0").unwrap();
    radio.insert_target(fixtures::card());
    power_up(&driver, a).unwrap();
    power_up(&driver, b).unwrap();

    let gate = TransceiveGate::new();
    radio.set_transceive_gate(Some(gate.clone()));
    radio.push_response(vec![0x6F, 0x00, 0x90, 0x00]);
    let select = fixtures::apdu(fixtures::SELECT_PPSE);
    let second_done = AtomicBool::new(false);

    thread::scope(|s| {
        let busy = s.spawn(|| driver.transmit_to_icc(a, &select, 258));
        gate.wait_for_waiters(1);

        // lun a is held inside the radio exchange
        assert!(driver.slot(a).unwrap().try_lock().is_none());
        // lun b and the registry are not blocked by it
        assert!(driver.icc_presence(b).unwrap());
        assert!(driver.slot(b).unwrap().try_lock().is_some());

        let queued = s.spawn(|| {
            let present = driver.icc_presence(a).unwrap();
            second_done.store(true, Ordering::SeqCst);
            present
        });
        thread::sleep(Duration::from_millis(50));
        assert!(!second_done.load(Ordering::SeqCst));

        gate.open();
        assert_eq!(busy.join().unwrap().unwrap(), vec![0x6F, 0x00, 0x90, 0x00]);
        assert!(queued.join().unwrap());
    });
    assert!(second_done.load(Ordering::SeqCst));
}
