#[path = "../common/mod.rs"]
mod common;

use ifdnfc::atr::{AtrBuilder, AtrKind, PcscAtrBuilder, iso14443a_historical_bytes, synthesize};
use ifdnfc::protocol::xor;
use ifdnfc::test_support;
use proptest::prelude::*;

use common::fixtures;

#[test]
fn iso14443b_atr_reports_failure_but_is_kept() {
    let synthesis = synthesize(&PcscAtrBuilder::new(), &fixtures::iso14443b_card());
    assert!(!synthesis.succeeded);
    assert_eq!(
        synthesis.atr.as_bytes(),
        &[0x3B, 0x88, 0x80, 0x01, 0x00, 0x00, 0x00, 0x00, 0x80, 0x71, 0x81, 0x00, 0x79]
    );
}

#[test]
fn felica_has_no_atr() {
    let synthesis = synthesize(&PcscAtrBuilder::new(), &fixtures::felica_card());
    assert!(synthesis.succeeded);
    assert!(synthesis.atr.is_empty());
}

#[test]
fn malformed_atqb_rejected() {
    let builder = PcscAtrBuilder::new();
    assert!(builder.build(AtrKind::Iso14443b106, &[0x50; 11]).is_none());
    assert!(builder.build(AtrKind::Iso14443b106, &[0x51; 12]).is_none());
}

proptest! {
    #[test]
    fn iso14443a_atr_structure(hist in prop::collection::vec(any::<u8>(), 0..=15)) {
        // T0 announcing no interface bytes
        let mut ats = vec![0x00];
        ats.extend_from_slice(&hist);
        prop_assert_eq!(iso14443a_historical_bytes(&ats), &hist[..]);

        let target = test_support::iso14443a_target(&fixtures::UID, &ats);
        let synthesis = synthesize(&PcscAtrBuilder::new(), &target);
        prop_assert!(synthesis.succeeded);
        let atr = synthesis.atr.as_bytes();
        prop_assert_eq!(atr.len(), hist.len() + 5);
        prop_assert_eq!(&atr[..4], &[0x3B, 0x80 | hist.len() as u8, 0x80, 0x01]);
        prop_assert_eq!(&atr[4..4 + hist.len()], &hist[..]);
        // XOR over T0..TCK is zero
        prop_assert_eq!(xor(&atr[1..]), 0);
    }

    #[test]
    fn too_many_historical_bytes(extra in 16usize..40) {
        let mut ats = vec![0x00];
        ats.resize(1 + extra, 0x42);
        let target = test_support::iso14443a_target(&fixtures::UID, &ats);
        let synthesis = synthesize(&PcscAtrBuilder::new(), &target);
        prop_assert!(!synthesis.succeeded);
        prop_assert!(synthesis.atr.is_empty());
    }
}
