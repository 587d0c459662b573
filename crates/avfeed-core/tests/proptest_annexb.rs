//! Property-based tests for Annex-B reframing and timestamp normalization.

use avfeed_core::annexb::{self, START_CODE};
use avfeed_core::timestamp::{normalize, SENTINEL};
use proptest::prelude::*;

fn nal_units() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 0..16)
}

fn length_prefixed(nals: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for nal in nals {
        out.extend_from_slice(&(nal.len() as u32).to_be_bytes());
        out.extend_from_slice(nal);
    }
    out
}

proptest! {
    #[test]
    fn reframing_roundtrips_payload(nals in nal_units()) {
        let payload = length_prefixed(&nals);

        let mut rebuilt = Vec::with_capacity(payload.len());
        let mut count = 0;
        for frame in annexb::frames(&payload) {
            let frame = frame.unwrap();
            prop_assert_eq!(&frame[..START_CODE.len()], &START_CODE[..]);
            let nal = annexb::strip_start_code(&frame).unwrap();
            rebuilt.extend_from_slice(&(nal.len() as u32).to_be_bytes());
            rebuilt.extend_from_slice(nal);
            count += 1;
        }

        prop_assert_eq!(count, nals.len());
        prop_assert_eq!(rebuilt, payload);
    }

    #[test]
    fn truncated_payload_never_yields_partial_units(
        nals in nal_units().prop_filter("non-empty", |n| n.iter().any(|u| !u.is_empty())),
        cut in 1usize..64,
    ) {
        let payload = length_prefixed(&nals);
        let cut = cut.min(payload.len());
        let truncated = &payload[..payload.len() - cut];

        let mut ok = 0;
        let mut errors = 0;
        for item in annexb::records(truncated) {
            match item {
                Ok(nal) => {
                    prop_assert_eq!(errors, 0);
                    prop_assert_eq!(nal, &nals[ok][..]);
                    ok += 1;
                }
                Err(e) => {
                    prop_assert!(e.needed > e.remaining);
                    errors += 1;
                }
            }
        }
        prop_assert!(errors <= 1);
        prop_assert!(ok <= nals.len());
    }

    #[test]
    fn normalize_passes_values_below_sentinel(t in 0..SENTINEL) {
        prop_assert_eq!(normalize(t), t);
    }

    #[test]
    fn normalize_zeroes_sentinel_and_above(t in SENTINEL..=u64::MAX) {
        prop_assert_eq!(normalize(t), 0);
    }
}
