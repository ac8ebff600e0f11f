use proptest::prelude::*;
use revdelta::diff::{self, DiffScript, Operation};
use revdelta::fingerprint::{
    Fingerprint, Polynomial, PolynomialFingerprint, RabinFingerprint, WindowedRabinFingerprint,
};
use revdelta::revlog::{Policy, Revlog};
use revdelta::varint;

const POLY: u64 = diff::RABIN_POLYNOMIAL;

proptest! {
    #[test]
    fn prop_diff_apply_roundtrip(
        base in proptest::collection::vec(any::<u8>(), 0..4096),
        new in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let script = diff::diff(&base, &new);
        prop_assert_eq!(diff::apply(&base, &script).unwrap(), new.clone());

        let loaded = DiffScript::unpack(&script.pack_to_vec()).unwrap();
        prop_assert_eq!(&loaded, &script);
        prop_assert_eq!(diff::apply(&base, &loaded).unwrap(), new);
    }

    #[test]
    fn prop_copies_stay_inside_base(
        base in proptest::collection::vec(0u8..4, 64..2048),
        cut in 0usize..64,
    ) {
        // Low-entropy data produces many candidate anchors per fingerprint.
        let new: Vec<u8> = base[cut..].iter().chain(&base[..cut]).copied().collect();
        let script = diff::diff(&base, &new);
        prop_assert_eq!(script.target_len(), new.len());
        for op in &script {
            if let Operation::Copy { start, end } = *op {
                prop_assert!(start <= end && end < base.len());
            }
        }
    }

    #[test]
    fn prop_identical_data_is_one_copy(
        base in proptest::collection::vec(any::<u8>(), 16..8192),
    ) {
        let script = diff::diff(&base, &base);
        prop_assert_eq!(script.len(), 1);
        prop_assert_eq!(
            script.get(0),
            Some(&Operation::Copy { start: 0, end: base.len() - 1 })
        );
    }

    #[test]
    fn prop_varint_roundtrip(value in any::<u64>(), extra in any::<u8>(), extra_bits in 0u8..=7) {
        let mut buf = [0u8; varint::MAX_VARINT_LEN];
        let len = varint::encode(value, extra, extra_bits, &mut buf).unwrap();
        prop_assert_eq!(len, varint::encoded_len(value, extra_bits));

        let decoded = varint::read_with_extra(&buf[..len], extra_bits).unwrap();
        prop_assert_eq!(decoded.value, value);
        prop_assert_eq!(decoded.len, len);
        prop_assert_eq!(u32::from(decoded.extra), u32::from(extra) & ((1u32 << extra_bits) - 1));
        for (i, b) in buf[..len].iter().enumerate() {
            prop_assert_eq!(b & 0x80 != 0, i + 1 < len);
        }
    }

    #[test]
    fn prop_table_fingerprint_matches_exact(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let p = Polynomial::from_u64(POLY);
        let mut table = RabinFingerprint::new(p.clone());
        let mut exact = PolynomialFingerprint::new(p);
        table.push_bytes(&data);
        exact.push_bytes(&data);
        prop_assert_eq!(table.fingerprint(), exact.fingerprint());
    }

    #[test]
    fn prop_rolling_window_is_position_independent(
        prefix in proptest::collection::vec(any::<u8>(), 0..256),
        window in proptest::collection::vec(any::<u8>(), 16),
    ) {
        let p = Polynomial::from_u64(POLY);
        let mut rolled = WindowedRabinFingerprint::new(p.clone(), 16);
        rolled.push_bytes(&prefix);
        rolled.push_bytes(&window);
        let mut fresh = RabinFingerprint::new(p);
        fresh.push_bytes(&window);
        prop_assert_eq!(rolled.value(), fresh.value());
    }

    #[test]
    fn prop_revlog_returns_every_version(
        versions in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..512), 1..12),
        max_delta_depth in 0usize..4,
    ) {
        let mut log = Revlog::in_memory();
        log.set_policy(Policy { max_delta_depth, ..Policy::default() });
        let mut positions = Vec::new();
        let mut current = Vec::new();
        for v in &versions {
            // Grow each version from the previous one so deltas are likely.
            current.extend_from_slice(v);
            positions.push((log.add(&current).unwrap(), current.clone()));
        }
        for (position, data) in &positions {
            prop_assert_eq!(&log.get(*position).unwrap(), data);
            prop_assert!(log.delta_depth(*position).unwrap() <= max_delta_depth);
        }
    }
}
