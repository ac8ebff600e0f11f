// Rabin fingerprints over GF(2).
//
// A fingerprint of a message m is m(x) mod p(x) for an irreducible p of
// degree k; the first pushed byte is the most significant. Two flavours:
//   - table-driven (`RabinFingerprint`, `WindowedRabinFingerprint`): a u64
//     accumulator and 512-entry push / 256-entry pop tables, degree 8..=54;
//   - exact (`PolynomialFingerprint`): every step computed with
//     `Polynomial`, any degree, used as the reference implementation.
//
// Windowed variants keep the last W bytes in a FIFO of capacity W + 1 and
// drop the oldest byte's contribution as soon as the FIFO fills, so after
// any push the value is the fingerprint of the last W bytes only.

pub mod exact;
pub mod polynomial;
pub mod rabin;

pub use exact::PolynomialFingerprint;
pub use polynomial::Polynomial;
pub use rabin::{RabinFingerprint, WindowedRabinFingerprint};

/// A rolling fingerprint accumulator.
pub trait Fingerprint {
    fn push_byte(&mut self, b: u8);

    fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push_byte(b);
        }
    }

    /// Forget every pushed byte.
    fn reset(&mut self);

    /// Current fingerprint as a polynomial of degree below the modulus.
    fn fingerprint(&self) -> Polynomial;
}

/// A fingerprint restricted to a sliding window of recent bytes.
pub trait WindowedFingerprint: Fingerprint {
    /// Remove the contribution of the oldest byte in the window.
    ///
    /// Does nothing when the window is empty.
    fn pop_byte(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_irreducible(rng: &mut StdRng, degree: usize) -> Polynomial {
        Polynomial::irreducible_with(degree, |buf| rng.fill(buf))
    }

    #[test]
    fn table_driven_matches_exact() {
        let mut rng = StdRng::seed_from_u64(0x5eed_0001);
        for _ in 0..4 {
            let mut data = vec![0u8; 1024];
            rng.fill(&mut data[..]);
            let p = random_irreducible(&mut rng, 53);

            let mut exact = PolynomialFingerprint::new(p.clone());
            let mut table = RabinFingerprint::new(p);
            exact.push_bytes(&data);
            table.push_bytes(&data);
            assert_eq!(exact.fingerprint(), table.fingerprint());
        }
    }

    fn check_windowing<A, B>(mut windowed: A, mut plain: B, window: usize, data: &[u8])
    where
        A: Fingerprint,
        B: Fingerprint,
    {
        // Three windows through the windowed fingerprint, then one more window
        // through both starting from the same offset.
        windowed.push_bytes(&data[..window * 3]);
        for &b in &data[window * 3..window * 4] {
            windowed.push_byte(b);
            plain.push_byte(b);
        }
        assert_eq!(windowed.fingerprint(), plain.fingerprint());
    }

    #[test]
    fn windowed_equals_fingerprint_of_last_window() {
        let mut rng = StdRng::seed_from_u64(0x5eed_0002);
        let window = 8;
        for _ in 0..5 {
            let p = random_irreducible(&mut rng, 53);
            let mut data = vec![0u8; window * 5];
            rng.fill(&mut data[..]);

            check_windowing(
                PolynomialFingerprint::with_window(p.clone(), window),
                PolynomialFingerprint::new(p.clone()),
                window,
                &data,
            );
            check_windowing(
                WindowedRabinFingerprint::new(p.clone(), window),
                RabinFingerprint::new(p),
                window,
                &data,
            );
        }
    }

    #[test]
    fn windowed_table_matches_windowed_exact() {
        let mut rng = StdRng::seed_from_u64(0x5eed_0003);
        let p = random_irreducible(&mut rng, 53);
        let mut data = vec![0u8; 500];
        rng.fill(&mut data[..]);

        let mut exact = PolynomialFingerprint::with_window(p.clone(), 16);
        let mut table = WindowedRabinFingerprint::new(p, 16);
        for (i, &b) in data.iter().enumerate() {
            exact.push_byte(b);
            table.push_byte(b);
            if i % 37 == 0 {
                exact.pop_byte();
                table.pop_byte();
            }
            assert_eq!(exact.fingerprint(), table.fingerprint(), "diverged at byte {i}");
        }
    }

    #[test]
    fn reset_clears_state() {
        let p = Polynomial::from_u64(crate::diff::RABIN_POLYNOMIAL);
        let mut fp = WindowedRabinFingerprint::new(p.clone(), 4);
        fp.push_bytes(b"some bytes");
        fp.reset();
        assert!(fp.fingerprint().is_zero());
        fp.push_bytes(b"abcd");

        let mut fresh = RabinFingerprint::new(p);
        fresh.push_bytes(b"abcd");
        assert_eq!(fp.fingerprint(), fresh.fingerprint());
    }

    #[test]
    fn pop_on_empty_window_is_noop() {
        let p = Polynomial::from_u64(crate::diff::RABIN_POLYNOMIAL);
        let mut table = WindowedRabinFingerprint::new(p.clone(), 4);
        let mut exact = PolynomialFingerprint::with_window(p, 4);
        table.pop_byte();
        exact.pop_byte();
        assert!(table.fingerprint().is_zero());
        assert!(exact.fingerprint().is_zero());
    }
}
