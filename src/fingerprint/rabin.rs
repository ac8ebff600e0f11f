// Table-driven Rabin fingerprints with a u64 accumulator.
//
// Pushing byte b onto accumulator f computes ((f << 8) | b) mod p. The eight
// bits that overflow degree k are folded back with one lookup:
//   push_table[i] = (i << k) xor ((i << k) mod p)
// XORing it clears the overflow bits and adds their residue. The index uses
// nine bits so the table stays valid for the full 8..=54 degree range.
//
// Popping the byte that left a W-byte window XORs
//   pop_table[b] = (b << 8W) mod p
// which is exactly that byte's contribution once W newer bytes follow it.

use std::collections::VecDeque;

use super::{Fingerprint, Polynomial, WindowedFingerprint};

/// Smallest modulus degree the push table supports.
pub const MIN_DEGREE: usize = 8;
/// Largest modulus degree that leaves room for an 8-bit shift in a u64.
pub const MAX_DEGREE: usize = 54;

const PUSH_TABLE_LEN: usize = 512;

/// Rabin fingerprint backed by a precomputed push table.
#[derive(Clone)]
pub struct RabinFingerprint {
    poly: Polynomial,
    shift: u32,
    push_table: Box<[u64; PUSH_TABLE_LEN]>,
    value: u64,
}

impl RabinFingerprint {
    /// Build the push table for an irreducible modulus.
    ///
    /// # Panics
    ///
    /// Panics if the degree of `poly` is outside `8..=54`.
    pub fn new(poly: Polynomial) -> Self {
        let degree = match poly.degree() {
            Some(d) if (MIN_DEGREE..=MAX_DEGREE).contains(&d) => d,
            other => panic!(
                "rabin modulus degree must be in {MIN_DEGREE}..={MAX_DEGREE}, got {other:?}"
            ),
        };

        let mut push_table = Box::new([0u64; PUSH_TABLE_LEN]);
        for (i, slot) in push_table.iter_mut().enumerate() {
            let shifted = Polynomial::from_u64(i as u64).shl(degree);
            *slot = shifted.xor(&shifted.modulo(&poly)).low_u64();
        }

        Self {
            poly,
            shift: (degree - 8) as u32,
            push_table,
            value: 0,
        }
    }

    /// Shorthand for `new(Polynomial::from_u64(bits))`.
    pub fn from_u64(bits: u64) -> Self {
        Self::new(Polynomial::from_u64(bits))
    }

    /// The fingerprint as a bit string.
    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn polynomial(&self) -> &Polynomial {
        &self.poly
    }

    pub fn degree(&self) -> usize {
        self.shift as usize + 8
    }

    #[inline(always)]
    fn push(&mut self, b: u8) {
        let j = (self.value >> self.shift) as usize & (PUSH_TABLE_LEN - 1);
        self.value = ((self.value << 8) | b as u64) ^ self.push_table[j];
    }
}

impl Fingerprint for RabinFingerprint {
    #[inline]
    fn push_byte(&mut self, b: u8) {
        self.push(b);
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    fn reset(&mut self) {
        self.value = 0;
    }

    fn fingerprint(&self) -> Polynomial {
        Polynomial::from_u64(self.value)
    }
}

impl std::fmt::Debug for RabinFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RabinFingerprint")
            .field("poly", &self.poly)
            .field("value", &format_args!("{:#x}", self.value))
            .finish()
    }
}

/// Rabin fingerprint over the last `window_size` pushed bytes.
#[derive(Clone, Debug)]
pub struct WindowedRabinFingerprint {
    inner: RabinFingerprint,
    window_size: usize,
    window: VecDeque<u8>,
    pop_table: Box<[u64; 256]>,
}

impl WindowedRabinFingerprint {
    /// # Panics
    ///
    /// Panics if `window_size` is zero or the degree of `poly` is outside
    /// `8..=54`.
    pub fn new(poly: Polynomial, window_size: usize) -> Self {
        assert!(window_size > 0, "window size must be positive");
        let inner = RabinFingerprint::new(poly);

        let mut pop_table = Box::new([0u64; 256]);
        for (b, slot) in pop_table.iter_mut().enumerate() {
            *slot = Polynomial::from_u64(b as u64)
                .shl(window_size * 8)
                .modulo(inner.polynomial())
                .low_u64();
        }

        Self {
            inner,
            window_size,
            window: VecDeque::with_capacity(window_size + 1),
            pop_table,
        }
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.inner.value
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn polynomial(&self) -> &Polynomial {
        self.inner.polynomial()
    }
}

impl Fingerprint for WindowedRabinFingerprint {
    #[inline]
    fn push_byte(&mut self, b: u8) {
        self.inner.push(b);
        self.window.push_back(b);
        if self.window.len() > self.window_size {
            self.pop_byte();
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.window.clear();
    }

    fn fingerprint(&self) -> Polynomial {
        self.inner.fingerprint()
    }
}

impl WindowedFingerprint for WindowedRabinFingerprint {
    #[inline]
    fn pop_byte(&mut self) {
        if let Some(b) = self.window.pop_front() {
            self.inner.value ^= self.pop_table[b as usize];
        }
    }
}
