// Reference fingerprint computed step by step with `Polynomial` arithmetic.
//
// Slow (a synthetic division per byte) but valid for any modulus degree;
// the table-driven fingerprints are checked against it.

use std::collections::VecDeque;

use super::{Fingerprint, Polynomial, WindowedFingerprint};

/// Exact Rabin fingerprint with an optional sliding window.
#[derive(Clone, Debug)]
pub struct PolynomialFingerprint {
    poly: Polynomial,
    value: Polynomial,
    /// Window length in bytes; 0 disables windowing.
    window_size: usize,
    window: VecDeque<u8>,
}

impl PolynomialFingerprint {
    /// Unwindowed fingerprint of everything pushed.
    pub fn new(poly: Polynomial) -> Self {
        Self::with_window(poly, 0)
    }

    /// Fingerprint of the last `window_size` bytes (0 means unwindowed).
    pub fn with_window(poly: Polynomial, window_size: usize) -> Self {
        Self {
            poly,
            value: Polynomial::zero(),
            window_size,
            window: VecDeque::with_capacity(window_size + 1),
        }
    }

    pub fn polynomial(&self) -> &Polynomial {
        &self.poly
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}

impl Fingerprint for PolynomialFingerprint {
    fn push_byte(&mut self, b: u8) {
        self.value = self
            .value
            .shl(8)
            .or(&Polynomial::from_u64(b as u64))
            .modulo(&self.poly);

        if self.window_size > 0 {
            self.window.push_back(b);
            if self.window.len() > self.window_size {
                self.pop_byte();
            }
        }
    }

    fn reset(&mut self) {
        self.value = Polynomial::zero();
        self.window.clear();
    }

    fn fingerprint(&self) -> Polynomial {
        self.value.clone()
    }
}

impl WindowedFingerprint for PolynomialFingerprint {
    fn pop_byte(&mut self) {
        let Some(b) = self.window.pop_front() else {
            return;
        };
        let contribution = Polynomial::from_u64(b as u64)
            .shl(self.window_size * 8)
            .modulo(&self.poly);
        self.value = self.value.xor(&contribution);
    }
}
