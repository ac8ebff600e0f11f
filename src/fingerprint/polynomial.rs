// Polynomials over GF(2) of arbitrary degree.
//
// Coefficients are bits: bit `i` of the limb vector is the coefficient of
// x^i. Limbs are little-endian `u64` words with no trailing zero limbs, so
// the zero polynomial has no limbs and equality is plain limb equality.
//
// Addition and subtraction are both XOR. `modulo` is synthetic division,
// which costs O(deg(self) - deg(m)) shifted XORs; the table-driven
// fingerprint uses these exact operations only to precompute its tables.

use std::cmp::Ordering;
use std::fmt;

/// An immutable polynomial over GF(2).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Polynomial {
    limbs: Vec<u64>,
}

impl Polynomial {
    /// The zero polynomial (no terms).
    pub fn zero() -> Self {
        Self { limbs: Vec::new() }
    }

    /// The polynomial `1`.
    pub fn one() -> Self {
        Self::from_u64(1)
    }

    /// The polynomial `x`.
    pub fn x() -> Self {
        Self::from_u64(2)
    }

    /// Bit `i` of `bits` becomes the coefficient of x^i.
    pub fn from_u64(bits: u64) -> Self {
        let mut p = Self { limbs: vec![bits] };
        p.normalize();
        p
    }

    /// Big-endian bit string: the lowest bit of the last byte is x^0.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut limbs = vec![0u64; bytes.len().div_ceil(8)];
        for (i, &byte) in bytes.iter().rev().enumerate() {
            limbs[i / 8] |= u64::from(byte) << ((i % 8) * 8);
        }
        let mut p = Self { limbs };
        p.normalize();
        p
    }

    /// Monic polynomial of exactly `degree`: the terms below `degree` are
    /// taken from `bytes` (read as in [`from_bytes`](Self::from_bytes);
    /// missing bytes count as zero) and x^degree is set.
    pub fn from_bytes_with_degree(bytes: &[u8], degree: usize) -> Self {
        let mut p = Self::from_bytes(bytes);
        p.limbs.truncate(degree / 64 + 1);
        if let Some(last) = p.limbs.get_mut(degree / 64) {
            *last &= (1u64 << (degree % 64)) - 1;
        }
        p.normalize();
        p.set_degree(degree)
    }

    /// Draw random monic polynomials of `degree` until one is irreducible.
    ///
    /// `fill` supplies random bytes; it is called once per candidate with a
    /// buffer of `degree / 8 + 1` bytes.
    pub fn irreducible_with<F>(degree: usize, mut fill: F) -> Self
    where
        F: FnMut(&mut [u8]),
    {
        let mut bytes = vec![0u8; degree / 8 + 1];
        loop {
            fill(&mut bytes);
            let candidate = Self::from_bytes_with_degree(&bytes, degree);
            if candidate.is_irreducible() {
                return candidate;
            }
        }
    }

    fn normalize(&mut self) {
        while self.limbs.last() == Some(&0) {
            self.limbs.pop();
        }
    }

    /// Degree of the highest term, or `None` for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        let last = *self.limbs.last()?;
        Some((self.limbs.len() - 1) * 64 + 63 - last.leading_zeros() as usize)
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }

    /// Whether the term x^k is present.
    pub fn has_degree(&self, k: usize) -> bool {
        self.limbs
            .get(k / 64)
            .is_some_and(|&limb| limb >> (k % 64) & 1 == 1)
    }

    /// Copy of `self` with the x^k term set.
    pub fn set_degree(&self, k: usize) -> Self {
        let mut p = self.clone();
        if p.limbs.len() <= k / 64 {
            p.limbs.resize(k / 64 + 1, 0);
        }
        p.limbs[k / 64] |= 1u64 << (k % 64);
        p
    }

    /// Copy of `self` with the x^k term cleared.
    pub fn clear_degree(&self, k: usize) -> Self {
        let mut p = self.clone();
        if let Some(limb) = p.limbs.get_mut(k / 64) {
            *limb &= !(1u64 << (k % 64));
        }
        p.normalize();
        p
    }

    /// The lowest 64 coefficients as a bit string; higher terms are dropped.
    pub fn low_u64(&self) -> u64 {
        self.limbs.first().copied().unwrap_or(0)
    }

    /// The polynomial as a bit string, if its degree is below 64.
    pub fn to_u64(&self) -> Option<u64> {
        (self.limbs.len() <= 1).then(|| self.low_u64())
    }

    // -----------------------------------------------------------------------
    // Arithmetic
    // -----------------------------------------------------------------------

    /// `self ^= other << shift`, in place.
    fn xor_shifted_assign(&mut self, other: &Polynomial, shift: usize) {
        if other.is_zero() {
            return;
        }
        let limb_shift = shift / 64;
        let bit_shift = shift % 64;
        let needed = other.limbs.len() + limb_shift + 1;
        if self.limbs.len() < needed {
            self.limbs.resize(needed, 0);
        }
        for (i, &limb) in other.limbs.iter().enumerate() {
            self.limbs[i + limb_shift] ^= limb << bit_shift;
            if bit_shift != 0 {
                self.limbs[i + limb_shift + 1] ^= limb >> (64 - bit_shift);
            }
        }
        self.normalize();
    }

    fn zip_limbs(&self, other: &Polynomial, op: impl Fn(u64, u64) -> u64) -> Self {
        let len = self.limbs.len().max(other.limbs.len());
        let limbs = (0..len)
            .map(|i| {
                op(
                    self.limbs.get(i).copied().unwrap_or(0),
                    other.limbs.get(i).copied().unwrap_or(0),
                )
            })
            .collect();
        let mut p = Self { limbs };
        p.normalize();
        p
    }

    /// `self + other` (and `self - other`) in GF(2).
    pub fn xor(&self, other: &Polynomial) -> Self {
        self.zip_limbs(other, |a, b| a ^ b)
    }

    pub fn or(&self, other: &Polynomial) -> Self {
        self.zip_limbs(other, |a, b| a | b)
    }

    pub fn and(&self, other: &Polynomial) -> Self {
        self.zip_limbs(other, |a, b| a & b)
    }

    /// `self * x^bits`.
    pub fn shl(&self, bits: usize) -> Self {
        let mut p = Self::zero();
        p.xor_shifted_assign(self, bits);
        p
    }

    /// `self / x^bits`, dropping terms below x^bits.
    pub fn shr(&self, bits: usize) -> Self {
        let limb_shift = bits / 64;
        let bit_shift = bits % 64;
        if limb_shift >= self.limbs.len() {
            return Self::zero();
        }
        let src = &self.limbs[limb_shift..];
        let limbs = (0..src.len())
            .map(|i| {
                let lo = src[i] >> bit_shift;
                let hi = match (bit_shift, src.get(i + 1)) {
                    (0, _) | (_, None) => 0,
                    (_, Some(&next)) => next << (64 - bit_shift),
                };
                lo | hi
            })
            .collect();
        let mut p = Self { limbs };
        p.normalize();
        p
    }

    /// Carry-less product.
    pub fn mul(&self, other: &Polynomial) -> Self {
        let mut product = Self::zero();
        for (i, &limb) in self.limbs.iter().enumerate() {
            let mut bits = limb;
            while bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                product.xor_shifted_assign(other, i * 64 + bit);
                bits &= bits - 1;
            }
        }
        product
    }

    /// Remainder of `self / m` by synthetic division.
    ///
    /// # Panics
    ///
    /// Panics if `m` is the zero polynomial.
    pub fn modulo(&self, m: &Polynomial) -> Self {
        let Some(dm) = m.degree() else {
            panic!("polynomial division by zero");
        };
        let mut r = self.clone();
        while let Some(dr) = r.degree() {
            if dr < dm {
                break;
            }
            r.xor_shifted_assign(m, dr - dm);
        }
        r
    }

    /// `self^e mod m` by square-and-multiply.
    pub fn mod_pow(&self, mut e: u64, m: &Polynomial) -> Self {
        let mut result = Self::one().modulo(m);
        let mut base = self.modulo(m);
        while e != 0 {
            if e & 1 == 1 {
                result = result.mul(&base).modulo(m);
            }
            e >>= 1;
            base = base.mul(&base).modulo(m);
        }
        result
    }

    /// Greatest common divisor (Euclid).
    pub fn gcd(&self, other: &Polynomial) -> Self {
        let mut a = self.clone();
        let mut b = other.clone();
        while !b.is_zero() {
            let r = a.modulo(&b);
            a = b;
            b = r;
        }
        a
    }

    // -----------------------------------------------------------------------
    // Reducibility
    // -----------------------------------------------------------------------

    /// Ben-Or irreducibility test.
    ///
    /// `p` of degree `d` is irreducible iff `gcd(p, x^(2^i) - x) = 1` for
    /// every `1 <= i <= d/2`. `0`, `1` and `x` are treated as reducible.
    pub fn is_irreducible(&self) -> bool {
        let Some(degree) = self.degree() else {
            return false;
        };
        if degree <= 1 && (*self == Self::one() || *self == Self::x()) {
            return false;
        }

        let x = Self::x();
        // x^(2^i) mod self, squared once per round.
        let mut power = x.modulo(self);
        for _ in 1..=degree / 2 {
            power = power.mul(&power).modulo(self);
            let b = power.xor(&x).modulo(self);
            if self.gcd(&b) != Self::one() {
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Formatting
    // -----------------------------------------------------------------------

    /// Uppercase hex digits of the bit string, `"0"` for zero.
    pub fn to_hex_string(&self) -> String {
        let mut limbs = self.limbs.iter().rev();
        let Some(top) = limbs.next() else {
            return "0".to_string();
        };
        let mut s = format!("{top:X}");
        for limb in limbs {
            s.push_str(&format!("{limb:016X}"));
        }
        s
    }

    /// Binary digits, highest degree first, `"0"` for zero.
    pub fn to_binary_string(&self) -> String {
        match self.degree() {
            None => "0".to_string(),
            Some(d) => (0..=d)
                .rev()
                .map(|k| if self.has_degree(k) { '1' } else { '0' })
                .collect(),
        }
    }

    fn terms_descending(&self) -> impl Iterator<Item = usize> + '_ {
        let top = self.degree().map_or(0, |d| d + 1);
        (0..top).rev().filter(|&k| self.has_degree(k))
    }
}

impl Ord for Polynomial {
    /// Orders polynomials as the binary numbers formed by their coefficients.
    fn cmp(&self, other: &Self) -> Ordering {
        self.limbs
            .len()
            .cmp(&other.limbs.len())
            .then_with(|| self.limbs.iter().rev().cmp(other.limbs.iter().rev()))
    }
}

impl PartialOrd for Polynomial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Polynomial {
    /// `x^8 + x^4 + x^3 + x^1 + 1`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        for (i, k) in self.terms_descending().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            if k == 0 {
                f.write_str("1")?;
            } else {
                write!(f, "x^{k}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polynomial(0x{})", self.to_hex_string())
    }
}
