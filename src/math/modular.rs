//! Modular arithmetic over Z_q with Barrett reduction
//!
//! `Modulus` precomputes ⌊2^128 / q⌋ so that 64-bit and 128-bit inputs can be
//! reduced without a hardware division.

use serde::{Deserialize, Serialize};

/// A coefficient-modulus prime with its Barrett constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modulus {
    value: u64,
    /// ⌊2^128 / q⌋ as (low word, high word)
    ratio: [u64; 2],
}

impl Modulus {
    /// Wrap a modulus value. Panics on q < 2 or q ≥ 2^62.
    pub fn new(value: u64) -> Self {
        assert!(value >= 2, "modulus must be at least 2");
        assert!(value < (1u64 << 62), "modulus must fit in 62 bits");

        // 2^128 / q computed as (2^128 - 1) / q, exact unless q is a power of two
        let mut ratio = u128::MAX / value as u128;
        if (u128::MAX % value as u128) == value as u128 - 1 {
            ratio += 1;
        }
        Self {
            value,
            ratio: [ratio as u64, (ratio >> 64) as u64],
        }
    }

    /// The modulus q
    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Number of significant bits in q
    pub fn bit_count(&self) -> u32 {
        64 - self.value.leading_zeros()
    }

    /// Reduce a 64-bit value modulo q
    #[inline]
    pub fn barrett_reduce_64(&self, input: u64) -> u64 {
        let quotient = ((input as u128 * self.ratio[1] as u128) >> 64) as u64;
        let r = input.wrapping_sub(quotient.wrapping_mul(self.value));
        if r >= self.value {
            r - self.value
        } else {
            r
        }
    }

    /// Reduce a 128-bit value modulo q
    #[inline]
    pub fn barrett_reduce_128(&self, input: u128) -> u64 {
        let lo = input as u64;
        let hi = (input >> 64) as u64;
        let [r0, r1] = self.ratio;

        // Only the high word of (input * ratio) >> 128 is needed
        let carry = ((lo as u128 * r0 as u128) >> 64) as u64;
        let t = lo as u128 * r1 as u128;
        let (mid, c) = (t as u64).overflowing_add(carry);
        let upper = (t >> 64) as u64 + c as u64;

        let t = hi as u128 * r0 as u128;
        let (_, c) = mid.overflowing_add(t as u64);
        let carry = (t >> 64) as u64 + c as u64;

        let quotient = hi
            .wrapping_mul(r1)
            .wrapping_add(upper)
            .wrapping_add(carry);

        let r = lo.wrapping_sub(quotient.wrapping_mul(self.value));
        if r >= self.value {
            r - self.value
        } else {
            r
        }
    }

    /// Add two reduced values modulo q
    #[inline]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        let sum = a + b;
        if sum >= self.value {
            sum - self.value
        } else {
            sum
        }
    }

    /// Subtract two reduced values modulo q
    #[inline]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            self.value - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.barrett_reduce_128(a as u128 * b as u128)
    }

    /// Negate a reduced value modulo q
    #[inline]
    pub fn neg(&self, a: u64) -> u64 {
        if a == 0 {
            0
        } else {
            self.value - a
        }
    }

    /// Representation of a signed integer in Z_q
    #[inline]
    pub fn from_signed(&self, val: i64) -> u64 {
        if val >= 0 {
            self.barrett_reduce_64(val as u64)
        } else {
            self.neg(self.barrett_reduce_64(val.unsigned_abs()))
        }
    }

    /// Modular exponentiation by square-and-multiply
    pub fn pow(&self, mut base: u64, mut exp: u64) -> u64 {
        let mut result = 1 % self.value;
        base = self.barrett_reduce_64(base);
        while exp > 0 {
            if exp & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            exp >>= 1;
        }
        result
    }
}
