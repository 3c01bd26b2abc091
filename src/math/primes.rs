//! NTT-friendly prime generation for the coefficient modulus.

use crate::error::{HeError, Result};

use super::modular::Modulus;

const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Deterministic Miller-Rabin for 64-bit integers.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }
    if n >= (1u64 << 62) {
        // Modulus only supports 62-bit values; nothing in this crate needs more
        return false;
    }

    let m = Modulus::new(n);
    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    'witness: for &a in &WITNESSES {
        let mut x = m.pow(a, d);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = m.mul(x, x);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Build a coefficient modulus for ring dimension `n`.
///
/// For every requested bit size, picks the largest primes p < 2^bits with
/// p ≡ 1 (mod 2n), assigned in descending order to the positions that asked
/// for that size. All returned primes are distinct.
pub fn coeff_modulus_create(n: usize, bit_sizes: &[u32]) -> Result<Vec<u64>> {
    let factor = 2 * n as u64;
    let mut result = vec![0u64; bit_sizes.len()];

    let mut sizes: Vec<u32> = bit_sizes.to_vec();
    sizes.sort_unstable();
    sizes.dedup();

    for bits in sizes {
        let count = bit_sizes.iter().filter(|&&b| b == bits).count();
        let primes = largest_primes(bits, factor, count)?;

        let positions = bit_sizes
            .iter()
            .enumerate()
            .filter(|(_, &b)| b == bits)
            .map(|(i, _)| i);
        for (pos, p) in positions.zip(primes) {
            result[pos] = p;
        }
    }

    Ok(result)
}

fn largest_primes(bits: u32, factor: u64, count: usize) -> Result<Vec<u64>> {
    let lower = 1u64 << (bits - 1);
    let mut candidate = (1u64 << bits) - factor + 1;
    let mut primes = Vec::with_capacity(count);

    while primes.len() < count && candidate > lower {
        if is_prime(candidate) {
            primes.push(candidate);
        }
        candidate -= factor;
    }

    if primes.len() < count {
        return Err(HeError::InvalidParameters(format!(
            "not enough {}-bit primes congruent to 1 mod {}",
            bits, factor
        )));
    }
    Ok(primes)
}
