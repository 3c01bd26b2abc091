//! Noise flooding.
//!
//! Before a ciphertext leaves the party that evaluated it, a fresh uniform
//! polynomial with `b`-bit coefficients is added to each component. The
//! decryptor then sees noise whose size no longer depends on the evaluation
//! history. Every coefficient is drawn once and reduced into each prime, so
//! the mask is a consistent RNS value rather than independent residues.

use std::time::Instant;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::bfv::{Ciphertext, CryptoContext};
use crate::error::{violation, Result};
use crate::math::{Modulus, Poly};

/// Flooding widths are restricted to 1..=127 bits
pub const MAX_NOISE_BITS: u32 = 127;

/// Add independent `noise_bits`-bit masks to both ciphertext components
pub fn flood(ct: &mut Ciphertext, ctx: &CryptoContext, noise_bits: u32) -> Result<()> {
    let mut rng = ChaCha20Rng::from_entropy();
    flood_with_rng(ct, ctx, noise_bits, &mut rng)
}

/// [`flood`] with caller-provided randomness
pub fn flood_with_rng<R: RngCore + ?Sized>(
    ct: &mut Ciphertext,
    ctx: &CryptoContext,
    noise_bits: u32,
    rng: &mut R,
) -> Result<()> {
    if noise_bits == 0 || noise_bits > MAX_NOISE_BITS {
        return Err(violation!(
            "flooding width must be in 1..={} bits, got {}",
            MAX_NOISE_BITS,
            noise_bits
        ));
    }
    for i in 0..ct.size() {
        let part = ct.component(i);
        if part.moduli() != ctx.moduli() || part.dimension() != ctx.ring_dim() {
            return Err(violation!("ciphertext does not belong to this context"));
        }
        if part.is_ntt() {
            return Err(violation!("cannot flood a ciphertext in NTT form"));
        }
    }

    let start = Instant::now();
    for i in 0..ct.size() {
        // Fresh mask per component
        let mask = sample_mask(ctx, noise_bits, rng);
        *ct.component_mut(i) += &mask;
    }
    debug!(noise_bits, elapsed = ?start.elapsed(), "Flooded ciphertext");
    Ok(())
}

/// Uniform polynomial with coefficients in [0, 2^noise_bits), in RNS form
fn sample_mask<R: RngCore + ?Sized>(ctx: &CryptoContext, noise_bits: u32, rng: &mut R) -> Poly {
    let n = ctx.ring_dim();
    let moduli = ctx.coeff_modulus();
    let mut mask = Poly::zero(n, ctx.moduli());

    let mut residues = vec![0u64; moduli.len()];
    for i in 0..n {
        let value = draw_masked(noise_bits, rng);
        reduce_per_modulus(value, moduli, &mut residues);
        for (j, &r) in residues.iter().enumerate() {
            mask.residue_mut(j)[i] = r;
        }
    }
    mask
}

/// One uniform value below 2^noise_bits. Widths under 64 bits take a single
/// word; wider ones take a (low, high) pair with the high word masked.
fn draw_masked<R: RngCore + ?Sized>(noise_bits: u32, rng: &mut R) -> u128 {
    if noise_bits < 64 {
        let mask = (1u64 << noise_bits) - 1;
        (rng.next_u64() & mask) as u128
    } else {
        let low = rng.next_u64();
        let high_bits = noise_bits - 64;
        let high_mask = if high_bits == 0 { 0 } else { (1u64 << high_bits) - 1 };
        let high = rng.next_u64() & high_mask;
        ((high as u128) << 64) | low as u128
    }
}

/// Reduce one value into every prime: `out[j] = value mod q_j`
pub fn reduce_per_modulus(value: u128, moduli: &[Modulus], out: &mut [u64]) {
    debug_assert_eq!(moduli.len(), out.len());
    match u64::try_from(value) {
        Ok(narrow) => {
            for (r, m) in out.iter_mut().zip(moduli) {
                *r = m.barrett_reduce_64(narrow);
            }
        }
        Err(_) => {
            for (r, m) in out.iter_mut().zip(moduli) {
                *r = m.barrett_reduce_128(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeError;
    use crate::params::HeParams;

    fn ctx() -> std::sync::Arc<CryptoContext> {
        CryptoContext::new(HeParams::session(1024)).unwrap()
    }

    #[test]
    fn test_width_bounds() {
        let ctx = ctx();
        let mut ct = Ciphertext::zero(&ctx);
        for bits in [0u32, 128, 200] {
            let err = flood(&mut ct, &ctx, bits).unwrap_err();
            assert!(matches!(err, HeError::ProtocolViolation(_)));
        }
        assert!(ct.is_transparent(), "rejected call must not touch the ciphertext");
        for bits in [1u32, 63, 64, 65, 127] {
            flood(&mut ct, &ctx, bits).unwrap();
        }
    }

    #[test]
    fn test_mask_is_rns_consistent() {
        let ctx = ctx();
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for bits in [20u32, 64, 100] {
            let mask = sample_mask(&ctx, bits, &mut rng);
            for i in 0..ctx.ring_dim() {
                let residues: Vec<u64> =
                    (0..ctx.moduli().len()).map(|j| mask.residue(j)[i]).collect();
                let value = ctx.rns().compose(&residues);
                assert!(value.bits() <= bits as u64);
            }
        }
    }

    #[test]
    fn test_rejects_ntt_form() {
        let ctx = ctx();
        let mut ct = Ciphertext::zero(&ctx);
        ct.component_mut(1).to_ntt(ctx.ntt());
        let before = ct.clone();
        let err = flood(&mut ct, &ctx, 40).unwrap_err();
        assert!(matches!(err, HeError::ProtocolViolation(_)));
        assert_eq!(ct, before);
    }

    #[test]
    fn test_components_get_distinct_masks() {
        let ctx = ctx();
        let mut ct = Ciphertext::zero(&ctx);
        flood(&mut ct, &ctx, 40).unwrap();
        assert_ne!(ct.component(0), ct.component(1));
        assert!(!ct.component(0).is_zero());
    }

    #[test]
    fn test_draw_masked_widths() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for _ in 0..1000 {
            assert!(draw_masked(1, &mut rng) <= 1);
            assert!(draw_masked(40, &mut rng) < 1u128 << 40);
            assert!(draw_masked(64, &mut rng) < 1u128 << 64);
            assert!(draw_masked(127, &mut rng) < 1u128 << 127);
        }
        // 64-bit width draws two words but keeps only the low one
        let mut a = ChaCha20Rng::seed_from_u64(9);
        let mut b = ChaCha20Rng::seed_from_u64(9);
        assert_eq!(draw_masked(64, &mut a), b.next_u64() as u128);
    }

    #[test]
    fn test_reduce_per_modulus() {
        let moduli: Vec<Modulus> = ctx().coeff_modulus().to_vec();
        let mut out = vec![0u64; moduli.len()];
        let value = (1u128 << 100) + 12345;
        reduce_per_modulus(value, &moduli, &mut out);
        for (r, m) in out.iter().zip(&moduli) {
            assert_eq!(*r as u128, value % m.value() as u128);
        }
        reduce_per_modulus(7, &moduli, &mut out);
        assert!(out.iter().all(|&r| r == 7));
    }
}
