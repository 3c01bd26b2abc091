//! Fixed-parameter BFV context.
//!
//! Built once per session from `HeParams` and shared read-only (`Arc`) by every
//! encoder, encryptor, decryptor and evaluator of that session.

use std::sync::Arc;

use num_bigint::BigUint;
use tracing::debug;

use crate::error::Result;
use crate::math::{coeff_modulus_create, mod_inverse, GaussianSampler, Modulus, NttContext, RnsBase};
use crate::params::HeParams;

/// Immutable scheme context
#[derive(Debug)]
pub struct CryptoContext {
    params: HeParams,
    coeff_modulus: Vec<Modulus>,
    moduli: Vec<u64>,
    plain_modulus: Modulus,
    rns: RnsBase,
    ntt: NttContext,
    plain_ntt: NttContext,
    /// Δ = ⌊Q/t⌋ reduced modulo each prime
    delta: Vec<u64>,
    /// Batching slot index -> NTT evaluation index
    slot_map: Vec<usize>,
    sampler: GaussianSampler,
}

impl CryptoContext {
    /// Validate parameters, generate the coefficient modulus and precompute
    /// every table the scheme needs.
    pub fn new(params: HeParams) -> Result<Arc<Self>> {
        params.validate()?;

        let n = params.ring_dim;
        let moduli = coeff_modulus_create(n, &params.coeff_bit_sizes)?;
        let coeff_modulus: Vec<Modulus> = moduli.iter().map(|&q| Modulus::new(q)).collect();
        let plain_modulus = Modulus::new(params.plain_modulus);

        let rns = RnsBase::new(&coeff_modulus);
        let delta_big = rns.product() / BigUint::from(params.plain_modulus);
        let delta = rns.decompose(&delta_big);

        let ntt = NttContext::with_moduli(n, &coeff_modulus);
        let plain_ntt = NttContext::with_moduli(n, &[plain_modulus]);
        let slot_map = slot_index_map(n);

        debug!(
            ring_dim = n,
            coeff_modulus = ?moduli,
            coeff_bits = rns.product().bits(),
            plain_modulus = params.plain_modulus,
            security_level = ?params.security_level,
            "BFV context created"
        );

        Ok(Arc::new(Self {
            sampler: GaussianSampler::new(params.sigma),
            params,
            coeff_modulus,
            moduli,
            plain_modulus,
            rns,
            ntt,
            plain_ntt,
            delta,
            slot_map,
        }))
    }

    /// Parameters this context was built from
    pub fn params(&self) -> &HeParams {
        &self.params
    }

    /// Ring dimension d
    pub fn ring_dim(&self) -> usize {
        self.params.ring_dim
    }

    /// Number of batching slots
    pub fn slot_count(&self) -> usize {
        self.params.slot_count()
    }

    /// Coefficient-modulus primes with their reduction constants
    pub fn coeff_modulus(&self) -> &[Modulus] {
        &self.coeff_modulus
    }

    /// Coefficient-modulus prime values
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Plaintext modulus t
    pub fn plain_modulus(&self) -> &Modulus {
        &self.plain_modulus
    }

    /// CRT base over the coefficient modulus
    pub fn rns(&self) -> &RnsBase {
        &self.rns
    }

    /// NTT tables over the coefficient modulus
    pub fn ntt(&self) -> &NttContext {
        &self.ntt
    }

    /// NTT tables over the plaintext modulus
    pub fn plain_ntt(&self) -> &NttContext {
        &self.plain_ntt
    }

    /// Δ = ⌊Q/t⌋ in RNS form
    pub fn delta(&self) -> &[u64] {
        &self.delta
    }

    /// Slot i of the batching matrix lives at NTT index `slot_map()[i]`
    pub fn slot_map(&self) -> &[usize] {
        &self.slot_map
    }

    /// Error distribution
    pub fn error_sampler(&self) -> &GaussianSampler {
        &self.sampler
    }

    /// Galois element rotating batching rows left by `step` (right if negative)
    pub fn galois_elt_from_step(&self, step: i64) -> usize {
        let two_d = 2 * self.ring_dim() as u64;
        let m = Modulus::new(two_d);
        let generator = if step >= 0 {
            3
        } else {
            // 3 is odd, so it is always invertible mod 2d
            mod_inverse(3, two_d).unwrap_or(1)
        };
        m.pow(generator, step.unsigned_abs()) as usize
    }

    /// Galois element swapping the two batching rows
    pub fn galois_elt_row_swap(&self) -> usize {
        2 * self.ring_dim() - 1
    }

    /// Elements covered by a full set of Galois keys: 3^(±2^i) and 2d - 1
    pub fn galois_elts(&self) -> Vec<usize> {
        let row_size = self.ring_dim() / 2;
        let mut elts = Vec::new();
        let mut step = 1i64;
        while (step as usize) < row_size {
            let left = self.galois_elt_from_step(step);
            let right = self.galois_elt_from_step(-step);
            elts.push(left);
            // Rotating by half a row is the same in both directions
            if right != left {
                elts.push(right);
            }
            step <<= 1;
        }
        elts.push(self.galois_elt_row_swap());
        elts
    }
}

/// Map the 2 x (d/2) batching matrix onto bit-reversed NTT evaluation indices.
///
/// Row 0 column i sits at the evaluation point ψ^(3^i), row 1 column i at
/// ψ^(-3^i), so τ_3 rotates both rows left by one and τ_{2d-1} swaps them.
fn slot_index_map(n: usize) -> Vec<usize> {
    let log_n = n.trailing_zeros();
    let m = 2 * n;
    let row_size = n / 2;
    let reverse = |x: usize| x.reverse_bits() >> (usize::BITS - log_n);

    let mut map = vec![0usize; n];
    let mut pos = 1usize;
    for i in 0..row_size {
        map[i] = reverse((pos - 1) >> 1);
        map[row_size | i] = reverse((m - pos - 1) >> 1);
        pos = (pos * 3) % m;
    }
    map
}
