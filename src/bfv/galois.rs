//! Galois (rotation) keys and RNS key switching.
//!
//! A Galois key for element g lets the evaluator move a ciphertext under
//! τ_g(s) back to s. It holds one row per RNS prime q_j:
//! ```text
//! K_j = (b_j, a_j),  b_j = -(a_j·s + e_j) + τ_g(s)·ĝ_j
//! ```
//! where ĝ_j is 1 modulo q_j and 0 modulo every other prime. Switching a
//! polynomial c splits it into its residues D_j = [c]_{q_j} and returns
//! (Σ D_j·b_j, Σ D_j·a_j).
//!
//! Rows store a 32-byte seed instead of `a_j`, halving the serialized size.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::context::CryptoContext;
use super::keys::{check_poly, SecretKey};
use crate::error::{malformed, violation, Result};
use crate::math::Poly;

/// One seeded key-switching row
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeededRow {
    /// Seed for the uniform `a_j`
    pub seed: [u8; 32],
    /// -(a_j·s + e_j) + τ_g(s)·ĝ_j
    pub b: Poly,
}

impl SeededRow {
    /// Regenerate (b, a) in NTT form
    fn expand_ntt(&self, ctx: &CryptoContext) -> (Poly, Poly) {
        let mut a = Poly::from_seed_moduli(&self.seed, ctx.ring_dim(), ctx.moduli());
        let mut b = self.b.clone();
        a.to_ntt(ctx.ntt());
        b.to_ntt(ctx.ntt());
        (b, a)
    }
}

/// Key-switching key for a single Galois element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeySwitchKey {
    pub rows: Vec<SeededRow>,
}

/// Galois keys indexed by element
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GaloisKeys {
    keys: BTreeMap<u64, KeySwitchKey>,
}

impl GaloisKeys {
    /// Generate keys for `elts` under `sk`
    pub fn generate<R: Rng + ?Sized>(
        ctx: &CryptoContext,
        sk: &SecretKey,
        elts: &[usize],
        rng: &mut R,
    ) -> Self {
        let keys = elts
            .iter()
            .map(|&g| (g as u64, generate_ks_key(ctx, sk, g, rng)))
            .collect();
        Self { keys }
    }

    /// Whether a key for element `g` is present
    pub fn has_key(&self, g: usize) -> bool {
        self.keys.contains_key(&(g as u64))
    }

    /// Elements covered, ascending
    pub fn elements(&self) -> Vec<usize> {
        self.keys.keys().map(|&g| g as usize).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn key(&self, g: usize) -> Result<&KeySwitchKey> {
        self.keys
            .get(&(g as u64))
            .ok_or_else(|| violation!("no Galois key for element {}", g))
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize and check every row against `ctx`
    pub fn load(ctx: &CryptoContext, bytes: &[u8]) -> Result<Self> {
        let gk: Self = bincode::deserialize(bytes)?;
        let two_d = 2 * ctx.ring_dim() as u64;
        for (&g, ksk) in &gk.keys {
            if g % 2 == 0 || g >= two_d {
                return Err(malformed!("invalid Galois element {}", g));
            }
            if ksk.rows.len() != ctx.moduli().len() {
                return Err(malformed!(
                    "Galois key {} has {} rows, expected {}",
                    g,
                    ksk.rows.len(),
                    ctx.moduli().len()
                ));
            }
            for row in &ksk.rows {
                check_poly(ctx, &row.b, "Galois key")?;
            }
        }
        Ok(gk)
    }
}

fn generate_ks_key<R: Rng + ?Sized>(
    ctx: &CryptoContext,
    sk: &SecretKey,
    g: usize,
    rng: &mut R,
) -> KeySwitchKey {
    let n = ctx.ring_dim();
    let moduli = ctx.moduli();
    let ntt = ctx.ntt();

    let mut s_ntt = sk.poly().clone();
    s_ntt.to_ntt(ntt);
    let s_rotated = sk.poly().automorphism(g);

    let rows = (0..moduli.len())
        .map(|j| {
            let mut seed = [0u8; 32];
            rng.fill(&mut seed);

            let mut a = Poly::from_seed_moduli(&seed, n, moduli);
            a.to_ntt(ntt);
            let mut a_s = a.mul_ntt_domain(&s_ntt, ntt);
            a_s.from_ntt(ntt);

            let e = Poly::from_signed(&ctx.error_sampler().sample_vec(n, rng), n, moduli);
            let mut b = -(a_s + e);

            let m = ctx.coeff_modulus()[j];
            for (c, &s) in b.residue_mut(j).iter_mut().zip(s_rotated.residue(j)) {
                *c = m.add(*c, s);
            }
            SeededRow { seed, b }
        })
        .collect();

    KeySwitchKey { rows }
}

/// Switch `c` (coefficient domain, under the key the Galois key was made
/// from) to the base secret. Returns (k0, k1) with k0 + k1·s ≈ c·τ_g(s).
pub(crate) fn switch_key(ctx: &CryptoContext, c: &Poly, ksk: &KeySwitchKey) -> (Poly, Poly) {
    let n = ctx.ring_dim();
    let moduli = ctx.moduli();
    let ntt = ctx.ntt();

    let mut k0 = Poly::zero(n, moduli);
    let mut k1 = Poly::zero(n, moduli);
    k0.to_ntt(ntt);
    k1.to_ntt(ntt);

    for (j, row) in ksk.rows.iter().enumerate() {
        // Digit j is residue j lifted into every prime
        let mut digit = Poly::from_unsigned(c.residue(j), n, moduli);
        digit.to_ntt(ntt);

        let (b, a) = row.expand_ntt(ctx);
        k0.mul_acc_ntt_domain(&digit, &b, ntt);
        k1.mul_acc_ntt_domain(&digit, &a, ntt);
    }

    k0.from_ntt(ntt);
    k1.from_ntt(ntt);
    (k0, k1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfv::KeyGenerator;
    use crate::params::HeParams;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_switch_key_relation() {
        let ctx = CryptoContext::new(HeParams::session(1024)).unwrap();
        let keygen = KeyGenerator::new(ctx.clone());
        let sk = keygen.secret_key();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let g = ctx.galois_elt_from_step(1);
        let gk = GaloisKeys::generate(&ctx, sk, &[g], &mut rng);

        let c = Poly::random_with_rng(ctx.ring_dim(), ctx.moduli(), &mut rng);
        let (k0, k1) = switch_key(&ctx, &c, gk.key(g).unwrap());

        // k0 + k1·s - c·τ_g(s) is small
        let s_rot = sk.poly().automorphism(g);
        let diff = &(&k0 + &k1.mul(sk.poly(), ctx.ntt())) - &c.mul(&s_rot, ctx.ntt());
        let x = ctx.rns();
        for i in 0..ctx.ring_dim() {
            let residues: Vec<u64> = (0..ctx.moduli().len()).map(|j| diff.residue(j)[i]).collect();
            let v = x.compose(&residues);
            let centered = std::cmp::min(v.clone(), x.product() - &v);
            assert!(centered.bits() < 90, "coefficient {} noise too large", i);
        }
    }

    #[test]
    fn test_galois_keys_save_load() {
        let ctx = CryptoContext::new(HeParams::session(1024)).unwrap();
        let keygen = KeyGenerator::new(ctx.clone());
        let gk = keygen.create_galois_keys();
        assert_eq!(gk.len(), ctx.galois_elts().len());
        for g in ctx.galois_elts() {
            assert!(gk.has_key(g));
        }
        let bytes = gk.save().unwrap();
        assert_eq!(GaloisKeys::load(&ctx, &bytes).unwrap(), gk);
    }

    #[test]
    fn test_missing_key() {
        let gk = GaloisKeys::default();
        assert!(gk.key(3).is_err());
        assert!(gk.is_empty());
    }
}
