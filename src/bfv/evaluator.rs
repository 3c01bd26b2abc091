//! Homomorphic operations on ciphertexts.
//!
//! Addition-type operations and plaintext products work component-wise.
//! Slot rotations apply a Galois automorphism and switch back to the original
//! secret with the matching Galois key.

use std::sync::Arc;

use super::ciphertext::Ciphertext;
use super::context::CryptoContext;
use super::encoder::Plaintext;
use super::encrypt::{check_plaintext, scale_plaintext};
use super::galois::{switch_key, GaloisKeys};
use crate::error::{violation, Result};
use crate::math::Poly;

pub struct Evaluator {
    ctx: Arc<CryptoContext>,
}

impl Evaluator {
    pub fn new(ctx: Arc<CryptoContext>) -> Self {
        Self { ctx }
    }

    pub fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        let mut out = a.clone();
        self.add_inplace(&mut out, b)?;
        Ok(out)
    }

    pub fn add_inplace(&self, a: &mut Ciphertext, b: &Ciphertext) -> Result<()> {
        self.check(a)?;
        self.check(b)?;
        for i in 0..2 {
            *a.component_mut(i) += b.component(i);
        }
        Ok(())
    }

    pub fn sub(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        self.check(a)?;
        self.check(b)?;
        let mut out = a.clone();
        for i in 0..2 {
            *out.component_mut(i) -= b.component(i);
        }
        Ok(out)
    }

    pub fn negate(&self, a: &Ciphertext) -> Result<Ciphertext> {
        self.check(a)?;
        Ok(Ciphertext::from_parts(-a.component(0), -a.component(1)))
    }

    /// ct + Enc(m), noise unchanged
    pub fn add_plain(&self, ct: &Ciphertext, plain: &Plaintext) -> Result<Ciphertext> {
        self.check(ct)?;
        check_plaintext(&self.ctx, plain)?;
        let mut out = ct.clone();
        *out.component_mut(0) += &scale_plaintext(&self.ctx, plain);
        Ok(out)
    }

    /// ct · m for a plaintext polynomial m. Noise grows by roughly t·d.
    pub fn multiply_plain(&self, ct: &Ciphertext, plain: &Plaintext) -> Result<Ciphertext> {
        self.check(ct)?;
        check_plaintext(&self.ctx, plain)?;
        let ntt = self.ctx.ntt();

        let mut m = Poly::from_unsigned(plain.coeffs(), self.ctx.ring_dim(), self.ctx.moduli());
        m.to_ntt(ntt);
        let times_m = |part: &Poly| {
            let mut c = part.clone();
            c.to_ntt(ntt);
            let mut prod = c.mul_ntt_domain(&m, ntt);
            prod.from_ntt(ntt);
            prod
        };
        Ok(Ciphertext::from_parts(
            times_m(ct.component(0)),
            times_m(ct.component(1)),
        ))
    }

    /// Apply τ_g and key-switch back to the original secret
    pub fn apply_galois(
        &self,
        ct: &Ciphertext,
        galois_elt: usize,
        keys: &GaloisKeys,
    ) -> Result<Ciphertext> {
        self.check(ct)?;
        let ksk = keys.key(galois_elt)?;

        let c0 = ct.component(0).automorphism(galois_elt);
        let c1 = ct.component(1).automorphism(galois_elt);
        let (k0, k1) = switch_key(&self.ctx, &c1, ksk);

        Ok(Ciphertext::from_parts(c0 + k0, k1))
    }

    /// Rotate both batching rows left by `steps` (right if negative).
    ///
    /// The rotation is decomposed into power-of-two steps so only the keys
    /// from `KeyGenerator::create_galois_keys` are needed.
    pub fn rotate_rows(&self, ct: &Ciphertext, steps: i64, keys: &GaloisKeys) -> Result<Ciphertext> {
        let row_size = (self.ctx.ring_dim() / 2) as i64;
        let steps = steps % row_size;
        let mut out = ct.clone();
        if steps == 0 {
            self.check(ct)?;
            return Ok(out);
        }

        let direction = steps.signum();
        let mut remaining = steps.unsigned_abs();
        let mut power = 1i64;
        while remaining > 0 {
            if remaining & 1 == 1 {
                let elt = self.ctx.galois_elt_from_step(direction * power);
                out = self.apply_galois(&out, elt, keys)?;
            }
            remaining >>= 1;
            power <<= 1;
        }
        Ok(out)
    }

    /// Swap the two batching rows
    pub fn rotate_columns(&self, ct: &Ciphertext, keys: &GaloisKeys) -> Result<Ciphertext> {
        self.apply_galois(ct, self.ctx.galois_elt_row_swap(), keys)
    }

    fn check(&self, ct: &Ciphertext) -> Result<()> {
        let c0 = ct.component(0);
        if c0.moduli() != self.ctx.moduli() || c0.dimension() != self.ctx.ring_dim() {
            return Err(violation!("ciphertext does not belong to this context"));
        }
        if c0.is_ntt() || ct.component(1).is_ntt() {
            return Err(violation!("ciphertext is in NTT form"));
        }
        Ok(())
    }
}
