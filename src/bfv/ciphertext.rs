//! Two-component BFV ciphertexts.

use serde::{Deserialize, Serialize};

use super::context::CryptoContext;
use super::keys::check_poly;
use crate::error::{malformed, Result};
use crate::math::Poly;

/// Ciphertext (c0, c1) with c0 + c1·s ≈ Δ·m, coefficient domain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    parts: [Poly; 2],
}

impl Ciphertext {
    pub fn from_parts(c0: Poly, c1: Poly) -> Self {
        debug_assert_eq!(c0.moduli(), c1.moduli(), "components must share moduli");
        debug_assert_eq!(c0.dimension(), c1.dimension(), "components must share dimension");
        Self { parts: [c0, c1] }
    }

    /// Trivial encryption of zero under `ctx`
    pub fn zero(ctx: &CryptoContext) -> Self {
        let p = Poly::zero(ctx.ring_dim(), ctx.moduli());
        Self {
            parts: [p.clone(), p],
        }
    }

    /// Number of polynomial components (always 2)
    pub fn size(&self) -> usize {
        self.parts.len()
    }

    pub fn ring_dim(&self) -> usize {
        self.parts[0].dimension()
    }

    /// Component `i` (0 or 1)
    pub fn component(&self, i: usize) -> &Poly {
        debug_assert!(i < 2, "ciphertext has 2 components, asked for {}", i);
        &self.parts[i]
    }

    /// Mutable component `i` (0 or 1)
    pub fn component_mut(&mut self, i: usize) -> &mut Poly {
        debug_assert!(i < 2, "ciphertext has 2 components, asked for {}", i);
        &mut self.parts[i]
    }

    pub fn into_parts(self) -> (Poly, Poly) {
        let [c0, c1] = self.parts;
        (c0, c1)
    }

    /// Both components are identically zero
    pub fn is_transparent(&self) -> bool {
        self.parts.iter().all(Poly::is_zero)
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize and fully validate against `ctx`.
    pub fn load(ctx: &CryptoContext, bytes: &[u8]) -> Result<Self> {
        let ct: Self = bincode::deserialize(bytes)?;
        for part in &ct.parts {
            check_poly(ctx, part, "ciphertext")?;
        }
        Ok(ct)
    }

    /// Deserialize binding the ciphertext to `ctx`: same primes, same ring
    /// dimension, coefficient domain. No integrity check on coefficient values.
    pub fn load_unchecked(ctx: &CryptoContext, bytes: &[u8]) -> Result<Self> {
        let ct: Self = bincode::deserialize(bytes)?;
        let expected = ctx.ring_dim() * ctx.moduli().len();
        for part in &ct.parts {
            if part.crt_count() != ctx.moduli().len() || part.coeffs().len() != expected {
                return Err(malformed!(
                    "ciphertext shape {}x{} does not match context {}x{}",
                    part.crt_count(),
                    part.dimension(),
                    ctx.moduli().len(),
                    ctx.ring_dim()
                ));
            }
            if part.moduli() != ctx.moduli() {
                return Err(malformed!(
                    "ciphertext was produced under a different coefficient modulus"
                ));
            }
            if part.is_ntt() {
                return Err(malformed!("ciphertext is in NTT form"));
            }
        }
        Ok(ct)
    }
}
