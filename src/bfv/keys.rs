//! BFV key material and key generation.
//!
//! The secret key is a uniform ternary polynomial s. The public key is an RLWE
//! encryption of zero under s:
//! ```text
//! pk = (p0, p1) = (-(a·s + e), a)
//! ```
//! Both keys serialize with bincode. `load` checks the decoded polynomials
//! against the receiving context before handing them out.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use super::context::CryptoContext;
use super::galois::GaloisKeys;
use crate::error::{malformed, Result};
use crate::math::{sample_ternary, Poly};

/// Ternary secret key, coefficient domain
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecretKey {
    poly: Poly,
}

/// RLWE public key, coefficient domain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    p0: Poly,
    p1: Poly,
}

impl SecretKey {
    pub fn poly(&self) -> &Poly {
        &self.poly
    }

    /// Serialize with bincode
    pub fn save(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize and bind to `ctx`
    pub fn load(ctx: &CryptoContext, bytes: &[u8]) -> Result<Self> {
        let key: Self = bincode::deserialize(bytes)?;
        check_poly(ctx, &key.poly, "secret key")?;
        Ok(key)
    }
}

impl PublicKey {
    /// The -(a·s + e) component
    pub fn p0(&self) -> &Poly {
        &self.p0
    }

    /// The uniform `a` component
    pub fn p1(&self) -> &Poly {
        &self.p1
    }

    pub fn save(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn load(ctx: &CryptoContext, bytes: &[u8]) -> Result<Self> {
        let key: Self = bincode::deserialize(bytes)?;
        check_poly(ctx, &key.p0, "public key")?;
        check_poly(ctx, &key.p1, "public key")?;
        Ok(key)
    }
}

/// Verify a decoded polynomial belongs to `ctx`: same ring, same primes,
/// coefficient domain, fully reduced.
pub(crate) fn check_poly(ctx: &CryptoContext, poly: &Poly, what: &str) -> Result<()> {
    if poly.moduli() != ctx.moduli() {
        return Err(malformed!("{} was produced under a different coefficient modulus", what));
    }
    if poly.dimension() != ctx.ring_dim() || poly.coeffs().len() != ctx.ring_dim() * ctx.moduli().len() {
        return Err(malformed!(
            "{} has ring dimension {}, expected {}",
            what,
            poly.dimension(),
            ctx.ring_dim()
        ));
    }
    if poly.is_ntt() {
        return Err(malformed!("{} is in NTT form", what));
    }
    if !poly.is_reduced() {
        return Err(malformed!("{} has unreduced coefficients", what));
    }
    Ok(())
}

/// Owns a fresh secret key and derives public and Galois keys from it
pub struct KeyGenerator {
    ctx: Arc<CryptoContext>,
    secret_key: SecretKey,
}

impl KeyGenerator {
    /// Sample a fresh secret key from OS entropy
    pub fn new(ctx: Arc<CryptoContext>) -> Self {
        let mut rng = ChaCha20Rng::from_entropy();
        let s = sample_ternary(ctx.ring_dim(), &mut rng);
        let poly = Poly::from_signed(&s, ctx.ring_dim(), ctx.moduli());
        Self {
            ctx,
            secret_key: SecretKey { poly },
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn create_public_key(&self) -> PublicKey {
        let mut rng = ChaCha20Rng::from_entropy();
        self.public_key_with_rng(&mut rng)
    }

    /// Public key from caller-provided randomness
    pub fn public_key_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> PublicKey {
        let n = self.ctx.ring_dim();
        let moduli = self.ctx.moduli();

        let a = Poly::random_with_rng(n, moduli, rng);
        let e = Poly::from_signed(&self.ctx.error_sampler().sample_vec(n, rng), n, moduli);
        let p0 = -(&a.mul(&self.secret_key.poly, self.ctx.ntt()) + &e);

        PublicKey { p0, p1: a }
    }

    /// Galois keys for every element of `CryptoContext::galois_elts`
    pub fn create_galois_keys(&self) -> GaloisKeys {
        let mut rng = ChaCha20Rng::from_entropy();
        GaloisKeys::generate(&self.ctx, &self.secret_key, &self.ctx.galois_elts(), &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HeParams;

    fn ctx() -> Arc<CryptoContext> {
        CryptoContext::new(HeParams::session(1024)).unwrap()
    }

    #[test]
    fn test_public_key_is_encryption_of_zero() {
        let ctx = ctx();
        let keygen = KeyGenerator::new(ctx.clone());
        let pk = keygen.create_public_key();

        // p0 + p1·s = -e
        let s = keygen.secret_key().poly();
        let e = -(pk.p0() + &pk.p1().mul(s, ctx.ntt()));
        let bound = ctx.error_sampler().bound() as u64;
        for (j, &q) in ctx.moduli().iter().enumerate() {
            for &c in e.residue(j) {
                let centered = c.min(q - c);
                assert!(centered <= bound, "error {} out of bound", centered);
            }
        }
    }

    #[test]
    fn test_key_save_load() {
        let ctx = ctx();
        let keygen = KeyGenerator::new(ctx.clone());
        let pk = keygen.create_public_key();
        let bytes = pk.save().unwrap();
        assert_eq!(PublicKey::load(&ctx, &bytes).unwrap(), pk);

        let sk_bytes = keygen.secret_key().save().unwrap();
        let sk = SecretKey::load(&ctx, &sk_bytes).unwrap();
        assert_eq!(sk.poly(), keygen.secret_key().poly());
    }

    #[test]
    fn test_load_rejects_foreign_context() {
        let small = ctx();
        let other = CryptoContext::new(HeParams::session(2048)).unwrap();
        let pk = KeyGenerator::new(other).create_public_key();
        let bytes = pk.save().unwrap();
        assert!(PublicKey::load(&small, &bytes).is_err());
        assert!(PublicKey::load(&small, &bytes[..bytes.len() / 2]).is_err());
    }
}
