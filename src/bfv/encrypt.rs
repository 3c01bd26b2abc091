//! Public-key encryption and secret-key decryption

use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::ciphertext::Ciphertext;
use super::context::CryptoContext;
use super::encoder::Plaintext;
use super::keys::{PublicKey, SecretKey};
use crate::error::{violation, Result};
use crate::math::{sample_ternary, Poly};

/// Encrypts under a public key.
///
/// ```text
/// c0 = p0·u + e1 + Δ·m
/// c1 = p1·u + e2
/// ```
/// with u ternary and e1, e2 drawn from the error distribution.
pub struct Encryptor {
    ctx: Arc<CryptoContext>,
    public_key: PublicKey,
}

impl Encryptor {
    pub fn new(ctx: Arc<CryptoContext>, public_key: PublicKey) -> Self {
        Self { ctx, public_key }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn encrypt(&self, plain: &Plaintext) -> Result<Ciphertext> {
        let mut rng = ChaCha20Rng::from_entropy();
        self.encrypt_with_rng(plain, &mut rng)
    }

    /// Fresh encryption of the zero plaintext
    pub fn encrypt_zero(&self) -> Result<Ciphertext> {
        self.encrypt(&Plaintext::zero(self.ctx.ring_dim()))
    }

    pub fn encrypt_with_rng<R: Rng + ?Sized>(
        &self,
        plain: &Plaintext,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let n = self.ctx.ring_dim();
        let moduli = self.ctx.moduli();
        let ntt = self.ctx.ntt();
        check_plaintext(&self.ctx, plain)?;

        let mut u = Poly::from_signed(&sample_ternary(n, rng), n, moduli);
        u.to_ntt(ntt);
        let sampler = self.ctx.error_sampler();
        let e1 = Poly::from_signed(&sampler.sample_vec(n, rng), n, moduli);
        let e2 = Poly::from_signed(&sampler.sample_vec(n, rng), n, moduli);

        let mut p0 = self.public_key.p0().clone();
        let mut p1 = self.public_key.p1().clone();
        p0.to_ntt(ntt);
        p1.to_ntt(ntt);
        let mut c0 = p0.mul_ntt_domain(&u, ntt);
        let mut c1 = p1.mul_ntt_domain(&u, ntt);
        c0.from_ntt(ntt);
        c1.from_ntt(ntt);

        let scaled = scale_plaintext(&self.ctx, plain);
        c0 += &e1;
        c0 += &scaled;
        c1 += &e2;

        Ok(Ciphertext::from_parts(c0, c1))
    }
}

/// Decrypts with the secret key and reports the remaining noise budget
pub struct Decryptor {
    ctx: Arc<CryptoContext>,
    secret_key: SecretKey,
}

impl Decryptor {
    pub fn new(ctx: Arc<CryptoContext>, secret_key: SecretKey) -> Self {
        Self { ctx, secret_key }
    }

    pub fn decrypt(&self, ct: &Ciphertext) -> Result<Plaintext> {
        let x = self.phase(ct)?;
        let rns = self.ctx.rns();
        let q = rns.product();
        let t = BigUint::from(self.ctx.plain_modulus().value());
        let half_q: BigUint = q >> 1;

        let coeffs = self
            .coefficients(&x)
            .map(|v| {
                // round(t·v / Q) mod t
                let rounded = (v * &t + &half_q) / q;
                (rounded % &t).to_u64().unwrap_or(0)
            })
            .collect();
        Ok(Plaintext::from_coeffs(coeffs))
    }

    /// Bits of noise headroom left before decryption fails; 0 means the
    /// ciphertext is already undecryptable.
    pub fn invariant_noise_budget(&self, ct: &Ciphertext) -> Result<u32> {
        let x = self.phase(ct)?;
        let rns = self.ctx.rns();
        let q = rns.product();
        let t = BigUint::from(self.ctx.plain_modulus().value());
        let half_q: BigUint = q >> 1;

        let max_bits = self
            .coefficients(&x)
            .map(|v| {
                let scaled = (v * &t) % q;
                let centered = if scaled > half_q { q - scaled } else { scaled };
                centered.bits()
            })
            .max()
            .unwrap_or(0);

        let budget = q.bits() as i64 - max_bits as i64 - 1;
        Ok(budget.max(0) as u32)
    }

    /// c0 + c1·s in RNS form
    fn phase(&self, ct: &Ciphertext) -> Result<Poly> {
        let c0 = ct.component(0);
        let c1 = ct.component(1);
        if c0.moduli() != self.ctx.moduli() || c0.dimension() != self.ctx.ring_dim() {
            return Err(violation!("ciphertext does not belong to this context"));
        }
        let c1_s = c1.mul(self.secret_key.poly(), self.ctx.ntt());
        Ok(c0 + &c1_s)
    }

    /// CRT-compose every coefficient of `x`
    fn coefficients<'a>(&'a self, x: &'a Poly) -> impl Iterator<Item = BigUint> + 'a {
        let k = x.crt_count();
        let rns = self.ctx.rns();
        (0..x.dimension()).map(move |i| {
            let residues: Vec<u64> = (0..k).map(|j| x.residue(j)[i]).collect();
            rns.compose(&residues)
        })
    }
}

pub(crate) fn check_plaintext(ctx: &CryptoContext, plain: &Plaintext) -> Result<()> {
    let t = ctx.plain_modulus().value();
    if plain.coeffs().len() != ctx.ring_dim() {
        return Err(violation!(
            "plaintext has {} coefficients, context expects {}",
            plain.coeffs().len(),
            ctx.ring_dim()
        ));
    }
    if plain.coeffs().iter().any(|&c| c >= t) {
        return Err(violation!("plaintext coefficient not below plain modulus"));
    }
    Ok(())
}

/// Δ·m lifted into every prime
pub(crate) fn scale_plaintext(ctx: &CryptoContext, plain: &Plaintext) -> Poly {
    Poly::from_unsigned(plain.coeffs(), ctx.ring_dim(), ctx.moduli()).scalar_mul_rns(ctx.delta())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bfv::{BatchEncoder, KeyGenerator};
    use crate::params::HeParams;

    struct Fixture {
        encoder: BatchEncoder,
        encryptor: Encryptor,
        decryptor: Decryptor,
    }

    fn fixture(ring_dim: usize) -> Fixture {
        let ctx = CryptoContext::new(HeParams::session(ring_dim)).unwrap();
        let keygen = KeyGenerator::new(ctx.clone());
        Fixture {
            encoder: BatchEncoder::new(ctx.clone()),
            encryptor: Encryptor::new(ctx.clone(), keygen.create_public_key()),
            decryptor: Decryptor::new(ctx, keygen.secret_key().clone()),
        }
    }

    #[test]
    fn test_encrypt_decrypt() {
        let f = fixture(1024);
        let values: Vec<u64> = (0..1024u64).map(|i| (i * i + 3) % 65537).collect();
        let ct = f.encryptor.encrypt(&f.encoder.encode(&values).unwrap()).unwrap();
        let decoded = f.encoder.decode(&f.decryptor.decrypt(&ct).unwrap()).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_fresh_noise_budget() {
        let f = fixture(1024);
        let ct = f.encryptor.encrypt_zero().unwrap();
        let budget = f.decryptor.invariant_noise_budget(&ct).unwrap();
        // log2(Q/t) ≈ 212, fresh noise costs about 20 bits
        assert!(budget > 150 && budget < 212, "budget {}", budget);
    }

    #[test]
    fn test_transparent_zero_decrypts_to_zero() {
        let f = fixture(1024);
        let ctx = CryptoContext::new(HeParams::session(1024)).unwrap();
        let pt = f.decryptor.decrypt(&Ciphertext::zero(&ctx)).unwrap();
        assert!(pt.is_zero());
    }

    #[test]
    fn test_rejects_out_of_range_plaintext() {
        let f = fixture(1024);
        let mut coeffs = vec![0u64; 1024];
        coeffs[5] = 70000;
        assert!(f.encryptor.encrypt(&Plaintext::from_coeffs(coeffs)).is_err());
    }
}
