//! Polynomials over R_Q = Z_Q[X]/(X^d + 1) in RNS form.
//!
//! Q is the product of the coefficient-modulus primes q_0..q_{k-1}. A
//! polynomial stores one residue polynomial per prime, flat and prime-major:
//! coefficient i of residue j is at index `i + j * d`.
//!
//! # Example
//!
//! ```
//! use he_bootstrap::math::{NttContext, Poly, Modulus};
//!
//! let moduli = [1152921504606830593u64, 562949952847873];
//! let ctx = NttContext::with_moduli(1024, &moduli.map(Modulus::new));
//!
//! let a = Poly::from_signed(&[1, 1], 1024, &moduli);
//! let product = a.mul(&a, &ctx);
//! assert_eq!(&product.residue(0)[..3], &[1, 2, 1]);
//! ```

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use super::modular::Modulus;
use super::ntt::NttContext;

/// RNS polynomial in coefficient or NTT domain
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poly {
    /// Residues, prime-major
    coeffs: Vec<u64>,
    /// Coefficient-modulus primes
    moduli: Vec<u64>,
    /// Whether coefficients are in NTT domain (Montgomery form)
    is_ntt: bool,
}

impl Poly {
    /// Zero polynomial
    pub fn zero(dim: usize, moduli: &[u64]) -> Self {
        Self {
            coeffs: vec![0; dim * moduli.len()],
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Create from a prime-major coefficient vector, reducing every residue
    pub fn from_coeffs_moduli(mut coeffs: Vec<u64>, moduli: &[u64]) -> Self {
        assert!(!moduli.is_empty(), "moduli must be non-empty");
        assert_eq!(coeffs.len() % moduli.len(), 0, "length must be a multiple of crt count");
        let dim = coeffs.len() / moduli.len();
        for (chunk, &q) in coeffs.chunks_exact_mut(dim).zip(moduli) {
            let m = Modulus::new(q);
            for c in chunk {
                *c = m.barrett_reduce_64(*c);
            }
        }
        Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Lift small signed coefficients into every residue; missing high
    /// coefficients are zero.
    pub fn from_signed(values: &[i64], dim: usize, moduli: &[u64]) -> Self {
        assert!(values.len() <= dim, "too many coefficients");
        let mut poly = Self::zero(dim, moduli);
        for (j, &q) in moduli.iter().enumerate() {
            let m = Modulus::new(q);
            let residue = &mut poly.coeffs[j * dim..(j + 1) * dim];
            for (c, &v) in residue.iter_mut().zip(values) {
                *c = m.from_signed(v);
            }
        }
        poly
    }

    /// Lift unsigned coefficients into every residue (one reduction per prime)
    pub fn from_unsigned(values: &[u64], dim: usize, moduli: &[u64]) -> Self {
        assert!(values.len() <= dim, "too many coefficients");
        let mut poly = Self::zero(dim, moduli);
        for (j, &q) in moduli.iter().enumerate() {
            let m = Modulus::new(q);
            let residue = &mut poly.coeffs[j * dim..(j + 1) * dim];
            for (c, &v) in residue.iter_mut().zip(values) {
                *c = m.barrett_reduce_64(v);
            }
        }
        poly
    }

    /// Uniformly random polynomial, each residue independent
    pub fn random_with_rng<R: Rng + ?Sized>(dim: usize, moduli: &[u64], rng: &mut R) -> Self {
        let mut coeffs = Vec::with_capacity(dim * moduli.len());
        for &q in moduli {
            coeffs.extend((0..dim).map(|_| rng.gen_range(0..q)));
        }
        Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Deterministic uniform polynomial from a 32-byte seed (ChaCha20 expansion)
    pub fn from_seed_moduli(seed: &[u8; 32], dim: usize, moduli: &[u64]) -> Self {
        let mut rng = ChaCha20Rng::from_seed(*seed);
        Self::random_with_rng(dim, moduli, &mut rng)
    }

    /// Ring dimension d
    pub fn dimension(&self) -> usize {
        if self.moduli.is_empty() {
            0
        } else {
            self.coeffs.len() / self.moduli.len()
        }
    }

    /// Coefficient-modulus primes
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Number of RNS residues
    pub fn crt_count(&self) -> usize {
        self.moduli.len()
    }

    /// Check if in NTT domain
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Raw prime-major storage
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Mutable raw prime-major storage
    pub fn coeffs_mut(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    /// Residue polynomial modulo q_j
    pub fn residue(&self, j: usize) -> &[u64] {
        let d = self.dimension();
        &self.coeffs[j * d..(j + 1) * d]
    }

    /// Mutable residue polynomial modulo q_j
    pub fn residue_mut(&mut self, j: usize) -> &mut [u64] {
        let d = self.dimension();
        &mut self.coeffs[j * d..(j + 1) * d]
    }

    /// Every stored value is below its prime
    pub fn is_reduced(&self) -> bool {
        let d = self.dimension();
        d > 0
            && self
                .coeffs
                .chunks_exact(d)
                .zip(&self.moduli)
                .all(|(chunk, &q)| chunk.iter().all(|&c| c < q))
    }

    /// Check if polynomial is zero
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// Convert to NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert from NTT domain to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Product when both operands are in NTT domain
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(
            self.is_ntt && other.is_ntt,
            "Both polynomials must be in NTT domain"
        );
        assert_eq!(self.moduli, other.moduli, "Moduli must match");

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);
        Self {
            coeffs: result,
            moduli: self.moduli.clone(),
            is_ntt: true,
        }
    }

    /// self += a * b, everything in NTT domain
    pub fn mul_acc_ntt_domain(&mut self, a: &Self, b: &Self, ctx: &NttContext) {
        assert!(
            self.is_ntt && a.is_ntt && b.is_ntt,
            "All polynomials must be in NTT domain"
        );
        assert_eq!(self.moduli, a.moduli, "Moduli must match");
        assert_eq!(self.moduli, b.moduli, "Moduli must match");
        ctx.pointwise_mul_acc(&a.coeffs, &b.coeffs, &mut self.coeffs);
    }

    /// Negacyclic product of two coefficient-domain polynomials
    pub fn mul(&self, other: &Self, ctx: &NttContext) -> Self {
        let mut a = self.clone();
        let mut b = other.clone();
        a.to_ntt(ctx);
        b.to_ntt(ctx);
        let mut product = a.mul_ntt_domain(&b, ctx);
        product.from_ntt(ctx);
        product
    }

    /// Multiply residue j by `scalars[j]` (works in either domain)
    pub fn scalar_mul_rns(&self, scalars: &[u64]) -> Self {
        assert_eq!(scalars.len(), self.moduli.len(), "one scalar per prime");
        let mut result = self.clone();
        let d = self.dimension();
        for (j, (&q, &s)) in self.moduli.iter().zip(scalars).enumerate() {
            let m = Modulus::new(q);
            let s = m.barrett_reduce_64(s);
            for c in &mut result.coeffs[j * d..(j + 1) * d] {
                *c = m.mul(*c, s);
            }
        }
        result
    }

    /// Apply τ_g: p(X) -> p(X^g) mod (X^d + 1), coefficient domain
    pub fn automorphism(&self, g: usize) -> Self {
        assert!(!self.is_ntt, "automorphism expects coefficient domain");
        assert!(g % 2 == 1, "Galois element must be odd");

        let d = self.dimension();
        let two_d = 2 * d;
        let mut result = Self::zero(d, &self.moduli);

        for (j, &q) in self.moduli.iter().enumerate() {
            let m = Modulus::new(q);
            let src = &self.coeffs[j * d..(j + 1) * d];
            let dst = &mut result.coeffs[j * d..(j + 1) * d];
            for (i, &c) in src.iter().enumerate() {
                let idx = (g * i) % two_d;
                // X^d = -1
                if idx < d {
                    dst[idx] = c;
                } else {
                    dst[idx - d] = m.neg(c);
                }
            }
        }
        result
    }

    fn zip_with(&self, rhs: &Self, op: impl Fn(&Modulus, u64, u64) -> u64) -> Self {
        assert_eq!(self.moduli, rhs.moduli, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");
        assert_eq!(self.coeffs.len(), rhs.coeffs.len(), "Dimensions must match");

        let d = self.dimension();
        let mut coeffs = Vec::with_capacity(self.coeffs.len());
        for (j, &q) in self.moduli.iter().enumerate() {
            let m = Modulus::new(q);
            let range = j * d..(j + 1) * d;
            coeffs.extend(
                self.coeffs[range.clone()]
                    .iter()
                    .zip(&rhs.coeffs[range])
                    .map(|(&a, &b)| op(&m, a, b)),
            );
        }
        Self {
            coeffs,
            moduli: self.moduli.clone(),
            is_ntt: self.is_ntt,
        }
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |m, a, b| m.add(a, b))
    }
}

impl Add for Poly {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Self) {
        *self = &*self + rhs;
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |m, a, b| m.sub(a, b))
    }
}

impl Sub for Poly {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Self) {
        *self = &*self - rhs;
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        let d = self.dimension();
        let mut result = self.clone();
        for (j, &q) in self.moduli.iter().enumerate() {
            let m = Modulus::new(q);
            for c in &mut result.coeffs[j * d..(j + 1) * d] {
                *c = m.neg(*c);
            }
        }
        result
    }
}

impl Neg for Poly {
    type Output = Self;

    fn neg(self) -> Self::Output {
        -&self
    }
}
