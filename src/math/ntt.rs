//! Number-Theoretic Transform (NTT) for negacyclic convolution.
//!
//! Cooley-Tukey forward / Gentleman-Sande inverse over R_q = Z_q[X]/(X^d + 1),
//! one table set per RNS prime. Values in the NTT domain are kept in Montgomery
//! form (a·2^64 mod q); `forward` converts on the way in and `inverse` on the
//! way out, so pointwise products of two transformed polynomials stay
//! consistent.
//!
//! Output index k of the forward transform holds the evaluation at
//! ψ^(2·bitrev(k)+1), ψ a primitive 2d-th root of unity. The batch encoder
//! depends on this ordering.

use super::modular::Modulus;

/// Precomputed tables for one prime
#[derive(Debug, Clone)]
struct NttTables {
    modulus: Modulus,
    /// -q^(-1) mod 2^64
    q_inv_neg: u64,
    /// 2^128 mod q
    r_squared: u64,
    /// Powers of ψ in bit-reversed order, Montgomery form
    psi_powers: Vec<u64>,
    /// Powers of ψ^(-1) in bit-reversed order, Montgomery form
    psi_inv_powers: Vec<u64>,
    /// d^(-1) mod q, Montgomery form
    n_inv: u64,
}

impl NttTables {
    fn new(n: usize, modulus: Modulus) -> Self {
        let q = modulus.value();
        assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");

        let q_inv_neg = {
            let mut y: u64 = 1;
            for i in 1..64 {
                y |= y.wrapping_mul(q) & (1u64 << i);
            }
            y.wrapping_neg()
        };
        let r_squared = {
            let r = (1u128 << 64) % q as u128;
            ((r * r) % q as u128) as u64
        };

        let mut tables = Self {
            modulus,
            q_inv_neg,
            r_squared,
            psi_powers: Vec::new(),
            psi_inv_powers: Vec::new(),
            n_inv: 0,
        };

        let psi = find_primitive_root(2 * n as u64, &modulus);
        let psi_inv = modulus.pow(psi, q - 2);
        tables.psi_powers = tables.bit_reversed_powers(n, psi);
        tables.psi_inv_powers = tables.bit_reversed_powers(n, psi_inv);
        tables.n_inv = tables.to_mont(modulus.pow(n as u64, q - 2));
        tables
    }

    /// factors[m + i] = ψ^bitrev(m + i) for the butterfly at level m
    fn bit_reversed_powers(&self, n: usize, root: u64) -> Vec<u64> {
        let mut factors = vec![0u64; n];

        for m in 1..n {
            factors[m] = if m.is_power_of_two() {
                self.to_mont(self.modulus.pow(root, (n / (2 * m)) as u64))
            } else {
                // Bit reversal is additive over disjoint bits
                let high = m & (m - 1);
                let low = m & m.wrapping_neg();
                self.mont_mul(factors[high], factors[low])
            };
        }
        factors
    }

    #[inline]
    fn mont_mul(&self, a: u64, b: u64) -> u64 {
        let q = self.modulus.value();
        let ab = (a as u128) * (b as u128);
        let m = (ab as u64).wrapping_mul(self.q_inv_neg) as u128;
        let t = ((ab + m * q as u128) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    #[inline]
    fn to_mont(&self, a: u64) -> u64 {
        self.mont_mul(a, self.r_squared)
    }

    #[inline]
    fn from_mont(&self, a: u64) -> u64 {
        self.mont_mul(a, 1)
    }

    fn forward(&self, coeffs: &mut [u64]) {
        let n = coeffs.len();
        let q = self.modulus.value();

        for c in coeffs.iter_mut() {
            *c = self.to_mont(*c);
        }

        let mut t = n;
        let mut m = 1;
        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let w = self.psi_powers[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = self.mont_mul(coeffs[j + t], w);
                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }
    }

    fn inverse(&self, coeffs: &mut [u64]) {
        let n = coeffs.len();
        let q = self.modulus.value();

        let mut t = 1;
        let mut m = n;
        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j1 = i * 2 * t;
                let w = self.psi_inv_powers[m + i];
                for j in j1..j1 + t {
                    let u = coeffs[j];
                    let v = coeffs[j + t];
                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.mont_mul(diff, w);
                }
            }
            t <<= 1;
        }

        // Scale by n^(-1) and leave Montgomery form in one multiplication
        let scale = self.from_mont(self.n_inv);
        for c in coeffs.iter_mut() {
            *c = self.mont_mul(*c, scale);
        }
    }
}

/// Find a primitive n-th root of unity modulo q
fn find_primitive_root(n: u64, modulus: &Modulus) -> u64 {
    let q = modulus.value();
    let exp = (q - 1) / n;
    for g in 2..q {
        let candidate = modulus.pow(g, exp);
        if modulus.pow(candidate, n / 2) != 1 {
            return candidate;
        }
    }
    panic!("no primitive root for q = {}", q);
}

/// NTT context over one or more RNS primes
///
/// Polynomials are flat slices laid out prime-major: coefficient i of residue
/// j lives at `j * n + i`.
#[derive(Debug, Clone)]
pub struct NttContext {
    n: usize,
    tables: Vec<NttTables>,
}

impl NttContext {
    /// Context for a single modulus.
    pub fn new(n: usize, q: u64) -> Self {
        Self::with_moduli(n, &[Modulus::new(q)])
    }

    /// Context for a list of RNS primes, each ≡ 1 (mod 2n).
    pub fn with_moduli(n: usize, moduli: &[Modulus]) -> Self {
        assert!(n.is_power_of_two() && n >= 2, "n must be a power of two");
        assert!(!moduli.is_empty(), "moduli must be non-empty");

        Self {
            n,
            tables: moduli.iter().map(|&m| NttTables::new(n, m)).collect(),
        }
    }

    /// Ring dimension
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Number of RNS primes
    pub fn crt_count(&self) -> usize {
        self.tables.len()
    }

    /// Forward transform of every residue, in place.
    pub fn forward(&self, coeffs: &mut [u64]) {
        self.check_len(coeffs.len());
        for (chunk, tables) in coeffs.chunks_exact_mut(self.n).zip(&self.tables) {
            tables.forward(chunk);
        }
    }

    /// Inverse transform of every residue, in place.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        self.check_len(coeffs.len());
        for (chunk, tables) in coeffs.chunks_exact_mut(self.n).zip(&self.tables) {
            tables.inverse(chunk);
        }
    }

    /// result = a ⊙ b for NTT-domain inputs
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        self.check_len(a.len());
        self.check_len(b.len());
        self.check_len(result.len());

        for (j, tables) in self.tables.iter().enumerate() {
            let range = j * self.n..(j + 1) * self.n;
            for i in range {
                result[i] = tables.mont_mul(a[i], b[i]);
            }
        }
    }

    /// acc += a ⊙ b for NTT-domain inputs
    pub fn pointwise_mul_acc(&self, a: &[u64], b: &[u64], acc: &mut [u64]) {
        self.check_len(a.len());
        self.check_len(b.len());
        self.check_len(acc.len());

        for (j, tables) in self.tables.iter().enumerate() {
            let range = j * self.n..(j + 1) * self.n;
            for i in range {
                let prod = tables.mont_mul(a[i], b[i]);
                acc[i] = tables.modulus.add(acc[i], prod);
            }
        }
    }

    /// Convert a value into Montgomery form for residue `idx`.
    pub fn to_mont(&self, a: u64, idx: usize) -> u64 {
        self.tables[idx].to_mont(a)
    }

    /// Convert a value out of Montgomery form for residue `idx`.
    pub fn from_mont(&self, a: u64, idx: usize) -> u64 {
        self.tables[idx].from_mont(a)
    }

    fn check_len(&self, len: usize) {
        assert_eq!(
            len,
            self.n * self.crt_count(),
            "Input length must match dimension * crt_count"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: u64 = 1152921504606830593;

    fn rns_ctx(n: usize) -> NttContext {
        let moduli = [Modulus::new(Q), Modulus::new(562949952847873)];
        NttContext::with_moduli(n, &moduli)
    }

    #[test]
    fn test_roundtrip_multi_modulus() {
        let n = 1024;
        let ctx = rns_ctx(n);
        let original: Vec<u64> = (0..2 * n as u64).map(|i| i * 7919).collect();
        let mut coeffs = original.clone();

        ctx.forward(&mut coeffs);
        assert_ne!(coeffs, original);
        ctx.inverse(&mut coeffs);
        assert_eq!(coeffs, original);
    }

    #[test]
    fn test_negacyclic_convolution() {
        // x * x^(n-1) = x^n = -1 in Z_q[X]/(X^n + 1)
        let n = 256;
        let ctx = NttContext::new(n, Q);

        let mut a = vec![0u64; n];
        a[1] = 1;
        let mut b = vec![0u64; n];
        b[n - 1] = 1;

        ctx.forward(&mut a);
        ctx.forward(&mut b);
        let mut result = vec![0u64; n];
        ctx.pointwise_mul(&a, &b, &mut result);
        ctx.inverse(&mut result);

        assert_eq!(result[0], Q - 1);
        assert!(result[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_evaluation_order() {
        // Forward output k equals p(ψ^(2·bitrev(k)+1)) for some primitive 2n-th root ψ
        let n = 16;
        let t = 65537u64;
        let m = Modulus::new(t);
        let ctx = NttContext::new(n, t);
        let poly: Vec<u64> = (1..=n as u64).collect();

        let mut evals = poly.clone();
        ctx.forward(&mut evals);
        let evals: Vec<u64> = evals.iter().map(|&v| ctx.from_mont(v, 0)).collect();

        let psi = find_primitive_root(2 * n as u64, &m);
        let eval_at = |x: u64| {
            poly.iter()
                .rev()
                .fold(0u64, |acc, &c| m.add(m.mul(acc, x), c))
        };
        for (k, &value) in evals.iter().enumerate() {
            let rev = (k as u32).reverse_bits() >> (32 - 4);
            let point = m.pow(psi, 2 * rev as u64 + 1);
            assert_eq!(value, eval_at(point), "slot {}", k);
        }
    }

    #[test]
    fn test_mul_acc() {
        let n = 64;
        let ctx = NttContext::new(n, Q);
        let mut one = vec![0u64; n];
        one[0] = 1;
        let mut two = vec![0u64; n];
        two[0] = 2;
        ctx.forward(&mut one);
        ctx.forward(&mut two);

        let mut acc = vec![0u64; n];
        ctx.forward(&mut acc);
        ctx.pointwise_mul_acc(&one, &two, &mut acc);
        ctx.pointwise_mul_acc(&two, &two, &mut acc);
        ctx.inverse(&mut acc);

        assert_eq!(acc[0], 6);
        assert!(acc[1..].iter().all(|&c| c == 0));
    }
}
