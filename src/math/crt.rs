//! CRT (Chinese Remainder Theorem) helpers.
//!
//! Decryption needs the full integer behind an RNS residue vector, so the base
//! keeps the punctured products Q/q_j as big integers.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use super::modular::Modulus;

/// Compute a modular inverse using extended Euclidean algorithm.
///
/// Returns `None` when `a` is not invertible modulo `modulus`.
pub fn mod_inverse(a: u64, modulus: u64) -> Option<u64> {
    let mut t: i128 = 0;
    let mut new_t: i128 = 1;
    let mut r: i128 = modulus as i128;
    let mut new_r: i128 = (a % modulus) as i128;

    while new_r != 0 {
        let quotient = r / new_r;
        let tmp_t = t - quotient * new_t;
        t = new_t;
        new_t = tmp_t;

        let tmp_r = r - quotient * new_r;
        r = new_r;
        new_r = tmp_r;
    }

    if r != 1 {
        return None;
    }
    if t < 0 {
        t += modulus as i128;
    }
    Some(t as u64)
}

/// RNS base q_0, ..., q_{k-1} with CRT reconstruction constants
#[derive(Debug, Clone)]
pub struct RnsBase {
    moduli: Vec<Modulus>,
    /// Q = ∏ q_j
    product: BigUint,
    /// Q / q_j
    punctured: Vec<BigUint>,
    /// (Q / q_j)^{-1} mod q_j
    inv_punctured: Vec<u64>,
}

impl RnsBase {
    /// Build the base. Panics if the moduli are not pairwise coprime.
    pub fn new(moduli: &[Modulus]) -> Self {
        let product = moduli
            .iter()
            .fold(BigUint::one(), |acc, m| acc * BigUint::from(m.value()));

        let punctured: Vec<BigUint> = moduli
            .iter()
            .map(|m| &product / BigUint::from(m.value()))
            .collect();

        let inv_punctured = moduli
            .iter()
            .zip(&punctured)
            .map(|(m, p)| {
                let p_mod = (p % BigUint::from(m.value()))
                    .to_u64_digits()
                    .first()
                    .copied()
                    .unwrap_or(0);
                mod_inverse(p_mod, m.value()).expect("RNS moduli must be pairwise coprime")
            })
            .collect();

        Self {
            moduli: moduli.to_vec(),
            product,
            punctured,
            inv_punctured,
        }
    }

    /// The moduli of this base
    pub fn moduli(&self) -> &[Modulus] {
        &self.moduli
    }

    /// Q = ∏ q_j
    pub fn product(&self) -> &BigUint {
        &self.product
    }

    /// Compose residues (one per modulus) into the unique value in [0, Q).
    pub fn compose(&self, residues: &[u64]) -> BigUint {
        debug_assert_eq!(residues.len(), self.moduli.len());
        let mut acc = BigUint::zero();
        for (j, &r) in residues.iter().enumerate() {
            let scaled = self.moduli[j].mul(r, self.inv_punctured[j]);
            acc += &self.punctured[j] * scaled;
        }
        acc % &self.product
    }

    /// Split a big integer into its residues.
    pub fn decompose(&self, value: &BigUint) -> Vec<u64> {
        self.moduli
            .iter()
            .map(|m| {
                (value % BigUint::from(m.value()))
                    .to_u64_digits()
                    .first()
                    .copied()
                    .unwrap_or(0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RnsBase {
        let moduli: Vec<Modulus> = [1152921504606830593u64, 1152921504606748673, 562949952847873]
            .iter()
            .map(|&q| Modulus::new(q))
            .collect();
        RnsBase::new(&moduli)
    }

    #[test]
    fn test_mod_inverse() {
        let q = 65537;
        let inv = mod_inverse(12345, q).unwrap();
        assert_eq!((12345u128 * inv as u128) % q as u128, 1);
        assert!(mod_inverse(6, 9).is_none());
    }

    #[test]
    fn test_compose_small_value() {
        let base = base();
        let residues = base.decompose(&BigUint::from(123456789u64));
        assert_eq!(base.compose(&residues), BigUint::from(123456789u64));
    }

    #[test]
    fn test_compose_near_product() {
        let base = base();
        let value = base.product() - BigUint::from(17u32);
        let residues = base.decompose(&value);
        assert_eq!(base.compose(&residues), value);
    }
}
