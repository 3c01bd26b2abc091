//! SIMD batch encoding of integer vectors modulo t.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::CryptoContext;
use crate::error::{violation, Result};

/// Plaintext polynomial with coefficients in [0, t)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plaintext {
    coeffs: Vec<u64>,
}

impl Plaintext {
    /// All-zero plaintext of the given ring dimension
    pub fn zero(ring_dim: usize) -> Self {
        Self {
            coeffs: vec![0; ring_dim],
        }
    }

    /// Wrap raw coefficients (must already be below t)
    pub fn from_coeffs(coeffs: Vec<u64>) -> Self {
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }
}

/// Packs d integers mod t into the 2 x (d/2) slot matrix of one plaintext
#[derive(Debug, Clone)]
pub struct BatchEncoder {
    ctx: Arc<CryptoContext>,
}

impl BatchEncoder {
    pub fn new(ctx: Arc<CryptoContext>) -> Self {
        Self { ctx }
    }

    /// Number of slots, equal to the ring dimension
    pub fn slot_count(&self) -> usize {
        self.ctx.slot_count()
    }

    /// Encode up to `slot_count()` values; unused slots are zero.
    ///
    /// The first d/2 values fill row 0, the rest fill row 1.
    pub fn encode(&self, values: &[u64]) -> Result<Plaintext> {
        let n = self.ctx.ring_dim();
        let t = self.ctx.plain_modulus().value();
        if values.len() > n {
            return Err(violation!(
                "{} values exceed the {} available slots",
                values.len(),
                n
            ));
        }
        if let Some(&v) = values.iter().find(|&&v| v >= t) {
            return Err(violation!("slot value {} is not below plain modulus {}", v, t));
        }

        let ntt = self.ctx.plain_ntt();
        let mut evals = vec![0u64; n];
        for (&v, &idx) in values.iter().zip(self.ctx.slot_map()) {
            evals[idx] = ntt.to_mont(v, 0);
        }
        ntt.inverse(&mut evals);
        Ok(Plaintext { coeffs: evals })
    }

    /// Decode all `slot_count()` slots.
    pub fn decode(&self, plain: &Plaintext) -> Result<Vec<u64>> {
        let n = self.ctx.ring_dim();
        if plain.coeffs.len() != n {
            return Err(violation!(
                "plaintext has {} coefficients, context expects {}",
                plain.coeffs.len(),
                n
            ));
        }

        let ntt = self.ctx.plain_ntt();
        let mut evals = plain.coeffs.clone();
        ntt.forward(&mut evals);
        Ok(self
            .ctx
            .slot_map()
            .iter()
            .map(|&idx| ntt.from_mont(evals[idx], 0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::HeParams;

    fn encoder() -> BatchEncoder {
        BatchEncoder::new(CryptoContext::new(HeParams::session(1024)).unwrap())
    }

    #[test]
    fn test_encode_decode() {
        let enc = encoder();
        let values: Vec<u64> = (0..1024u64).map(|i| (i * 977) % 65537).collect();
        let plain = enc.encode(&values).unwrap();
        assert_eq!(enc.decode(&plain).unwrap(), values);
    }

    #[test]
    fn test_short_input_zero_padded() {
        let enc = encoder();
        let decoded = enc.decode(&enc.encode(&[5, 6, 7]).unwrap()).unwrap();
        assert_eq!(&decoded[..3], &[5, 6, 7]);
        assert!(decoded[3..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_constant_vector_is_constant_poly() {
        let enc = encoder();
        let plain = enc.encode(&vec![42u64; 1024]).unwrap();
        assert_eq!(plain.coeffs()[0], 42);
        assert!(plain.coeffs()[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let enc = encoder();
        assert!(enc.encode(&[65537]).is_err());
        assert!(enc.encode(&vec![0u64; 1025]).is_err());
    }
}
