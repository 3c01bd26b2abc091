//! Parameter sets for the BFV session
//!
//! The session uses a fixed four-prime coefficient modulus (60, 60, 60, 49 bits)
//! and a protocol-wide plaintext modulus. Standard security-level checking is
//! switched off for the session preset: at ring dimension 8192 the 229-bit chain
//! is above the HomomorphicEncryption.org 128-bit bound, and the security of the
//! construction is argued together with the surrounding 2PC protocol rather than
//! by the HE scheme alone. Keep it that way.

use serde::{Deserialize, Serialize};

use crate::error::{HeError, Result};
use crate::math::DEFAULT_SIGMA;

/// Protocol-wide plaintext modulus (Fermat prime F4, batching-friendly up to d = 32768).
pub const PRIME_MOD: u64 = 65537;

/// Coefficient-modulus prime sizes in bits.
pub const DEFAULT_COEFF_BIT_SIZES: [u32; 4] = [60, 60, 60, 49];

/// Ring dimension used by the 2PC protocols.
pub const DEFAULT_RING_DIM: usize = 8192;

/// Security level checked by `HeParams::validate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// No check on the modulus chain
    None,
    /// 128-bit classical security per the HE standard table
    Tc128,
}

impl SecurityLevel {
    /// Largest total coefficient-modulus bit count allowed for `ring_dim`.
    pub fn max_coeff_bits(&self, ring_dim: usize) -> Option<u32> {
        match self {
            SecurityLevel::None => None,
            SecurityLevel::Tc128 => match ring_dim {
                1024 => Some(27),
                2048 => Some(54),
                4096 => Some(109),
                8192 => Some(218),
                16384 => Some(438),
                32768 => Some(881),
                _ => Some(0),
            },
        }
    }
}

/// Core cryptographic parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeParams {
    /// Ring dimension d (power of two). Equals the batching slot count.
    pub ring_dim: usize,

    /// Bit sizes of the coefficient-modulus primes
    pub coeff_bit_sizes: Vec<u32>,

    /// Plaintext modulus t, must satisfy t ≡ 1 (mod 2d) for batching
    pub plain_modulus: u64,

    /// Standard deviation for Gaussian error sampling
    pub sigma: f64,

    /// Security level enforced by `validate`
    pub security_level: SecurityLevel,
}

impl HeParams {
    /// Session parameters for the given ring dimension.
    pub fn session(ring_dim: usize) -> Self {
        Self {
            ring_dim,
            coeff_bit_sizes: DEFAULT_COEFF_BIT_SIZES.to_vec(),
            plain_modulus: PRIME_MOD,
            sigma: DEFAULT_SIGMA,
            security_level: SecurityLevel::None,
        }
    }

    /// Number of batching slots
    pub fn slot_count(&self) -> usize {
        self.ring_dim
    }

    /// Total bit count of the coefficient modulus
    pub fn total_coeff_bits(&self) -> u32 {
        self.coeff_bit_sizes.iter().sum()
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<()> {
        if !self.ring_dim.is_power_of_two() || self.ring_dim < 1024 {
            return Err(HeError::InvalidParameters(format!(
                "ring_dim must be a power of two >= 1024, got {}",
                self.ring_dim
            )));
        }

        if self.coeff_bit_sizes.is_empty() {
            return Err(HeError::InvalidParameters(
                "coefficient modulus needs at least one prime".into(),
            ));
        }

        if let Some(&bits) = self.coeff_bit_sizes.iter().find(|&&b| !(20..=61).contains(&b)) {
            return Err(HeError::InvalidParameters(format!(
                "coefficient prime size {} outside 20..=61 bits",
                bits
            )));
        }

        if self.plain_modulus < 2 || self.plain_modulus % (2 * self.ring_dim as u64) != 1 {
            return Err(HeError::InvalidParameters(format!(
                "plain modulus {} does not support batching at d = {}",
                self.plain_modulus, self.ring_dim
            )));
        }

        if let Some(max_bits) = self.security_level.max_coeff_bits(self.ring_dim) {
            if self.total_coeff_bits() > max_bits {
                return Err(HeError::InvalidParameters(format!(
                    "{} coefficient bits exceed the {:?} bound of {} at d = {}",
                    self.total_coeff_bits(),
                    self.security_level,
                    max_bits,
                    self.ring_dim
                )));
            }
        }

        Ok(())
    }
}

impl Default for HeParams {
    fn default() -> Self {
        Self::session(DEFAULT_RING_DIM)
    }
}
