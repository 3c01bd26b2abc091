//! Mathematical primitives for the BFV backend.
//!
//! - **Modular arithmetic** with Barrett reduction for 64- and 128-bit inputs
//! - **Prime generation** for the NTT-friendly coefficient modulus
//! - **CRT** reconstruction of RNS residues
//! - **Number-Theoretic Transform (NTT)** per RNS prime
//! - **Polynomial operations** over R_Q = Z_Q[X]/(X^d + 1) in RNS form
//! - **Gaussian and ternary sampling** for keys and errors

pub mod crt;
pub mod gaussian;
pub mod modular;
pub mod ntt;
pub mod poly;
pub mod primes;

pub use crt::{mod_inverse, RnsBase};
pub use gaussian::{sample_ternary, GaussianSampler, DEFAULT_SIGMA};
pub use modular::Modulus;
pub use ntt::NttContext;
pub use poly::Poly;
pub use primes::{coeff_modulus_create, is_prime};
