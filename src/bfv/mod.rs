//! Batched BFV over Z_t, t = 65537.
//!
//! Plays the role of the external HE library for the session layer: fixed
//! parameters, public-key encryption, batch encoding, plaintext/ciphertext
//! arithmetic and Galois rotations. All objects of a session share one
//! [`CryptoContext`].

mod ciphertext;
mod context;
mod encoder;
mod encrypt;
mod evaluator;
mod galois;
mod keys;

pub use ciphertext::Ciphertext;
pub use context::CryptoContext;
pub use encoder::{BatchEncoder, Plaintext};
pub use encrypt::{Decryptor, Encryptor};
pub use evaluator::Evaluator;
pub use galois::{GaloisKeys, KeySwitchKey, SeededRow};
pub use keys::{KeyGenerator, PublicKey, SecretKey};
