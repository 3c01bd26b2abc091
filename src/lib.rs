//! Two-party BFV session layer for semi-honest 2PC
//!
//! This crate bootstraps a homomorphic-encryption session between two parties
//! and moves ciphertexts between them:
//! - A two-message key exchange in which one party generates keys and the other
//!   receives the public key and Galois keys
//! - Length-prefixed framing of ciphertexts and ciphertext vectors over a
//!   byte channel
//! - Noise flooding, which masks the noise of evaluated ciphertexts before
//!   they are returned for decryption
//!
//! The BFV backend (`bfv`, `math`) uses fixed parameters: four coefficient
//! primes of 60, 60, 60 and 49 bits and plaintext modulus 65537.
//!
//! ```no_run
//! use he_bootstrap::{bootstrap, flood, NetIo, Role, SessionConfig};
//!
//! let mut io = NetIo::connect("127.0.0.1", 32000)?;
//! let session = bootstrap(Role::Generator, &mut io, &SessionConfig::new(8192))?;
//! let encoder = session.encoder()?;
//! let mut ct = session.encryptor()?.encrypt(&encoder.encode(&[1, 2, 3])?)?;
//! flood(&mut ct, session.context(), 40)?;
//! # Ok::<(), he_bootstrap::HeError>(())
//! ```

pub mod bfv;
pub mod error;
pub mod flood;
pub mod math;
pub mod net;
pub mod params;
pub mod session;

pub use bfv::{
    BatchEncoder, Ciphertext, CryptoContext, Decryptor, Encryptor, Evaluator, GaloisKeys,
    KeyGenerator, Plaintext, PublicKey, SecretKey,
};
pub use error::{HeError, Result};
pub use flood::{flood, flood_with_rng};
pub use net::{
    recv_ciphertext, recv_encrypted_vector, send_ciphertext, send_encrypted_vector, Channel,
    NetIo,
};
pub use params::{HeParams, SecurityLevel, PRIME_MOD};
pub use session::{bootstrap, teardown_session, Role, SessionConfig, SessionHandles};
