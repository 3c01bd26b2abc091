//! Two-party HE session bootstrap.
//!
//! The Generator creates the key material and ships the public half to the
//! Receiver in a single message:
//! ```text
//! [pk_size: u64][gk_size: u64][pk_bytes || gk_bytes]
//! ```
//! The Generator keeps the secret key (as a Decryptor); the Receiver gets an
//! Encryptor, the Galois keys and a fresh encryption of zero. Both sides must
//! use the same [`SessionConfig`].

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bfv::{
    BatchEncoder, Ciphertext, CryptoContext, Decryptor, Encryptor, Evaluator, GaloisKeys,
    KeyGenerator, PublicKey, SecretKey,
};
use crate::error::{violation, HeError, Result};
use crate::net::{checked_len, recv_blob, send_blob, Channel};
use crate::params::{HeParams, DEFAULT_RING_DIM};

/// Party id of the listening side
pub const ALICE: u8 = 1;
/// Party id of the connecting side
pub const BOB: u8 = 2;

/// Which half of the key exchange a party runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Generates the key pair and Galois keys; keeps the secret key
    Generator,
    /// Receives the public key and Galois keys; never sees the secret key
    Receiver,
}

impl Role {
    /// ALICE receives, BOB generates
    pub fn from_party(party: u8) -> Result<Self> {
        match party {
            ALICE => Ok(Role::Receiver),
            BOB => Ok(Role::Generator),
            other => Err(violation!("unknown party {}, expected 1 (ALICE) or 2 (BOB)", other)),
        }
    }

    pub fn party(&self) -> u8 {
        match self {
            Role::Receiver => ALICE,
            Role::Generator => BOB,
        }
    }
}

/// Session parameters shared by both parties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub ring_dim: usize,
    /// Log the key-generation summary at info level
    pub verbose: bool,
    insecure_debug: bool,
}

impl SessionConfig {
    pub fn new(ring_dim: usize) -> Self {
        Self {
            ring_dim,
            verbose: false,
            insecure_debug: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Make the Generator send its secret key in the clear so the Receiver can
    /// decrypt. Only available in test builds or with the `insecure-debug`
    /// feature.
    pub fn with_insecure_debug(mut self) -> Result<Self> {
        check_insecure_debug_allowed()?;
        self.insecure_debug = true;
        Ok(self)
    }

    pub fn insecure_debug(&self) -> bool {
        self.insecure_debug
    }

    /// Scheme parameters for this session
    pub fn params(&self) -> HeParams {
        HeParams::session(self.ring_dim)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RING_DIM)
    }
}

fn check_insecure_debug_allowed() -> Result<()> {
    if cfg!(any(test, feature = "insecure-debug")) {
        Ok(())
    } else {
        Err(violation!(
            "insecure debug mode leaks the secret key and is disabled in this build"
        ))
    }
}

enum RoleMaterial {
    Generator {
        decryptor: Decryptor,
    },
    Receiver {
        galois_keys: GaloisKeys,
        zero: Ciphertext,
        /// Only set in insecure debug mode
        decryptor: Option<Decryptor>,
    },
}

/// Per-party session state returned by [`bootstrap`]
pub struct SessionHandles {
    role: Role,
    context: Arc<CryptoContext>,
    encoder: Option<BatchEncoder>,
    evaluator: Option<Evaluator>,
    encryptor: Option<Encryptor>,
    material: Option<RoleMaterial>,
}

impl SessionHandles {
    pub fn role(&self) -> Role {
        self.role
    }

    /// Shared scheme context; stays valid after teardown
    pub fn context(&self) -> &Arc<CryptoContext> {
        &self.context
    }

    pub fn slot_count(&self) -> usize {
        self.context.slot_count()
    }

    pub fn encoder(&self) -> Result<&BatchEncoder> {
        self.encoder.as_ref().ok_or(HeError::MissingHandle("encoder"))
    }

    pub fn evaluator(&self) -> Result<&Evaluator> {
        self.evaluator
            .as_ref()
            .ok_or(HeError::MissingHandle("evaluator"))
    }

    pub fn encryptor(&self) -> Result<&Encryptor> {
        self.encryptor
            .as_ref()
            .ok_or(HeError::MissingHandle("encryptor"))
    }

    /// Generator always; Receiver only in insecure debug mode
    pub fn decryptor(&self) -> Result<&Decryptor> {
        match &self.material {
            Some(RoleMaterial::Generator { decryptor }) => Ok(decryptor),
            Some(RoleMaterial::Receiver {
                decryptor: Some(decryptor),
                ..
            }) => Ok(decryptor),
            _ => Err(HeError::MissingHandle("decryptor")),
        }
    }

    /// Receiver only
    pub fn galois_keys(&self) -> Result<&GaloisKeys> {
        match &self.material {
            Some(RoleMaterial::Receiver { galois_keys, .. }) => Ok(galois_keys),
            _ => Err(HeError::MissingHandle("galois keys")),
        }
    }

    /// Receiver only
    pub fn zero_ciphertext(&self) -> Result<&Ciphertext> {
        match &self.material {
            Some(RoleMaterial::Receiver { zero, .. }) => Ok(zero),
            _ => Err(HeError::MissingHandle("zero ciphertext")),
        }
    }

    pub fn is_released(&self) -> bool {
        self.encoder.is_none()
            && self.evaluator.is_none()
            && self.encryptor.is_none()
            && self.material.is_none()
    }

    /// Release encoder, evaluator, encryptor, then the role material.
    /// Calling it again is a no-op.
    pub fn teardown(&mut self) {
        if self.is_released() {
            return;
        }
        drop(self.encoder.take());
        drop(self.evaluator.take());
        drop(self.encryptor.take());
        match self.material.take() {
            Some(RoleMaterial::Generator { decryptor }) => drop(decryptor),
            Some(RoleMaterial::Receiver {
                decryptor,
                galois_keys,
                zero,
            }) => {
                drop(decryptor);
                drop(galois_keys);
                drop(zero);
            }
            None => {}
        }
        debug!(role = ?self.role, "Session released");
    }
}

impl Drop for SessionHandles {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Release a session's handles; idempotent
pub fn teardown_session(handles: &mut SessionHandles) {
    handles.teardown();
}

/// Run the key-exchange handshake for `role` over `channel`.
///
/// Blocks until the whole key message has been sent or received. Any short
/// read, oversized length field or undecodable key is fatal.
pub fn bootstrap<C: Channel + ?Sized>(
    role: Role,
    channel: &mut C,
    config: &SessionConfig,
) -> Result<SessionHandles> {
    if config.insecure_debug {
        check_insecure_debug_allowed()?;
    }

    let start = Instant::now();
    let context = CryptoContext::new(config.params())?;
    let encoder = BatchEncoder::new(context.clone());
    let evaluator = Evaluator::new(context.clone());

    let (encryptor, material) = match role {
        Role::Generator => generate_and_send(&context, channel, config)?,
        Role::Receiver => receive_keys(&context, &encoder, channel, config)?,
    };
    channel.flush()?;

    if config.verbose {
        info!("Keys Generated (slot_count: {})", context.slot_count());
    } else {
        debug!("Keys Generated (slot_count: {})", context.slot_count());
    }
    debug!(
        role = ?role,
        elapsed = ?start.elapsed(),
        bytes_sent = channel.counter(),
        "Bootstrap complete"
    );

    Ok(SessionHandles {
        role,
        context,
        encoder: Some(encoder),
        evaluator: Some(evaluator),
        encryptor: Some(encryptor),
        material: Some(material),
    })
}

fn generate_and_send<C: Channel + ?Sized>(
    ctx: &Arc<CryptoContext>,
    channel: &mut C,
    config: &SessionConfig,
) -> Result<(Encryptor, RoleMaterial)> {
    let keygen = KeyGenerator::new(ctx.clone());
    let pk_bytes = keygen.create_public_key().save()?;
    let gk_bytes = keygen.create_galois_keys().save()?;
    debug!(
        pk_size = pk_bytes.len(),
        gk_size = gk_bytes.len(),
        "Sending public key and Galois keys"
    );

    channel.send_u64(pk_bytes.len() as u64)?;
    channel.send_u64(gk_bytes.len() as u64)?;
    channel.send_data(&pk_bytes)?;
    channel.send_data(&gk_bytes)?;

    // Same decode path the Receiver uses
    let public_key = PublicKey::load(ctx, &pk_bytes)?;
    let encryptor = Encryptor::new(ctx.clone(), public_key);
    let decryptor = Decryptor::new(ctx.clone(), keygen.secret_key().clone());

    if config.insecure_debug {
        warn!("Insecure debug mode: sending secret key in the clear");
        send_blob(channel, &keygen.secret_key().save()?)?;
    }

    Ok((encryptor, RoleMaterial::Generator { decryptor }))
}

fn receive_keys<C: Channel + ?Sized>(
    ctx: &Arc<CryptoContext>,
    encoder: &BatchEncoder,
    channel: &mut C,
    config: &SessionConfig,
) -> Result<(Encryptor, RoleMaterial)> {
    let pk_size = checked_len(channel.recv_u64()?)?;
    let gk_size = checked_len(channel.recv_u64()?)?;
    debug!(pk_size, gk_size, "Receiving public key and Galois keys");

    let mut keys = vec![0u8; pk_size + gk_size];
    channel.recv_data(&mut keys)?;
    let (pk_bytes, gk_bytes) = keys.split_at(pk_size);

    let public_key = PublicKey::load(ctx, pk_bytes)?;
    let galois_keys = GaloisKeys::load(ctx, gk_bytes)?;
    let encryptor = Encryptor::new(ctx.clone(), public_key);

    let zero_slots = vec![0u64; encoder.slot_count()];
    let zero = encryptor.encrypt(&encoder.encode(&zero_slots)?)?;

    let decryptor = if config.insecure_debug {
        warn!("Insecure debug mode: receiving secret key in the clear");
        let secret_key = SecretKey::load(ctx, &recv_blob(channel)?)?;
        Some(Decryptor::new(ctx.clone(), secret_key))
    } else {
        None
    };

    Ok((
        encryptor,
        RoleMaterial::Receiver {
            galois_keys,
            zero,
            decryptor,
        },
    ))
}
