//! Length-prefixed framing of ciphertexts over a [`Channel`].
//!
//! ```text
//! single ciphertext:  [len: u64][bincode bytes]
//! ciphertext vector:  [count: u32] then `count` single-ciphertext frames
//! ```
//! Received ciphertexts are decoded with [`Ciphertext::load_unchecked`]: the
//! peer is semi-honest, so only the shape is bound to the local context.

use tracing::trace;

use super::channel::Channel;
use crate::bfv::{Ciphertext, CryptoContext};
use crate::error::{malformed, violation, Result};

/// Largest length field accepted before allocating a receive buffer
pub const MAX_WIRE_MESSAGE: u64 = 1 << 30;

/// Send `[len: u64][bytes]`
pub fn send_blob<C: Channel + ?Sized>(channel: &mut C, bytes: &[u8]) -> Result<()> {
    channel.send_u64(bytes.len() as u64)?;
    channel.send_data(bytes)
}

/// Receive one `[len: u64][bytes]` frame
pub fn recv_blob<C: Channel + ?Sized>(channel: &mut C) -> Result<Vec<u8>> {
    let len = checked_len(channel.recv_u64()?)?;
    let mut bytes = vec![0u8; len];
    channel.recv_data(&mut bytes)?;
    Ok(bytes)
}

/// Validate a received length field and convert it to a buffer size
pub(crate) fn checked_len(len: u64) -> Result<usize> {
    if len > MAX_WIRE_MESSAGE {
        return Err(malformed!(
            "length field {} exceeds the {} byte message limit",
            len,
            MAX_WIRE_MESSAGE
        ));
    }
    usize::try_from(len).map_err(|_| malformed!("length field {} does not fit in memory", len))
}

pub fn send_ciphertext<C: Channel + ?Sized>(channel: &mut C, ct: &Ciphertext) -> Result<()> {
    let bytes = ct.save()?;
    trace!(bytes = bytes.len(), "send ciphertext");
    send_blob(channel, &bytes)
}

pub fn recv_ciphertext<C: Channel + ?Sized>(
    channel: &mut C,
    ctx: &CryptoContext,
) -> Result<Ciphertext> {
    let bytes = recv_blob(channel)?;
    trace!(bytes = bytes.len(), "recv ciphertext");
    Ciphertext::load_unchecked(ctx, &bytes)
}

/// Send a non-empty sequence of ciphertexts
pub fn send_encrypted_vector<C: Channel + ?Sized>(
    channel: &mut C,
    cts: &[Ciphertext],
) -> Result<()> {
    if cts.is_empty() {
        return Err(violation!("cannot send an empty ciphertext vector"));
    }
    let count = u32::try_from(cts.len())
        .map_err(|_| violation!("{} ciphertexts exceed the u32 count field", cts.len()))?;

    channel.send_u32(count)?;
    for ct in cts {
        send_ciphertext(channel, ct)?;
    }
    Ok(())
}

/// Receive a ciphertext sequence, preserving order
pub fn recv_encrypted_vector<C: Channel + ?Sized>(
    channel: &mut C,
    ctx: &CryptoContext,
) -> Result<Vec<Ciphertext>> {
    let count = channel.recv_u32()?;
    if count == 0 {
        return Err(violation!("peer announced an empty ciphertext vector"));
    }
    (0..count).map(|_| recv_ciphertext(channel, ctx)).collect()
}
