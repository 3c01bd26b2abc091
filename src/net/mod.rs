//! Two-party transport: the byte channel and the ciphertext wire codec

mod channel;
mod codec;

pub use channel::{Channel, NetIo};
pub use codec::{
    recv_blob, recv_ciphertext, recv_encrypted_vector, send_blob, send_ciphertext,
    send_encrypted_vector, MAX_WIRE_MESSAGE,
};

pub(crate) use codec::checked_len;
