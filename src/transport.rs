//! Post-handshake transport: two cipher states carrying the two
//! directions of an established session.

use zeroize::Zeroize;

use crate::buffer;
use crate::cipher_state::CipherState;
use crate::crypto::{Cipher, MAX_HASH_LEN, TAG_LEN};
use crate::error::Error;

/// An established Noise session.
///
/// Produced by [`HandshakeState::into_transport`]; bidirectional unless
/// the pattern was one-way, in which case only the initiator may write
/// and only the responder may read.
///
/// [`HandshakeState::into_transport`]: crate::HandshakeState::into_transport
pub struct Transport<C: Cipher> {
    send: Option<CipherState<C>>,
    recv: Option<CipherState<C>>,
    initiator: bool,
    one_way: bool,
    hash: [u8; MAX_HASH_LEN],
    hash_len: usize,
    max_message_len: usize,
}

impl<C: Cipher> Transport<C> {
    pub(crate) fn new(
        initiator: bool,
        one_way: bool,
        c1: CipherState<C>,
        c2: CipherState<C>,
        hash: [u8; MAX_HASH_LEN],
        hash_len: usize,
        max_message_len: usize,
    ) -> Self {
        let (send, recv) = if one_way {
            if initiator {
                (Some(c1), None)
            } else {
                (None, Some(c1))
            }
        } else if initiator {
            (Some(c1), Some(c2))
        } else {
            (Some(c2), Some(c1))
        };
        Self {
            send,
            recv,
            initiator,
            one_way,
            hash,
            hash_len,
            max_message_len,
        }
    }

    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    /// The final transcript hash, for channel binding.
    pub fn handshake_hash(&self) -> &[u8] {
        &self.hash[..self.hash_len]
    }

    /// Current send counter, if this direction exists.
    pub fn send_nonce(&self) -> Option<u64> {
        self.send.as_ref().map(|c| c.nonce())
    }

    /// Current receive counter, if this direction exists.
    pub fn recv_nonce(&self) -> Option<u64> {
        self.recv.as_ref().map(|c| c.nonce())
    }

    /// Encrypts a message in order. Returns the bytes written.
    pub fn write(&mut self, payload: &[u8], message: &mut [u8]) -> Result<usize, Error> {
        self.write_vectored(&[payload], message)
    }

    /// Segmented in-order write.
    pub fn write_vectored(&mut self, payload: &[&[u8]], message: &mut [u8]) -> Result<usize, Error> {
        let (written, _) = self.write_vectored_numbered(payload, message)?;
        Ok(written)
    }

    /// In-order write that also reports the nonce it used, for callers
    /// that ship the nonce explicitly and deliver out of order.
    pub fn write_numbered(
        &mut self,
        payload: &[u8],
        message: &mut [u8],
    ) -> Result<(usize, u64), Error> {
        self.write_vectored_numbered(&[payload], message)
    }

    /// Segmented variant of [`write_numbered`](Self::write_numbered).
    pub fn write_vectored_numbered(
        &mut self,
        payload: &[&[u8]],
        message: &mut [u8],
    ) -> Result<(usize, u64), Error> {
        let send = self.send.as_mut().ok_or(Error::DirectionNotAllowed)?;
        let payload_len = buffer::total_len(payload);
        if payload_len + TAG_LEN > self.max_message_len {
            return Err(Error::MessageTooLong);
        }
        if message.len() < payload_len + TAG_LEN {
            return Err(Error::BufferTooSmall);
        }

        buffer::copy_into(payload, &mut message[..payload_len]);
        let nonce = send.nonce();
        let written = send.encrypt_in_place(&[], message, payload_len)?;
        Ok((written, nonce))
    }

    /// Decrypts a message in order. Returns the payload length.
    /// `payload` doubles as the staging area and must hold the full
    /// ciphertext.
    pub fn read(&mut self, message: &[u8], payload: &mut [u8]) -> Result<usize, Error> {
        self.read_vectored(&[message], payload)
    }

    /// Segmented in-order read.
    pub fn read_vectored(&mut self, message: &[&[u8]], payload: &mut [u8]) -> Result<usize, Error> {
        let recv = self.recv.as_mut().ok_or(Error::DirectionNotAllowed)?;
        let message_len = buffer::total_len(message);
        Self::check_read(message_len, payload.len(), self.max_message_len)?;

        let mut cursor = buffer::Cursor::new(message);
        cursor.copy_remaining(payload);
        recv.decrypt_in_place(&[], &mut payload[..message_len])
    }

    /// Decrypts a message under a caller-supplied nonce without touching
    /// the receive counter. The caller owns the replay window: nothing
    /// here remembers which nonces were already accepted.
    pub fn read_numbered(
        &mut self,
        nonce: u64,
        message: &[u8],
        payload: &mut [u8],
    ) -> Result<usize, Error> {
        self.read_vectored_numbered(nonce, &[message], payload)
    }

    /// Segmented variant of [`read_numbered`](Self::read_numbered).
    pub fn read_vectored_numbered(
        &mut self,
        nonce: u64,
        message: &[&[u8]],
        payload: &mut [u8],
    ) -> Result<usize, Error> {
        let recv = self.recv.as_ref().ok_or(Error::DirectionNotAllowed)?;
        let message_len = buffer::total_len(message);
        Self::check_read(message_len, payload.len(), self.max_message_len)?;

        let mut cursor = buffer::Cursor::new(message);
        cursor.copy_remaining(payload);
        recv.decrypt_at(nonce, &[], &mut payload[..message_len])
    }

    fn check_read(message_len: usize, payload_len: usize, max: usize) -> Result<(), Error> {
        if message_len > max {
            return Err(Error::MessageTooLong);
        }
        if message_len < TAG_LEN {
            return Err(Error::InvalidMessage);
        }
        if payload_len < message_len {
            return Err(Error::BufferTooSmall);
        }
        Ok(())
    }

    /// Rekeys the sending direction per Noise.
    pub fn rekey_outgoing(&mut self) -> Result<(), Error> {
        self.send
            .as_mut()
            .ok_or(Error::DirectionNotAllowed)?
            .rekey()
    }

    /// Rekeys the receiving direction per Noise.
    pub fn rekey_incoming(&mut self) -> Result<(), Error> {
        self.recv
            .as_mut()
            .ok_or(Error::DirectionNotAllowed)?
            .rekey()
    }
}

impl<C: Cipher> Drop for Transport<C> {
    fn drop(&mut self) {
        self.hash.zeroize();
    }
}
