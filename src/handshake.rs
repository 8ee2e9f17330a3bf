//! The handshake state machine: interprets message patterns token by
//! token, producing and consuming wire bytes until the pattern queue
//! empties and the state splits into a transport.

use zeroize::Zeroize;

use crate::buffer::{self, Cursor};
use crate::crypto::{Cipher, Dh, Hash, Psk, MAX_DH_LEN, MAX_HASH_LEN, TAG_LEN};
use crate::error::Error;
use crate::pattern::{Modifiers, Pattern, Token, XX_FALLBACK_MESSAGES};
use crate::symmetric_state::SymmetricState;
use crate::transport::Transport;

/// Default maximum Noise message length.
pub const MAX_MESSAGE_LEN: usize = 65535;

/// Handshake configuration.
pub struct Config<D: Dh> {
    /// Handshake pattern.
    pub pattern: Option<Pattern>,
    /// Pattern modifiers. The fallback modifier is only valid through
    /// [`HandshakeState::fallback`].
    pub modifiers: Modifiers,
    /// True if this side initiates.
    pub initiator: bool,
    /// Local static key pair.
    pub local_static: Option<D>,
    /// Remote static public key.
    pub remote_static: Option<Vec<u8>>,
    /// Optional prologue.
    pub prologue: Vec<u8>,
    /// Pre-shared keys, consumed in modifier order.
    pub psks: Vec<Psk>,
    /// Upper bound for a single handshake or transport message.
    pub max_message_len: usize,
}

impl<D: Dh> Default for Config<D> {
    fn default() -> Self {
        Self {
            pattern: None,
            modifiers: Modifiers::NONE,
            initiator: false,
            local_static: None,
            remote_static: None,
            prologue: Vec::new(),
            psks: Vec::new(),
            max_message_len: MAX_MESSAGE_LEN,
        }
    }
}

fn protocol_name<D: Dh, C: Cipher, H: Hash>(pattern: Pattern, modifiers: Modifiers) -> String {
    format!(
        "Noise_{}{}_{}_{}_{}",
        pattern.name(),
        modifiers.name_suffix(),
        D::NAME,
        C::NAME,
        H::NAME
    )
}

/// Manages the state of a Noise handshake.
pub struct HandshakeState<D: Dh, C: Cipher, H: Hash> {
    symmetric: SymmetricState<C, H>,
    /// Original role; fixed for the lifetime of the session.
    role_initiator: bool,
    /// Perceived role, swapped by fallback. Drives DH orientation, turn
    /// order, and split assignment.
    initiator: bool,
    turn_to_write: bool,
    s: Option<D>,
    e: Option<D>,
    rs: Option<[u8; MAX_DH_LEN]>,
    re: Option<[u8; MAX_DH_LEN]>,
    messages: Vec<Vec<Token>>,
    msg_index: usize,
    psks: Vec<Psk>,
    has_psk: bool,
    one_way: bool,
    max_message_len: usize,
    dead: bool,
    queued_ephemerals: Vec<D>,
}

impl<D: Dh, C: Cipher, H: Hash> HandshakeState<D, C, H> {
    /// Creates a new handshake state.
    pub fn new(config: Config<D>) -> Result<Self, Error> {
        let pattern = config.pattern.ok_or(Error::MissingPattern)?;
        if config.modifiers.has_fallback() {
            return Err(Error::ForbiddenModifier);
        }
        Self::validate_keys(&config, pattern)?;
        if config.psks.len() != config.modifiers.psk_count() {
            return Err(Error::PskCountMismatch);
        }
        let messages = pattern.build_message_patterns(config.modifiers)?;

        let name = protocol_name::<D, C, H>(pattern, config.modifiers);
        let mut symmetric = SymmetricState::<C, H>::new(&name);
        symmetric.mix_hash(&config.prologue);

        let rs = config.remote_static.as_deref().map(remote_key);

        // Pre-messages: the initiator's statics first, then the
        // responder's. A side mixes its own public key for its own list
        // and the known remote static for the peer's.
        for token in pattern.initiator_pre_message() {
            if *token == Token::S {
                if config.initiator {
                    let s = config
                        .local_static
                        .as_ref()
                        .ok_or(Error::MissingLocalStatic)?;
                    symmetric.mix_hash(s.public());
                } else {
                    let rs = rs.as_ref().ok_or(Error::MissingRemoteStatic)?;
                    symmetric.mix_hash(&rs[..D::DH_LEN]);
                }
            }
        }
        for token in pattern.responder_pre_message() {
            if *token == Token::S {
                if config.initiator {
                    let rs = rs.as_ref().ok_or(Error::MissingRemoteStatic)?;
                    symmetric.mix_hash(&rs[..D::DH_LEN]);
                } else {
                    let s = config
                        .local_static
                        .as_ref()
                        .ok_or(Error::MissingLocalStatic)?;
                    symmetric.mix_hash(s.public());
                }
            }
        }

        let one_way = messages.len() == 1;
        Ok(Self {
            symmetric,
            role_initiator: config.initiator,
            initiator: config.initiator,
            turn_to_write: config.initiator,
            s: config.local_static,
            e: None,
            rs,
            re: None,
            messages,
            msg_index: 0,
            has_psk: config.modifiers.psk_count() > 0,
            psks: config.psks,
            one_way,
            max_message_len: config.max_message_len,
            dead: false,
            queued_ephemerals: Vec::new(),
        })
    }

    fn validate_keys(config: &Config<D>, pattern: Pattern) -> Result<(), Error> {
        let requires_local = pattern.requires_local_static(config.initiator);
        match (&config.local_static, requires_local) {
            (None, true) => return Err(Error::MissingLocalStatic),
            (Some(_), false) => return Err(Error::UnexpectedKey),
            _ => {}
        }

        let requires_remote = pattern.requires_remote_static(config.initiator);
        match (&config.remote_static, requires_remote) {
            (None, true) => return Err(Error::MissingRemoteStatic),
            (Some(_), false) => return Err(Error::UnexpectedKey),
            (Some(rs), true) if rs.len() != D::DH_LEN => return Err(Error::InvalidKeyLength),
            _ => {}
        }
        Ok(())
    }

    /// Returns true once every message pattern has been processed.
    pub fn is_finished(&self) -> bool {
        self.msg_index >= self.messages.len()
    }

    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    /// The perceived initiator role (swapped by fallback).
    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    /// Returns the current transcript hash. After the final message this
    /// is the handshake hash used for channel binding.
    pub fn handshake_hash(&self) -> &[u8] {
        self.symmetric.handshake_hash()
    }

    /// Returns the remote static public key, once known.
    pub fn remote_static(&self) -> Option<&[u8]> {
        self.rs.as_ref().map(|rs| &rs[..D::DH_LEN])
    }

    /// Returns the local ephemeral public key, once generated.
    pub fn local_ephemeral(&self) -> Option<&[u8]> {
        self.e.as_ref().map(|e| e.public())
    }

    /// Queues a fixed keypair for the next `e` token instead of a fresh
    /// one. Crate-internal test hook.
    pub(crate) fn push_ephemeral(&mut self, keypair: D) {
        self.queued_ephemerals.push(keypair);
    }

    /// Generates the next handshake message from a contiguous payload.
    /// Returns the number of bytes written to `message`.
    pub fn write_message(&mut self, payload: &[u8], message: &mut [u8]) -> Result<usize, Error> {
        self.write_message_vectored(&[payload], message)
    }

    /// Generates the next handshake message from a segmented payload.
    pub fn write_message_vectored(
        &mut self,
        payload: &[&[u8]],
        message: &mut [u8],
    ) -> Result<usize, Error> {
        if self.dead {
            return Err(Error::Failed);
        }
        if self.is_finished() {
            return Err(Error::Finished);
        }
        if !self.turn_to_write {
            return Err(Error::NotOurTurn);
        }

        let tokens = self.messages[self.msg_index].clone();
        let (token_len, keyed_payload) = self.token_overhead(&tokens);
        let payload_len = buffer::total_len(payload);
        let total = token_len + payload_len + if keyed_payload { TAG_LEN } else { 0 };
        if total > self.max_message_len {
            return Err(Error::MessageTooLong);
        }
        if message.len() < total {
            return Err(Error::BufferTooSmall);
        }

        match self.write_tokens(&tokens, payload, message) {
            Ok(written) => {
                debug_assert_eq!(written, total);
                self.msg_index += 1;
                self.turn_to_write = false;
                Ok(written)
            }
            Err(e) => {
                self.dead = true;
                Err(e)
            }
        }
    }

    fn write_tokens(
        &mut self,
        tokens: &[Token],
        payload: &[&[u8]],
        message: &mut [u8],
    ) -> Result<usize, Error> {
        let mut head = 0;
        for token in tokens {
            match token {
                Token::E => {
                    let e = if self.queued_ephemerals.is_empty() {
                        D::generate()
                    } else {
                        self.queued_ephemerals.remove(0)
                    };
                    message[head..head + D::DH_LEN].copy_from_slice(e.public());
                    head += D::DH_LEN;
                    self.symmetric.mix_hash(e.public());
                    if self.has_psk {
                        self.symmetric.mix_key(e.public());
                    }
                    self.e = Some(e);
                }
                Token::S => {
                    let s = self.s.as_ref().ok_or(Error::MissingLocalStatic)?;
                    head += self
                        .symmetric
                        .encrypt_and_hash(&[s.public()], &mut message[head..])?;
                }
                Token::EE => self.mix_dh(true, true)?,
                Token::ES => {
                    let initiator = self.initiator;
                    self.mix_dh(initiator, !initiator)?;
                }
                Token::SE => {
                    let initiator = self.initiator;
                    self.mix_dh(!initiator, initiator)?;
                }
                Token::SS => self.mix_dh(false, false)?,
                Token::Psk => self.mix_psk()?,
            }
        }
        head += self
            .symmetric
            .encrypt_and_hash(payload, &mut message[head..])?;
        Ok(head)
    }

    /// Processes a received handshake message, contiguous form. Returns
    /// the payload length written to `payload`.
    pub fn read_message(&mut self, message: &[u8], payload: &mut [u8]) -> Result<usize, Error> {
        self.read_message_vectored(&[message], payload)
    }

    /// Processes a received handshake message presented as an ordered
    /// segment list. `payload` doubles as the decryption staging area and
    /// must hold the encrypted payload (plaintext plus tag).
    pub fn read_message_vectored(
        &mut self,
        message: &[&[u8]],
        payload: &mut [u8],
    ) -> Result<usize, Error> {
        if self.dead {
            return Err(Error::Failed);
        }
        if self.is_finished() {
            return Err(Error::Finished);
        }
        if self.turn_to_write {
            return Err(Error::NotOurTurn);
        }

        let tokens = self.messages[self.msg_index].clone();
        let message_len = buffer::total_len(message);
        if message_len > self.max_message_len {
            return Err(Error::MessageTooLong);
        }
        let (token_len, keyed_payload) = self.token_overhead(&tokens);
        let overhead = token_len + if keyed_payload { TAG_LEN } else { 0 };
        if message_len < overhead {
            return Err(Error::InvalidMessage);
        }
        if payload.len() < message_len - token_len {
            return Err(Error::BufferTooSmall);
        }

        let mut cursor = Cursor::new(message);
        match self.read_tokens(&tokens, &mut cursor, payload) {
            Ok(read) => {
                self.msg_index += 1;
                self.turn_to_write = true;
                Ok(read)
            }
            Err(e) => {
                self.dead = true;
                Err(e)
            }
        }
    }

    fn read_tokens(
        &mut self,
        tokens: &[Token],
        cursor: &mut Cursor<'_>,
        payload: &mut [u8],
    ) -> Result<usize, Error> {
        for token in tokens {
            match token {
                Token::E => {
                    let mut re = [0u8; MAX_DH_LEN];
                    cursor.copy_exact(&mut re[..D::DH_LEN])?;
                    self.symmetric.mix_hash(&re[..D::DH_LEN]);
                    if self.has_psk {
                        self.symmetric.mix_key(&re[..D::DH_LEN]);
                    }
                    self.re = Some(re);
                }
                Token::S => {
                    let ciphertext_len =
                        D::DH_LEN + if self.symmetric.has_key() { TAG_LEN } else { 0 };
                    let mut buf = [0u8; MAX_DH_LEN + TAG_LEN];
                    cursor.copy_exact(&mut buf[..ciphertext_len])?;
                    let n = self.symmetric.decrypt_and_hash(&mut buf[..ciphertext_len])?;
                    if n != D::DH_LEN {
                        return Err(Error::InvalidMessage);
                    }
                    let mut rs = [0u8; MAX_DH_LEN];
                    rs[..D::DH_LEN].copy_from_slice(&buf[..D::DH_LEN]);
                    self.rs = Some(rs);
                }
                Token::EE => self.mix_dh(true, true)?,
                Token::ES => {
                    let initiator = self.initiator;
                    self.mix_dh(initiator, !initiator)?;
                }
                Token::SE => {
                    let initiator = self.initiator;
                    self.mix_dh(!initiator, initiator)?;
                }
                Token::SS => self.mix_dh(false, false)?,
                Token::Psk => self.mix_psk()?,
            }
        }

        let ciphertext_len = cursor.copy_remaining(payload);
        self.symmetric
            .decrypt_and_hash(&mut payload[..ciphertext_len])
    }

    /// Mixes the DH named by a token. `local_ephemeral` selects our e
    /// over our s; `remote_ephemeral` selects re over rs.
    fn mix_dh(&mut self, local_ephemeral: bool, remote_ephemeral: bool) -> Result<(), Error> {
        let local = if local_ephemeral {
            self.e.as_ref().ok_or(Error::InvalidMessage)?
        } else {
            self.s.as_ref().ok_or(Error::MissingLocalStatic)?
        };
        let remote = if remote_ephemeral {
            self.re.ok_or(Error::InvalidMessage)?
        } else {
            self.rs.ok_or(Error::MissingRemoteStatic)?
        };

        let mut shared = [0u8; MAX_DH_LEN];
        local.dh(&remote[..D::DH_LEN], &mut shared)?;
        self.symmetric.mix_key(&shared[..D::DH_LEN]);
        shared.zeroize();
        Ok(())
    }

    fn mix_psk(&mut self) -> Result<(), Error> {
        if self.psks.is_empty() {
            return Err(Error::PskCountMismatch);
        }
        let psk = self.psks.remove(0);
        self.symmetric.mix_key_and_hash(psk.as_bytes());
        Ok(())
    }

    /// Wire bytes the next message's tokens occupy, and whether the
    /// trailing payload will be encrypted. Deterministic given the token
    /// list and the current has-key state.
    fn token_overhead(&self, tokens: &[Token]) -> (usize, bool) {
        let mut has_key = self.symmetric.has_key();
        let mut len = 0;
        for token in tokens {
            match token {
                Token::E => {
                    len += D::DH_LEN;
                    if self.has_psk {
                        has_key = true;
                    }
                }
                Token::S => {
                    len += D::DH_LEN + if has_key { TAG_LEN } else { 0 };
                }
                Token::EE | Token::ES | Token::SE | Token::SS | Token::Psk => {
                    has_key = true;
                }
            }
        }
        (len, has_key)
    }

    /// Splits the completed handshake into a transport.
    pub fn into_transport(self) -> Result<Transport<C>, Error> {
        if self.dead {
            return Err(Error::Failed);
        }
        if !self.is_finished() {
            return Err(Error::NotReady);
        }
        let (c1, c2) = self.symmetric.split();
        let mut hash = [0u8; MAX_HASH_LEN];
        hash[..H::HASH_LEN].copy_from_slice(self.symmetric.handshake_hash());
        Ok(Transport::new(
            self.initiator,
            self.one_way,
            c1,
            c2,
            hash,
            H::HASH_LEN,
            self.max_message_len,
        ))
    }

    /// Re-enters the handshake as XXfallback after a failed initial
    /// exchange (Noise Pipes). Valid when the new protocol is XX with the
    /// fallback modifier, exactly one message has gone over the wire, and
    /// this side holds the ephemeral that message carried: the original
    /// initiator retains its `e`, the original responder its `re`. The
    /// perceived roles swap; the local static is taken fresh from
    /// `config`; PSKs are not permitted.
    pub fn fallback(self, config: Config<D>) -> Result<Self, Error> {
        let pattern = config.pattern.ok_or(Error::MissingPattern)?;
        if pattern != Pattern::XX || !config.modifiers.has_fallback() {
            return Err(Error::InvalidFallback);
        }
        if config.modifiers.psk_count() > 0 || !config.psks.is_empty() {
            return Err(Error::InvalidFallback);
        }
        if self.is_finished() {
            return Err(Error::Finished);
        }
        if self.role_initiator {
            if self.msg_index != 1 || self.e.is_none() {
                return Err(Error::InvalidFallback);
            }
        } else if self.msg_index > 1 || self.re.is_none() {
            return Err(Error::InvalidFallback);
        }
        let s = config.local_static.ok_or(Error::MissingLocalStatic)?;

        let name = protocol_name::<D, C, H>(pattern, config.modifiers);
        let mut symmetric = SymmetricState::<C, H>::new(&name);
        symmetric.mix_hash(&config.prologue);

        // The ephemeral from the failed first message becomes the new
        // responder's pre-message.
        let (e, re) = if self.role_initiator {
            let e = self.e;
            symmetric.mix_hash(e.as_ref().ok_or(Error::InvalidFallback)?.public());
            (e, None)
        } else {
            let re = self.re;
            symmetric.mix_hash(&re.ok_or(Error::InvalidFallback)?[..D::DH_LEN]);
            (None, re)
        };

        // The original responder now plays initiator; residual PSKs of
        // the abandoned state are zeroed on drop.
        let initiator = !self.role_initiator;
        Ok(Self {
            symmetric,
            role_initiator: self.role_initiator,
            initiator,
            turn_to_write: initiator,
            s: Some(s),
            e,
            rs: None,
            re,
            messages: XX_FALLBACK_MESSAGES.iter().map(|m| m.to_vec()).collect(),
            msg_index: 0,
            psks: Vec::new(),
            has_psk: false,
            one_way: false,
            max_message_len: config.max_message_len,
            dead: false,
            queued_ephemerals: self.queued_ephemerals,
        })
    }
}

fn remote_key(bytes: &[u8]) -> [u8; MAX_DH_LEN] {
    let mut key = [0u8; MAX_DH_LEN];
    key[..bytes.len()].copy_from_slice(bytes);
    key
}
