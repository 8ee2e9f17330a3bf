//! rustle - Noise Protocol Framework core.
//!
//! This crate provides the Noise handshake state machines and the
//! post-handshake secure transport:
//! - `crypto`: pluggable AEAD / DH / hash capabilities
//! - `pattern`: the declarative handshake-pattern registry
//! - handshake and transport state machines with scatter-gather I/O
//!
//! # Example
//!
//! ```rust,ignore
//! use rustle::{Blake2s, ChaChaPoly, Config, HandshakeState, KeyPair, Pattern};
//!
//! // Generate key pairs
//! let initiator_static = KeyPair::generate();
//! let responder_static = KeyPair::generate();
//!
//! // Create handshake (IK pattern)
//! let mut initiator = HandshakeState::<KeyPair, ChaChaPoly, Blake2s>::new(Config {
//!     pattern: Some(Pattern::IK),
//!     initiator: true,
//!     local_static: Some(initiator_static),
//!     remote_static: Some(responder_static.public.as_bytes().to_vec()),
//!     ..Default::default()
//! }).unwrap();
//!
//! // ... exchange messages with the responder, then:
//! // let transport = initiator.into_transport().unwrap();
//! ```

pub mod buffer;
mod cipher_state;
pub mod crypto;
mod error;
mod handshake;
mod pattern;
mod symmetric_state;
mod transport;

pub use cipher_state::CipherState;
pub use crypto::{
    AesGcm, Blake2b, Blake2s, ChaChaPoly, Cipher, Dh, Hash, KeyPair, Psk, PublicKey, Sha256,
    Sha512, KEY_LEN, MAX_DH_LEN, MAX_HASH_LEN, PSK_LEN, TAG_LEN,
};
pub use error::Error;
pub use handshake::{Config, HandshakeState, MAX_MESSAGE_LEN};
pub use pattern::{Modifiers, Pattern, Token};
pub use symmetric_state::SymmetricState;
pub use transport::Transport;
