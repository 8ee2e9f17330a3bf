//! X25519 key pairs backing the 25519 DH capability.

use std::fmt;

use rand_core::OsRng;
use x25519_dalek::StaticSecret;

use super::{Dh, MAX_DH_LEN};
use crate::error::Error;

/// An X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", hex::encode(&self.0[..4]))
    }
}

/// An X25519 key pair.
///
/// The secret half stays inside the dalek scalar, which wipes itself on
/// drop; only the public half can be read back out.
#[derive(Clone)]
pub struct KeyPair {
    secret: StaticSecret,
    /// Public half, free to copy and display.
    pub public: PublicKey,
}

impl KeyPair {
    /// Generates a new random key pair.
    pub fn generate() -> Self {
        Self::from_secret(StaticSecret::random_from_rng(OsRng))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes());
        Self { secret, public }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl Dh for KeyPair {
    const NAME: &'static str = "25519";
    const DH_LEN: usize = 32;

    fn generate() -> Self {
        KeyPair::generate()
    }

    fn from_private(private: &[u8]) -> Result<Self, Error> {
        let scalar: [u8; 32] = private.try_into().map_err(|_| Error::InvalidKeyLength)?;
        Ok(Self::from_secret(StaticSecret::from(scalar)))
    }

    fn public(&self) -> &[u8] {
        &self.public.0
    }

    fn dh(&self, peer_public: &[u8], out: &mut [u8; MAX_DH_LEN]) -> Result<(), Error> {
        let peer: [u8; 32] = peer_public.try_into().map_err(|_| Error::InvalidKeyLength)?;
        let shared = self.secret.diffie_hellman(&x25519_dalek::PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(Error::Dh);
        }
        out[..Self::DH_LEN].copy_from_slice(shared.as_bytes());
        Ok(())
    }
}
