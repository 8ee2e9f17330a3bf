//! Pluggable cryptographic capabilities.
//!
//! Three orthogonal axes, chosen statically per protocol instance: an
//! AEAD cipher, a Diffie-Hellman group, and a hash function. The state
//! machines are generic over these traits; the back-ends in this module
//! cover 25519, ChaChaPoly/AESGCM, and SHA256/SHA512/BLAKE2s/BLAKE2b.

mod aead;
mod hash;
pub mod hkdf;
mod x25519;

pub use aead::{AesGcm, ChaChaPoly};
pub use hash::{Blake2b, Blake2s, Sha256, Sha512};
pub use x25519::{KeyPair, PublicKey};

use zeroize::Zeroize;

use crate::error::Error;

/// AEAD key size in bytes.
pub const KEY_LEN: usize = 32;

/// AEAD tag size in bytes.
pub const TAG_LEN: usize = 16;

/// Pre-shared key size in bytes.
pub const PSK_LEN: usize = 32;

/// Largest hash output among the supported hash functions.
pub const MAX_HASH_LEN: usize = 64;

/// Largest hash block among the supported hash functions.
pub const MAX_BLOCK_LEN: usize = 128;

/// Largest public key / shared secret among the supported DH groups.
pub const MAX_DH_LEN: usize = 56;

/// An AEAD cipher keyed once and driven by a 64-bit counter nonce.
///
/// Nonce encoding is owned by the implementation: ChaCha20-Poly1305 pads
/// the counter little-endian, AES-GCM big-endian. Implementations must
/// zero their key material on drop.
pub trait Cipher: Send + 'static {
    /// Identifier used in the protocol name, e.g. `ChaChaPoly`.
    const NAME: &'static str;

    fn new(key: &[u8; KEY_LEN]) -> Self;

    /// Encrypts `data[..plaintext_len]` in place and writes the tag
    /// directly after it. `data` must hold `plaintext_len + TAG_LEN`
    /// bytes. Returns the ciphertext length.
    fn seal_in_place(&self, nonce: u64, ad: &[u8], data: &mut [u8], plaintext_len: usize)
        -> usize;

    /// Decrypts ciphertext-and-tag in place; the plaintext lands at the
    /// front of `data`. Returns the plaintext length.
    fn open_in_place(&self, nonce: u64, ad: &[u8], data: &mut [u8]) -> Result<usize, Error>;
}

/// A streaming hash function.
pub trait Hash: Default + Send + 'static {
    /// Identifier used in the protocol name, e.g. `BLAKE2s`.
    const NAME: &'static str;
    const HASH_LEN: usize;
    const BLOCK_LEN: usize;

    fn update(&mut self, data: &[u8]);

    /// Writes `HASH_LEN` bytes into the front of `out` and resets.
    fn finish(&mut self, out: &mut [u8; MAX_HASH_LEN]);

    /// Discards any absorbed input.
    fn reset(&mut self);
}

/// A Diffie-Hellman keypair. The implementing type owns both halves and
/// must zero the private half on drop.
pub trait Dh: Sized + Send + 'static {
    /// Identifier used in the protocol name, e.g. `25519`.
    const NAME: &'static str;
    const DH_LEN: usize;

    fn generate() -> Self;

    fn from_private(private: &[u8]) -> Result<Self, Error>;

    fn public(&self) -> &[u8];

    /// Writes `DH_LEN` bytes of shared secret into the front of `out`.
    fn dh(&self, peer_public: &[u8], out: &mut [u8; MAX_DH_LEN]) -> Result<(), Error>;
}

/// A 32-byte pre-shared key, zeroed on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Psk([u8; PSK_LEN]);

impl Psk {
    pub fn new(bytes: [u8; PSK_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != PSK_LEN {
            return Err(Error::InvalidKeyLength);
        }
        let mut arr = [0u8; PSK_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; PSK_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Psk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Psk(..)")
    }
}
