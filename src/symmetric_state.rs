//! SymmetricState: chaining key, transcript hash, and the inner
//! CipherState driving key derivation through a handshake.

use zeroize::Zeroize;

use crate::buffer;
use crate::cipher_state::CipherState;
use crate::crypto::hkdf::hkdf;
use crate::crypto::{Cipher, Hash, KEY_LEN, MAX_HASH_LEN};
use crate::error::Error;

/// Holds the evolving state during a Noise handshake.
///
/// `h` is a running transcript committed to every piece of material that
/// appears on the wire, in order; `ck` feeds HKDF at each mix.
pub struct SymmetricState<C: Cipher, H: Hash> {
    cipher: CipherState<C>,
    ck: [u8; MAX_HASH_LEN],
    h: [u8; MAX_HASH_LEN],
    hasher: H,
}

impl<C: Cipher, H: Hash> SymmetricState<C, H> {
    /// Initializes from the full protocol name: names up to `HASH_LEN`
    /// bytes are zero-padded, longer ones hashed.
    pub fn new(protocol_name: &str) -> Self {
        let mut h = [0u8; MAX_HASH_LEN];
        if protocol_name.len() <= H::HASH_LEN {
            h[..protocol_name.len()].copy_from_slice(protocol_name.as_bytes());
        } else {
            let mut hasher = H::default();
            hasher.update(protocol_name.as_bytes());
            hasher.finish(&mut h);
        }

        Self {
            cipher: CipherState::new(),
            ck: h,
            h,
            hasher: H::default(),
        }
    }

    pub fn has_key(&self) -> bool {
        self.cipher.has_key()
    }

    /// Mixes input key material into the chaining key and installs the
    /// derived cipher key.
    pub fn mix_key(&mut self, input_key_material: &[u8]) {
        let mut out = [[0u8; MAX_HASH_LEN]; 2];
        hkdf::<H>(&self.ck[..H::HASH_LEN], input_key_material, &mut out);
        self.ck = out[0];

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&out[1][..KEY_LEN]);
        self.cipher.initialize_key(&key);

        key.zeroize();
        out.zeroize();
    }

    /// Mixes data into the transcript hash.
    pub fn mix_hash(&mut self, data: &[u8]) {
        self.mix_hash_parts(&[data]);
    }

    /// Mixes an ordered segment list into the transcript hash without
    /// coalescing.
    pub fn mix_hash_parts(&mut self, parts: &[&[u8]]) {
        self.hasher.update(&self.h[..H::HASH_LEN]);
        for part in parts {
            self.hasher.update(part);
        }
        self.hasher.finish(&mut self.h);
    }

    /// Mixes input into chaining key, transcript, and cipher key (PSK
    /// and psk-mode ephemeral handling).
    pub fn mix_key_and_hash(&mut self, input_key_material: &[u8]) {
        let mut out = [[0u8; MAX_HASH_LEN]; 3];
        hkdf::<H>(&self.ck[..H::HASH_LEN], input_key_material, &mut out);
        self.ck = out[0];
        self.mix_hash(&out[1][..H::HASH_LEN]);

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&out[2][..KEY_LEN]);
        self.cipher.initialize_key(&key);

        key.zeroize();
        out.zeroize();
    }

    /// Returns the current transcript hash.
    pub fn handshake_hash(&self) -> &[u8] {
        &self.h[..H::HASH_LEN]
    }

    /// Encrypts the segmented plaintext into `out` with the transcript
    /// as AD, then absorbs the ciphertext. Returns the bytes written.
    /// `out` must hold the plaintext plus a tag when a key is installed.
    pub fn encrypt_and_hash(&mut self, plaintext: &[&[u8]], out: &mut [u8]) -> Result<usize, Error> {
        let plaintext_len = buffer::copy_into(plaintext, out);
        let n = self
            .cipher
            .encrypt_in_place(&self.h[..H::HASH_LEN], out, plaintext_len)?;
        let (ciphertext, _) = out.split_at(n);
        self.hasher.update(&self.h[..H::HASH_LEN]);
        self.hasher.update(ciphertext);
        self.hasher.finish(&mut self.h);
        Ok(n)
    }

    /// Decrypts ciphertext-and-tag in place with the transcript as AD and
    /// absorbs the ciphertext (the transcript commits to ciphertext, not
    /// plaintext). Returns the plaintext length.
    pub fn decrypt_and_hash(&mut self, data: &mut [u8]) -> Result<usize, Error> {
        // The next transcript value absorbs the ciphertext, which the
        // in-place decryption is about to overwrite; feed the hasher
        // first and only commit it once the tag checks out.
        self.hasher.update(&self.h[..H::HASH_LEN]);
        self.hasher.update(data);
        match self.cipher.decrypt_in_place(&self.h[..H::HASH_LEN], data) {
            Ok(n) => {
                self.hasher.finish(&mut self.h);
                Ok(n)
            }
            Err(e) => {
                self.hasher.reset();
                Err(e)
            }
        }
    }

    /// Derives the two transport cipher states from the chaining key.
    pub fn split(&self) -> (CipherState<C>, CipherState<C>) {
        let mut out = [[0u8; MAX_HASH_LEN]; 2];
        hkdf::<H>(&self.ck[..H::HASH_LEN], &[], &mut out);

        let mut key = [0u8; KEY_LEN];
        let mut c1 = CipherState::new();
        key.copy_from_slice(&out[0][..KEY_LEN]);
        c1.initialize_key(&key);
        let mut c2 = CipherState::new();
        key.copy_from_slice(&out[1][..KEY_LEN]);
        c2.initialize_key(&key);

        key.zeroize();
        out.zeroize();
        (c1, c2)
    }
}

impl<C: Cipher, H: Hash> Drop for SymmetricState<C, H> {
    fn drop(&mut self) {
        self.ck.zeroize();
        self.h.zeroize();
    }
}
