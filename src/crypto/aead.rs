//! AEAD back-ends: ChaCha20-Poly1305 and AES-256-GCM.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, CHACHA20_POLY1305};
use zeroize::Zeroize;

use super::{Cipher, KEY_LEN, TAG_LEN};
use crate::error::Error;

/// ChaCha20-Poly1305. Nonce: 4 zero bytes followed by the little-endian
/// 64-bit counter.
pub struct ChaChaPoly {
    key: [u8; KEY_LEN],
    cipher: LessSafeKey,
}

impl ChaChaPoly {
    fn make_nonce(counter: u64) -> Nonce {
        let mut nonce_bytes = [0u8; 12];
        nonce_bytes[4..].copy_from_slice(&counter.to_le_bytes());
        Nonce::assume_unique_for_key(nonce_bytes)
    }
}

impl Cipher for ChaChaPoly {
    const NAME: &'static str = "ChaChaPoly";

    fn new(key: &[u8; KEY_LEN]) -> Self {
        let unbound_key = UnboundKey::new(&CHACHA20_POLY1305, key).expect("valid key size");
        Self {
            key: *key,
            cipher: LessSafeKey::new(unbound_key),
        }
    }

    fn seal_in_place(
        &self,
        nonce: u64,
        ad: &[u8],
        data: &mut [u8],
        plaintext_len: usize,
    ) -> usize {
        let tag = self
            .cipher
            .seal_in_place_separate_tag(
                Self::make_nonce(nonce),
                Aad::from(ad),
                &mut data[..plaintext_len],
            )
            .expect("sealing failed");
        data[plaintext_len..plaintext_len + TAG_LEN].copy_from_slice(tag.as_ref());
        plaintext_len + TAG_LEN
    }

    fn open_in_place(&self, nonce: u64, ad: &[u8], data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < TAG_LEN {
            return Err(Error::Decryption);
        }
        let plaintext = self
            .cipher
            .open_in_place(Self::make_nonce(nonce), Aad::from(ad), data)
            .map_err(|_| Error::Decryption)?;
        Ok(plaintext.len())
    }
}

impl Drop for ChaChaPoly {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// AES-256-GCM. Nonce: 4 zero bytes followed by the big-endian 64-bit
/// counter.
pub struct AesGcm {
    key: [u8; KEY_LEN],
    cipher: LessSafeKey,
}

impl AesGcm {
    fn make_nonce(counter: u64) -> Nonce {
        let mut nonce_bytes = [0u8; 12];
        nonce_bytes[4..].copy_from_slice(&counter.to_be_bytes());
        Nonce::assume_unique_for_key(nonce_bytes)
    }
}

impl Cipher for AesGcm {
    const NAME: &'static str = "AESGCM";

    fn new(key: &[u8; KEY_LEN]) -> Self {
        let unbound_key = UnboundKey::new(&AES_256_GCM, key).expect("valid key size");
        Self {
            key: *key,
            cipher: LessSafeKey::new(unbound_key),
        }
    }

    fn seal_in_place(
        &self,
        nonce: u64,
        ad: &[u8],
        data: &mut [u8],
        plaintext_len: usize,
    ) -> usize {
        let tag = self
            .cipher
            .seal_in_place_separate_tag(
                Self::make_nonce(nonce),
                Aad::from(ad),
                &mut data[..plaintext_len],
            )
            .expect("sealing failed");
        data[plaintext_len..plaintext_len + TAG_LEN].copy_from_slice(tag.as_ref());
        plaintext_len + TAG_LEN
    }

    fn open_in_place(&self, nonce: u64, ad: &[u8], data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < TAG_LEN {
            return Err(Error::Decryption);
        }
        let plaintext = self
            .cipher
            .open_in_place(Self::make_nonce(nonce), Aad::from(ad), data)
            .map_err(|_| Error::Decryption)?;
        Ok(plaintext.len())
    }
}

impl Drop for AesGcm {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
