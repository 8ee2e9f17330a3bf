//! CipherState: one-shot AEAD keyed with a 64-bit counter nonce.

use zeroize::Zeroize;

use crate::crypto::{Cipher, KEY_LEN, TAG_LEN};
use crate::error::Error;

/// Last nonce value usable for encryption; 2^64-1 is reserved for rekey.
pub(crate) const MAX_NONCE: u64 = u64::MAX - 1;

/// Manages encryption for one direction of communication.
///
/// Without a key, payloads pass through unchanged and associated data is
/// ignored. With a key, the counter advances by exactly one per
/// successful operation; a failed decryption leaves it untouched.
pub struct CipherState<C: Cipher> {
    cipher: Option<C>,
    nonce: u64,
}

impl<C: Cipher> CipherState<C> {
    /// Creates an unkeyed CipherState.
    pub fn new() -> Self {
        Self {
            cipher: None,
            nonce: 0,
        }
    }

    /// Installs a key and resets the counter.
    pub fn initialize_key(&mut self, key: &[u8; KEY_LEN]) {
        self.cipher = Some(C::new(key));
        self.nonce = 0;
    }

    pub fn has_key(&self) -> bool {
        self.cipher.is_some()
    }

    /// Returns current nonce value.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Sets nonce value (rekey and test paths).
    pub fn set_nonce(&mut self, n: u64) {
        self.nonce = n;
    }

    /// Encrypts `data[..plaintext_len]` in place under the current
    /// counter, appending the tag, and advances the counter. Returns the
    /// ciphertext length. Keyless states return the plaintext length.
    pub fn encrypt_in_place(
        &mut self,
        ad: &[u8],
        data: &mut [u8],
        plaintext_len: usize,
    ) -> Result<usize, Error> {
        match &self.cipher {
            None => Ok(plaintext_len),
            Some(cipher) => {
                if self.nonce >= MAX_NONCE {
                    return Err(Error::NonceExhausted);
                }
                let n = cipher.seal_in_place(self.nonce, ad, data, plaintext_len);
                self.nonce += 1;
                Ok(n)
            }
        }
    }

    /// Decrypts ciphertext-and-tag in place under the current counter and
    /// advances it. On tag failure the counter does not move.
    pub fn decrypt_in_place(&mut self, ad: &[u8], data: &mut [u8]) -> Result<usize, Error> {
        match &self.cipher {
            None => Ok(data.len()),
            Some(cipher) => {
                if self.nonce >= MAX_NONCE {
                    return Err(Error::NonceExhausted);
                }
                let n = cipher.open_in_place(self.nonce, ad, data)?;
                self.nonce += 1;
                Ok(n)
            }
        }
    }

    /// Decrypts under a caller-supplied nonce without touching the
    /// counter. Tracking which nonces have already been accepted is the
    /// caller's responsibility.
    pub fn decrypt_at(&self, nonce: u64, ad: &[u8], data: &mut [u8]) -> Result<usize, Error> {
        match &self.cipher {
            None => Ok(data.len()),
            Some(cipher) => cipher.open_in_place(nonce, ad, data),
        }
    }

    /// Rekeys per Noise: k = ENCRYPT(k, 2^64-1, zerolen, zeros), keeping
    /// the counter where it is. A keyless state is left unchanged.
    pub fn rekey(&mut self) -> Result<(), Error> {
        let cipher = match &self.cipher {
            Some(cipher) => cipher,
            None => return Ok(()),
        };
        let mut buf = [0u8; KEY_LEN + TAG_LEN];
        cipher.seal_in_place(u64::MAX, &[], &mut buf, KEY_LEN);

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&buf[..KEY_LEN]);
        self.cipher = Some(C::new(&key));
        key.zeroize();
        buf.zeroize();
        Ok(())
    }
}

impl<C: Cipher> Default for CipherState<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ChaChaPoly;

    type Cs = CipherState<ChaChaPoly>;

    fn keyed(byte: u8) -> Cs {
        let mut cs = Cs::new();
        cs.initialize_key(&[byte; KEY_LEN]);
        cs
    }

    #[test]
    fn test_new_has_no_key() {
        let cs = Cs::new();
        assert!(!cs.has_key());
        assert_eq!(cs.nonce(), 0);
    }

    #[test]
    fn test_keyless_passthrough() {
        let mut cs = Cs::new();
        let mut buf = *b"plaintext";
        let n = cs.encrypt_in_place(b"ignored ad", &mut buf, 9).unwrap();
        assert_eq!(n, 9);
        assert_eq!(&buf, b"plaintext");
        // counter does not move without a key
        assert_eq!(cs.nonce(), 0);

        let n = cs.decrypt_in_place(b"other ad", &mut buf).unwrap();
        assert_eq!(n, 9);
        assert_eq!(&buf, b"plaintext");
    }

    #[test]
    fn test_encrypt_decrypt() {
        let mut tx = keyed(42);
        let mut rx = keyed(42);

        let mut buf = [0u8; 13 + TAG_LEN];
        buf[..13].copy_from_slice(b"hello, world!");
        let n = tx.encrypt_in_place(&[], &mut buf, 13).unwrap();
        assert_eq!(n, 13 + TAG_LEN);
        assert_eq!(tx.nonce(), 1);

        let n = rx.decrypt_in_place(&[], &mut buf[..n]).unwrap();
        assert_eq!(n, 13);
        assert_eq!(rx.nonce(), 1);
        assert_eq!(&buf[..13], b"hello, world!");
    }

    #[test]
    fn test_nonce_increments() {
        let mut cs = keyed(0);
        for i in 0..10 {
            assert_eq!(cs.nonce(), i);
            let mut buf = [0u8; 4 + TAG_LEN];
            cs.encrypt_in_place(&[], &mut buf, 4).unwrap();
        }
    }

    #[test]
    fn test_failed_decrypt_does_not_advance() {
        let mut tx = keyed(0);
        let mut rx = keyed(0);

        let mut buf = [0u8; 4 + TAG_LEN];
        buf[..4].copy_from_slice(b"test");
        let n = tx.encrypt_in_place(&[], &mut buf, 4).unwrap();
        buf[n - 1] ^= 1;
        assert_eq!(rx.decrypt_in_place(&[], &mut buf[..n]), Err(Error::Decryption));
        assert_eq!(rx.nonce(), 0);
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let mut tx = keyed(0);
        let mut rx = keyed(0);

        let mut buf = [0u8; 4 + TAG_LEN];
        buf[..4].copy_from_slice(b"test");
        let n = tx.encrypt_in_place(&[], &mut buf, 4).unwrap();

        rx.set_nonce(5);
        assert_eq!(rx.decrypt_in_place(&[], &mut buf[..n]), Err(Error::Decryption));
    }

    #[test]
    fn test_decrypt_at_ignores_counter() {
        let mut tx = keyed(7);
        let rx = keyed(7);

        let mut first = [0u8; 1 + TAG_LEN];
        first[0] = b'a';
        tx.encrypt_in_place(&[], &mut first, 1).unwrap();
        let mut second = [0u8; 1 + TAG_LEN];
        second[0] = b'b';
        tx.encrypt_in_place(&[], &mut second, 1).unwrap();

        // out of order, and twice
        let mut copy = second;
        assert_eq!(rx.decrypt_at(1, &[], &mut copy).unwrap(), 1);
        assert_eq!(copy[0], b'b');
        let mut copy = second;
        assert_eq!(rx.decrypt_at(1, &[], &mut copy).unwrap(), 1);
        let mut copy = first;
        assert_eq!(rx.decrypt_at(0, &[], &mut copy).unwrap(), 1);
        assert_eq!(copy[0], b'a');
    }

    #[test]
    fn test_nonce_exhaustion() {
        let mut cs = keyed(0);
        cs.set_nonce(MAX_NONCE);
        let mut buf = [0u8; TAG_LEN];
        assert_eq!(
            cs.encrypt_in_place(&[], &mut buf, 0),
            Err(Error::NonceExhausted)
        );
        assert_eq!(cs.decrypt_in_place(&[], &mut buf), Err(Error::NonceExhausted));
    }

    #[test]
    fn test_rekey() {
        let mut tx = keyed(3);
        let mut rx = keyed(3);
        tx.set_nonce(9);

        tx.rekey().unwrap();
        assert_eq!(tx.nonce(), 9, "rekey must not reset the counter");

        // old key no longer matches
        let mut buf = [0u8; 2 + TAG_LEN];
        buf[..2].copy_from_slice(b"ok");
        rx.set_nonce(9);
        let n = tx.encrypt_in_place(&[], &mut buf, 2).unwrap();
        assert_eq!(rx.decrypt_in_place(&[], &mut buf[..n]), Err(Error::Decryption));

        // both sides rekeyed stay in sync
        rx.rekey().unwrap();
        let mut buf = [0u8; 2 + TAG_LEN];
        buf[..2].copy_from_slice(b"ok");
        let n = tx.encrypt_in_place(&[], &mut buf, 2).unwrap();
        rx.set_nonce(10);
        assert_eq!(rx.decrypt_in_place(&[], &mut buf[..n]).unwrap(), 2);
        assert_eq!(&buf[..2], b"ok");
    }

    #[test]
    fn test_rekey_without_key_is_noop() {
        let mut cs = Cs::new();
        cs.rekey().unwrap();
        assert!(!cs.has_key());
    }
}
