//! Hash back-ends: SHA-256, SHA-512, BLAKE2s-256, BLAKE2b-512.

use blake2::{Blake2b512, Blake2s256, Digest};

use super::{Hash, MAX_HASH_LEN};

macro_rules! impl_hash {
    ($name:ident, $inner:ty, $proto_name:literal, $hash_len:literal, $block_len:literal) => {
        #[derive(Default)]
        pub struct $name($inner);

        impl Hash for $name {
            const NAME: &'static str = $proto_name;
            const HASH_LEN: usize = $hash_len;
            const BLOCK_LEN: usize = $block_len;

            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.0, data);
            }

            fn finish(&mut self, out: &mut [u8; MAX_HASH_LEN]) {
                let digest = self.0.finalize_reset();
                out[..Self::HASH_LEN].copy_from_slice(&digest);
            }

            fn reset(&mut self) {
                Digest::reset(&mut self.0);
            }
        }
    };
}

impl_hash!(Sha256, sha2::Sha256, "SHA256", 32, 64);
impl_hash!(Sha512, sha2::Sha512, "SHA512", 64, 128);
impl_hash!(Blake2s, Blake2s256, "BLAKE2s", 32, 64);
impl_hash!(Blake2b, Blake2b512, "BLAKE2b", 64, 128);
