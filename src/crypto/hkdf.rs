//! HMAC and HKDF over any supported hash function.
//!
//! HMAC is built by hand from ipad/opad so every hash gets the same
//! treatment, BLAKE2 included. HKDF follows the Noise chain: the first
//! output keys on 0x01, each further output on its predecessor plus the
//! next counter byte.

use zeroize::Zeroize;

use super::{Hash, MAX_BLOCK_LEN, MAX_HASH_LEN};

/// Computes HMAC-HASH over the concatenation of `data`.
/// `key` must not exceed the hash block length.
pub fn hmac<H: Hash>(key: &[u8], data: &[&[u8]], out: &mut [u8; MAX_HASH_LEN]) {
    debug_assert!(key.len() <= H::BLOCK_LEN);

    let mut ipad = [0x36u8; MAX_BLOCK_LEN];
    let mut opad = [0x5cu8; MAX_BLOCK_LEN];
    for (i, b) in key.iter().enumerate() {
        ipad[i] ^= b;
        opad[i] ^= b;
    }

    let mut hasher = H::default();
    hasher.update(&ipad[..H::BLOCK_LEN]);
    for d in data {
        hasher.update(d);
    }
    let mut inner = [0u8; MAX_HASH_LEN];
    hasher.finish(&mut inner);

    hasher.update(&opad[..H::BLOCK_LEN]);
    hasher.update(&inner[..H::HASH_LEN]);
    hasher.finish(out);

    inner.zeroize();
    ipad.zeroize();
    opad.zeroize();
}

/// Derives `outputs.len()` blocks (1-3) from the chaining key and input
/// key material. Each output carries `H::HASH_LEN` meaningful bytes.
pub fn hkdf<H: Hash>(
    chaining_key: &[u8],
    input_key_material: &[u8],
    outputs: &mut [[u8; MAX_HASH_LEN]],
) {
    assert!(
        (1..=3).contains(&outputs.len()),
        "hkdf yields 1-3 outputs"
    );

    let mut prk = [0u8; MAX_HASH_LEN];
    hmac::<H>(chaining_key, &[input_key_material], &mut prk);

    let mut block = [0u8; MAX_HASH_LEN];
    hmac::<H>(&prk[..H::HASH_LEN], &[&[1u8]], &mut block);
    outputs[0] = block;

    for i in 1..outputs.len() {
        let prev = block;
        hmac::<H>(
            &prk[..H::HASH_LEN],
            &[&prev[..H::HASH_LEN], &[i as u8 + 1]],
            &mut block,
        );
        outputs[i] = block;
    }

    prk.zeroize();
    block.zeroize();
}
