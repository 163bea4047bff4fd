//! Cryptographic primitives: key schedule and format-preserving encryption
//!
//! All determinism in the engine flows from the master key derived here.
//! HMAC-SHA256 is the single PRF used for sub-keys, corpus draws and the
//! FPE round function.

pub mod fpe;
pub mod keys;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the concatenation of `parts`
pub(crate) fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().into()
}
